//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ban ledger sync daemon
///
/// Keeps a ban ledger stored in a git repository and a fleet of game
/// servers in agreement: lifts bans once their date has passed and applies
/// new ones everywhere.
#[derive(Parser, Debug)]
#[command(name = "banwardd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file
    #[arg(
        short,
        long,
        env = "BANWARD_CONFIG",
        default_value = "banward.toml",
        global = true
    )]
    pub config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lift expired bans on a schedule until interrupted
    Serve,

    /// Run one expiry cycle and exit
    Sync,

    /// Ban a player on every server and record it in the ledger
    Ban(BanArgs),

    /// Show a player's ledger entry
    Status(StatusArgs),

    /// List the configured servers
    Servers,

    /// Kick a player from one server
    Kick(KickArgs),

    /// Advance one server to its next map
    RotateMap(ServerArgs),

    /// Give an item to a player on one server
    GiveItem(GiveItemArgs),

    /// List players connected to one server
    Players(ServerArgs),

    /// Show one server's own ban list
    Bans(ServerArgs),
}

#[derive(Args, Debug)]
pub struct BanArgs {
    /// Player identity
    pub subject: String,

    /// Last day of the ban (YYYY-MM-DD, DD-MM-YYYY or YYYY/MM/DD)
    pub until: String,

    /// Why the player is banned
    #[arg(required = true, num_args = 1..)]
    pub reason: Vec<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Player identity
    pub subject: String,
}

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Server name from the servers file
    pub server: String,
}

#[derive(Args, Debug)]
pub struct KickArgs {
    /// Server name from the servers file
    pub server: String,

    /// Player to kick
    pub player: String,
}

#[derive(Args, Debug)]
pub struct GiveItemArgs {
    /// Server name from the servers file
    pub server: String,

    /// Player receiving the item
    pub player: String,

    /// Item identifier
    pub item: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ban_reason_joins_words() {
        let cli = Cli::try_parse_from([
            "banwardd", "ban", "bob", "2025-02-01", "team", "killing",
        ])
        .unwrap();
        match cli.command {
            Commands::Ban(args) => {
                assert_eq!(args.subject, "bob");
                assert_eq!(args.reason.join(" "), "team killing");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_config_flag() {
        let cli = Cli::try_parse_from(["banwardd", "--config", "/etc/banward.toml", "sync"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/banward.toml"));
        assert!(matches!(cli.command, Commands::Sync));
    }
}
