//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::{Context as _, Result};
use args::{Cli, Commands};
use banward::{EngineConfig, OperatorConsole, SyncEngine};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configuration problems stop us before anything touches the network
    let config = EngineConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let engine = Arc::new(SyncEngine::from_config(&config)?);

    let ctx = commands::Context {
        console: OperatorConsole::new(engine.clone()),
        engine,
        json: cli.json,
    };

    match cli.command {
        Commands::Serve => commands::serve::execute(ctx).await,
        Commands::Sync => commands::sync::execute(ctx).await,
        Commands::Ban(args) => commands::ban::execute(ctx, args).await,
        Commands::Status(args) => commands::ban::status(ctx, args).await,
        Commands::Servers => commands::server::list(&ctx),
        Commands::Kick(args) => commands::server::kick(ctx, args).await,
        Commands::RotateMap(args) => commands::server::rotate_map(ctx, args).await,
        Commands::GiveItem(args) => commands::server::give_item(ctx, args).await,
        Commands::Players(args) => commands::server::players(ctx, args).await,
        Commands::Bans(args) => commands::server::bans(ctx, args).await,
    }
}

/// Structured logs to stderr. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
