//! Operator commands: one-off remote console actions on a named server,
//! ledger lookups and ban submissions.

use banward_core::{
    check_argument, BanEntry, BanwardError, PlayerSummary, RconCommand, RconResponse, Result,
};
use std::sync::Arc;
use tracing::info;

use crate::orchestrator::SyncEngine;
use crate::request::{BanReceipt, BanRequest};

/// Front door for human operators
#[derive(Debug, Clone)]
pub struct OperatorConsole {
    engine: Arc<SyncEngine>,
}

impl OperatorConsole {
    /// Create a console driving `engine`
    #[must_use]
    pub const fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Names of the servers commands can target
    #[must_use]
    pub fn servers(&self) -> Vec<String> {
        self.engine.directory().names().map(str::to_string).collect()
    }

    /// Kick `player` from `server`
    pub async fn kick(&self, server: &str, player: &str) -> Result<RconResponse> {
        let player = required("player", player)?;
        self.send(server, RconCommand::Kick(player)).await
    }

    /// Advance `server` to its next map
    pub async fn rotate_map(&self, server: &str) -> Result<RconResponse> {
        self.send(server, RconCommand::RotateMap).await
    }

    /// Give `item` to `player` on `server`
    pub async fn give_item(&self, server: &str, player: &str, item: &str) -> Result<RconResponse> {
        let player = required("player", player)?;
        let item = required("item", item)?;
        self.send(server, RconCommand::GiveItem { player, item }).await
    }

    /// Players connected to `server`
    pub async fn list_players(&self, server: &str) -> Result<Vec<PlayerSummary>> {
        let response = self.send(server, RconCommand::RefreshList).await?;
        response.player_list().ok_or_else(|| {
            BanwardError::Decode(format!("{server} sent no player list: {response}"))
        })
    }

    /// Identities on `server`'s own ban list
    pub async fn list_bans(&self, server: &str) -> Result<Vec<String>> {
        let response = self.send(server, RconCommand::BanList).await?;
        response
            .ban_list()
            .ok_or_else(|| BanwardError::Decode(format!("{server} sent no ban list: {response}")))
    }

    /// The ledger entry for `subject`, if they are banned
    pub async fn check_unban_status(&self, subject: &str) -> Result<Option<BanEntry>> {
        let subject = required("subject", subject)?;
        self.engine.lookup(&subject).await
    }

    /// Parse a three-line chat submission and apply it
    pub async fn submit_ban(&self, message: &str) -> Result<BanReceipt> {
        self.ban_with(BanRequest::parse_message(message)?).await
    }

    /// Ban `subject` until `expiry` (any accepted date format)
    pub async fn ban(&self, subject: &str, expiry: &str, reason: &str) -> Result<BanReceipt> {
        self.ban_with(BanRequest::new(subject, expiry, reason)?).await
    }

    async fn ban_with(&self, request: BanRequest) -> Result<BanReceipt> {
        info!(subject = %request.subject, until = %request.expiry, "ban submitted");
        self.engine.submit_ban(request).await
    }

    async fn send(&self, server: &str, command: RconCommand) -> Result<RconResponse> {
        info!(server, %command, "operator command");
        self.engine.dispatcher().send_to(server, &command).await
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    check_argument(field, value)?;
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FanoutDispatcher;
    use crate::orchestrator::EngineSettings;
    use crate::testing::{fleet, MemoryStore, ScriptedTransport};
    use banward_core::{BanLedger, ErrorKind};
    use serde_json::json;

    fn console(store: MemoryStore, transport: &Arc<ScriptedTransport>) -> OperatorConsole {
        let engine = SyncEngine::new(
            Arc::new(store),
            FanoutDispatcher::new(fleet(&["eu-1", "us-2"]), transport.clone()),
            EngineSettings::default(),
        );
        OperatorConsole::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn test_kick_and_rotate_target_one_server() {
        let transport = Arc::new(ScriptedTransport::new());
        let console = console(MemoryStore::new(), &transport);

        console.kick("us-2", "griefer").await.unwrap();
        console.rotate_map("eu-1").await.unwrap();
        console.give_item("eu-1", "medic", "Syringe").await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                ("us-2".to_string(), "kick griefer".to_string()),
                ("eu-1".to_string(), "RotateMap".to_string()),
                ("eu-1".to_string(), "giveitem medic Syringe".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_server_and_empty_player() {
        let transport = Arc::new(ScriptedTransport::new());
        let console = console(MemoryStore::new(), &transport);

        let err = console.kick("ap-1", "griefer").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownServer);

        let err = console.kick("eu-1", " ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = console
            .give_item("eu-1", "griefer", "rifle\nRotateMap")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_players() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            "RefreshList",
            RconResponse::Structured(json!({
                "PlayerList": [
                    {"Username": "alice", "UniqueId": "7656"},
                    {"Username": "bob", "UniqueId": "7657"}
                ]
            })),
        );
        let console = console(MemoryStore::new(), &transport);

        let players = console.list_players("eu-1").await.unwrap();
        assert_eq!(
            players.iter().map(|p| p.username.as_str()).collect::<Vec<_>>(),
            vec!["alice", "bob"]
        );
    }

    #[tokio::test]
    async fn test_list_bans_rejects_wrong_shape() {
        let transport = Arc::new(ScriptedTransport::new());
        let console = console(MemoryStore::new(), &transport);

        let err = console.list_bans("eu-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        transport.reply(
            "banlist",
            RconResponse::Structured(json!({"BanList": ["7656", "7657"]})),
        );
        assert_eq!(
            console.list_bans("eu-1").await.unwrap(),
            vec!["7656", "7657"]
        );
    }

    #[tokio::test]
    async fn test_check_unban_status() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut ledger = BanLedger::new();
        ledger.insert(
            "alice",
            BanEntry::new(banward_core::Expiry::from("2025-01-01".to_string()), "cheating"),
        );
        let console = console(MemoryStore::with_ledger(ledger), &transport);

        let entry = console.check_unban_status("alice").await.unwrap().unwrap();
        assert_eq!(entry.expiry.to_string(), "2025-01-01");
        assert!(console.check_unban_status("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_submit_ban_message() {
        let transport = Arc::new(ScriptedTransport::new());
        let console = console(MemoryStore::new(), &transport);

        let receipt = console
            .submit_ban("bob\n2025-02-01\ntoxicity")
            .await
            .unwrap();
        assert!(receipt.to_string().starts_with("Message received and processed:"));
        assert_eq!(transport.count("ban bob"), 2);

        let receipt = console.ban("carol", "01-03-2025", "spam").await.unwrap();
        assert_eq!(receipt.request.expiry.to_string(), "2025-03-01");

        let err = console.submit_ban("bob\n2025-02-01").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(transport.count("ban bob"), 2);
    }

    #[test]
    fn test_servers() {
        let transport = Arc::new(ScriptedTransport::new());
        let console = console(MemoryStore::new(), &transport);
        assert_eq!(console.servers(), vec!["eu-1", "us-2"]);
    }
}
