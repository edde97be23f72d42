use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{BanwardError, Result};

/// Check that `value` fits in one command argument.
///
/// The console splits commands on whitespace, so an argument holding any
/// (a newline included) would change or add a command.
pub fn check_argument(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(BanwardError::Validation(format!("{field} is empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(BanwardError::Validation(format!(
            "{field} {value:?} contains whitespace"
        )));
    }
    Ok(())
}

/// A command understood by the game server's remote console
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RconCommand {
    /// Ban a player on this server
    Ban(String),
    /// Lift a player's ban on this server
    Unban(String),
    /// Kick a player
    Kick(String),
    /// Advance to the next map in rotation
    RotateMap,
    /// Give an item to a player
    GiveItem {
        /// Player receiving the item
        player: String,
        /// Item identifier
        item: String,
    },
    /// Fetch the connected players
    RefreshList,
    /// Fetch the server's own ban list
    BanList,
}

impl std::fmt::Display for RconCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ban(player) => write!(f, "ban {player}"),
            Self::Unban(player) => write!(f, "unban {player}"),
            Self::Kick(player) => write!(f, "kick {player}"),
            Self::RotateMap => f.write_str("RotateMap"),
            Self::GiveItem { player, item } => write!(f, "giveitem {player} {item}"),
            Self::RefreshList => f.write_str("RefreshList"),
            Self::BanList => f.write_str("banlist"),
        }
    }
}

/// One reply from the remote console.
///
/// Servers answer either with a bare acknowledgement or with a JSON object;
/// which one is decided once, when the reply is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RconResponse {
    /// Plain text acknowledgement
    Text(String),
    /// JSON object or array
    Structured(serde_json::Value),
}

impl RconResponse {
    /// Classify a raw reply payload
    #[must_use]
    pub fn from_payload(payload: &str) -> Self {
        let payload = payload.trim();
        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(value) if value.is_object() || value.is_array() => Self::Structured(value),
            _ => Self::Text(payload.to_string()),
        }
    }

    /// The structured payload, if any
    #[must_use]
    pub const fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Players from a `RefreshList` reply
    #[must_use]
    pub fn player_list(&self) -> Option<Vec<PlayerSummary>> {
        let list = self.as_structured()?.get("PlayerList")?;
        serde_json::from_value(list.clone()).ok()
    }

    /// Banned identities from a `banlist` reply
    #[must_use]
    pub fn ban_list(&self) -> Option<Vec<String>> {
        let list = self.as_structured()?.get("BanList")?.as_array()?;
        Some(
            list.iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

impl std::fmt::Display for RconResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(value) => write!(f, "{value}"),
        }
    }
}

/// One connected player, as reported by `RefreshList`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Display name
    #[serde(rename = "Username")]
    pub username: String,

    /// Kills this session
    #[serde(rename = "Kills", default)]
    pub kills: i64,

    /// Deaths this session
    #[serde(rename = "Deaths", default)]
    pub deaths: i64,

    /// Remaining fields (unique id, team, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_argument() {
        assert!(check_argument("subject", "bob").is_ok());
        for bad in ["", "bob smith", "bob\nunban carol", "\tbob"] {
            assert!(matches!(
                check_argument("subject", bad).unwrap_err(),
                BanwardError::Validation(_)
            ));
        }
    }

    #[test]
    fn test_command_wire_text() {
        assert_eq!(RconCommand::Ban("bob".into()).to_string(), "ban bob");
        assert_eq!(RconCommand::Unban("bob".into()).to_string(), "unban bob");
        assert_eq!(RconCommand::Kick("eve".into()).to_string(), "kick eve");
        assert_eq!(RconCommand::RotateMap.to_string(), "RotateMap");
        assert_eq!(
            RconCommand::GiveItem {
                player: "eve".into(),
                item: "ak47".into()
            }
            .to_string(),
            "giveitem eve ak47"
        );
        assert_eq!(RconCommand::RefreshList.to_string(), "RefreshList");
        assert_eq!(RconCommand::BanList.to_string(), "banlist");
    }

    #[test]
    fn test_bare_string_reply_is_text() {
        let response = RconResponse::from_payload("Authenticated=1\n");
        assert_eq!(response, RconResponse::Text("Authenticated=1".into()));
        assert!(response.player_list().is_none());
    }

    #[test]
    fn test_json_scalar_reply_stays_text() {
        assert_eq!(
            RconResponse::from_payload("42"),
            RconResponse::Text("42".into())
        );
    }

    #[test]
    fn test_player_list_reply() {
        let response = RconResponse::from_payload(
            r#"{"PlayerList": [
                {"Username": "alice", "Kills": 7, "Deaths": 2, "UniqueId": "7656"},
                {"Username": "bob"}
            ]}"#,
        );

        let players = response.player_list().unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].username, "alice");
        assert_eq!(players[0].kills, 7);
        assert_eq!(players[0].deaths, 2);
        assert_eq!(players[0].extra.get("UniqueId"), Some(&serde_json::json!("7656")));
        assert_eq!(players[1].kills, 0);
    }

    #[test]
    fn test_ban_list_reply() {
        let response = RconResponse::from_payload(r#"{"BanList": ["alice", "7656119"]}"#);
        assert_eq!(
            response.ban_list().unwrap(),
            vec!["alice".to_string(), "7656119".to_string()]
        );
        assert!(response.player_list().is_none());
    }
}
