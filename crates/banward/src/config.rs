//! Engine configuration, loaded from a TOML file.
//!
//! ```toml
//! servers_file = "servers.json"
//! sync_interval_secs = 60
//!
//! [store]
//! owner = "my-org"
//! repo = "moderation"
//! path = "ban.json"
//! token_env = "BANWARD_STORE_TOKEN"
//! ```

use banward_core::{BanwardError, Result};
use banward_store::{LedgerStoreClient, DEFAULT_API_BASE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::orchestrator::EngineSettings;

/// Configuration for a banward engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Servers file, relative to the config file (default: servers.json).
    #[serde(default = "default_servers_file")]
    pub servers_file: PathBuf,

    /// How often to scan the ledger for expired bans (seconds).
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Deadline for one remote console session (seconds).
    #[serde(default = "default_rcon_timeout")]
    pub rcon_timeout_secs: u64,

    /// Fresh re-reads allowed after a stale write within one operation.
    #[serde(default = "default_conflict_retries")]
    pub max_conflict_retries: u32,

    /// Retry an unban once on the servers that missed it.
    #[serde(default = "default_true")]
    pub unban_redispatch: bool,

    /// Where the ban ledger document lives.
    pub store: StoreConfig,
}

/// Location of, and credentials for, the ledger document.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Repository owner.
    pub owner: String,

    /// Repository name.
    pub repo: String,

    /// Document path inside the repository (default: ban.json).
    #[serde(default = "default_ledger_path")]
    pub path: String,

    /// Branch to read and write, default branch when unset.
    #[serde(default)]
    pub branch: Option<String>,

    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Access token. Prefer `token_env` over putting it in the file.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Environment variable holding the access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Treat a missing document as an empty ledger.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("path", &self.path)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_env", &self.token_env)
            .field("create_if_missing", &self.create_if_missing)
            .finish()
    }
}

impl EngineConfig {
    /// Load and validate the config file at `path`.
    ///
    /// A relative `servers_file` is resolved against the config file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BanwardError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut config = Self::from_toml(&content)?;
        if config.servers_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.servers_file = dir.join(&config.servers_file);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without validating it
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BanwardError::Config(e.to_string()))
    }

    /// Check everything that can be checked before touching the network
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("store.owner", &self.store.owner),
            ("store.repo", &self.store.repo),
            ("store.path", &self.store.path),
        ] {
            if value.trim().is_empty() {
                return Err(BanwardError::Config(format!("{field} is empty")));
            }
        }

        if self.sync_interval_secs == 0 {
            return Err(BanwardError::Config(
                "sync_interval_secs must be greater than 0".into(),
            ));
        }
        if self.rcon_timeout_secs == 0 {
            return Err(BanwardError::Config(
                "rcon_timeout_secs must be greater than 0".into(),
            ));
        }

        self.store.resolve_token().map(|_| ())
    }

    /// Interval between sync cycles
    #[must_use]
    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Deadline for one remote console session
    #[must_use]
    pub const fn rcon_timeout(&self) -> Duration {
        Duration::from_secs(self.rcon_timeout_secs)
    }

    /// Engine behaviour knobs
    #[must_use]
    pub const fn settings(&self) -> EngineSettings {
        EngineSettings {
            sync_interval: self.sync_interval(),
            max_conflict_retries: self.max_conflict_retries,
            unban_redispatch: self.unban_redispatch,
        }
    }
}

impl StoreConfig {
    /// The access token, from the file or from `token_env`
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = self.token.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(token.to_string());
        }

        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(BanwardError::Config(format!(
                "no store token: set store.token or the {} environment variable",
                self.token_env
            ))),
        }
    }

    /// Build the ledger store client this section describes
    pub fn client(&self) -> Result<LedgerStoreClient> {
        let mut builder = LedgerStoreClient::builder(&self.owner, &self.repo, &self.path)
            .api_base(&self.api_base)
            .access_token(self.resolve_token()?)
            .create_if_missing(self.create_if_missing);
        if let Some(branch) = &self.branch {
            builder = builder.branch(branch);
        }
        builder.build()
    }
}

// Default value functions for serde.
fn default_servers_file() -> PathBuf {
    PathBuf::from("servers.json")
}

const fn default_sync_interval() -> u64 {
    60
}

const fn default_rcon_timeout() -> u64 {
    5
}

const fn default_conflict_retries() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

fn default_ledger_path() -> String {
    String::from("ban.json")
}

fn default_api_base() -> String {
    String::from(DEFAULT_API_BASE)
}

fn default_token_env() -> String {
    String::from("BANWARD_STORE_TOKEN")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [store]
        owner = "org"
        repo = "moderation"
        token = "t0ken"
    "#;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.servers_file, PathBuf::from("servers.json"));
        assert_eq!(config.sync_interval(), Duration::from_secs(60));
        assert_eq!(config.rcon_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_conflict_retries, 1);
        assert!(config.unban_redispatch);
        assert_eq!(config.store.path, "ban.json");
        assert_eq!(config.store.api_base, "https://api.github.com");
        assert!(config.store.create_if_missing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_is_redacted_and_not_serialized() {
        let config = EngineConfig::from_toml(MINIMAL).unwrap();
        assert!(!format!("{config:?}").contains("t0ken"));
        assert!(!toml::to_string(&config).unwrap().contains("t0ken"));
    }

    #[test]
    fn test_token_from_environment() {
        let config = EngineConfig::from_toml(
            r#"
            [store]
            owner = "org"
            repo = "moderation"
            token_env = "BANWARD_TEST_TOKEN_FROM_ENV"
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.validate().unwrap_err(),
            BanwardError::Config(_)
        ));

        std::env::set_var("BANWARD_TEST_TOKEN_FROM_ENV", "from-env");
        assert_eq!(config.store.resolve_token().unwrap(), "from-env");
        std::env::remove_var("BANWARD_TEST_TOKEN_FROM_ENV");
    }

    #[test]
    fn test_rejects_zero_interval_and_empty_owner() {
        let mut config = EngineConfig::from_toml(MINIMAL).unwrap();
        config.sync_interval_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("sync_interval_secs"));

        let mut config = EngineConfig::from_toml(MINIMAL).unwrap();
        config.store.owner = " ".into();
        assert!(config.validate().unwrap_err().to_string().contains("store.owner"));
    }

    #[test]
    fn test_load_resolves_servers_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banward.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "servers_file = \"fleet.json\"\n{MINIMAL}").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.servers_file, dir.path().join("fleet.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load(Path::new("/tmp/nonexistent_banward.toml")).unwrap_err();
        assert!(matches!(err, BanwardError::Config(_)));
    }

    #[test]
    fn test_store_client_from_config() {
        let config = EngineConfig::from_toml(MINIMAL).unwrap();
        let client = config.store.client().unwrap();
        assert_eq!(
            client.contents_url().as_str(),
            "https://api.github.com/repos/org/moderation/contents/ban.json"
        );
    }
}
