//! The set of game servers a ban is broadcast to.
//!
//! Loaded once at startup from a JSON file shaped like
//! `{"eu-1": {"ip": "10.0.0.5", "port": 9100, "password": "..."}}`.

use banward_core::{BanwardError, Result, ServerEndpoint};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

/// One record of the servers file
#[derive(Debug, Deserialize)]
struct EndpointRecord {
    ip: String,
    #[serde(deserialize_with = "port_number_or_text")]
    port: u16,
    password: String,
}

// Hand-edited files write the port either way.
fn port_number_or_text<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{text}'"))),
    }
}

/// Immutable, name-ordered set of server endpoints
#[derive(Debug, Clone, Default)]
pub struct ServerDirectory {
    servers: Vec<ServerEndpoint>,
}

impl ServerDirectory {
    /// Build a directory from endpoints, rejecting duplicate names
    pub fn new(servers: impl IntoIterator<Item = ServerEndpoint>) -> Result<Self> {
        let mut by_name = BTreeMap::new();
        for server in servers {
            if server.name.trim().is_empty() {
                return Err(BanwardError::Config("server with an empty name".into()));
            }
            if let Some(previous) = by_name.insert(server.name.clone(), server) {
                return Err(BanwardError::Config(format!(
                    "server '{}' is listed twice",
                    previous.name
                )));
            }
        }

        Ok(Self {
            servers: by_name.into_values().collect(),
        })
    }

    /// Parse the servers file contents
    pub fn from_json(text: &str) -> Result<Self> {
        let records: BTreeMap<String, EndpointRecord> = serde_json::from_str(text)
            .map_err(|e| BanwardError::Config(format!("invalid servers file: {e}")))?;

        Self::new(records.into_iter().map(|(name, record)| {
            ServerEndpoint::new(name, record.ip, record.port, record.password)
        }))
    }

    /// Load the servers file at `path`.
    ///
    /// The engine cannot do anything useful without servers, so a missing
    /// file or an empty one is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BanwardError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let directory = Self::from_json(&text)?;
        if directory.is_empty() {
            return Err(BanwardError::Config(format!(
                "{} lists no servers",
                path.display()
            )));
        }

        Ok(directory)
    }

    /// Look up a server by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServerEndpoint> {
        self.servers
            .binary_search_by(|server| server.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.servers[index])
    }

    /// Server names, in directory order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(|server| server.name.as_str())
    }

    /// Endpoints, in directory order
    pub fn iter(&self) -> impl Iterator<Item = &ServerEndpoint> {
        self.servers.iter()
    }

    /// Number of servers
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns true if there are no servers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_servers_file() {
        let directory = ServerDirectory::from_json(
            r#"{
                "us-2": {"ip": "10.0.0.7", "port": "9101", "password": "b"},
                "eu-1": {"ip": "10.0.0.5", "port": 9100, "password": "a"}
            }"#,
        )
        .unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(directory.names().collect::<Vec<_>>(), vec!["eu-1", "us-2"]);

        let us = directory.get("us-2").unwrap();
        assert_eq!(us.address(), "10.0.0.7:9101");
        assert_eq!(us.password, "b");
        assert!(directory.get("ap-1").is_none());
    }

    #[test]
    fn test_rejects_bad_port() {
        let err = ServerDirectory::from_json(
            r#"{"eu-1": {"ip": "10.0.0.5", "port": "ninety", "password": "a"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BanwardError::Config(_)));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = ServerDirectory::new([
            ServerEndpoint::new("eu-1", "10.0.0.5", 9100, "a"),
            ServerEndpoint::new("eu-1", "10.0.0.6", 9100, "b"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_load_missing_or_empty_file() {
        let err = ServerDirectory::load(Path::new("/tmp/nonexistent_banward_servers.json"))
            .unwrap_err();
        assert!(matches!(err, BanwardError::Config(_)));

        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "{{}}").unwrap();
        let err = ServerDirectory::load(tmpfile.path()).unwrap_err();
        assert!(err.to_string().contains("no servers"));
    }

    #[test]
    fn test_load_valid_file() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmpfile,
            r#"{{"eu-1": {{"ip": "10.0.0.5", "port": 9100, "password": "a"}}}}"#
        )
        .unwrap();

        let directory = ServerDirectory::load(tmpfile.path()).unwrap();
        assert_eq!(directory.len(), 1);
    }
}
