//! One-shot remote console sessions over TCP.

use async_trait::async_trait;
use banward_core::{RconCommand, RconResponse, RconTransport, ServerEndpoint};
use md5::{Digest, Md5};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::{RconError, RconResult};

/// Default deadline for a whole session
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest reply accepted (1 MiB)
const MAX_REPLY_BYTES: usize = 1024 * 1024;

/// Bytes requested per socket read
const READ_CHUNK: usize = 8 * 1024;

/// Marker the server sends after a good secret
const AUTH_OK: &str = "Authenticated=1";

/// Sent before closing so the server frees the slot
const DISCONNECT: &[u8] = b"Disconnect";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline covering connect, auth, command and reply
    pub timeout: Duration,
    /// Largest reply accepted
    pub max_reply_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_reply_bytes: MAX_REPLY_BYTES,
        }
    }
}

/// Remote console client
#[derive(Debug, Clone, Default)]
pub struct RconClient {
    config: SessionConfig,
}

impl RconClient {
    /// Create a client with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client with custom configuration
    #[must_use]
    pub const fn with_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Set the per-session deadline
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// The per-session deadline
    #[must_use]
    pub const fn session_timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Run one complete session against `endpoint`
    pub async fn send(
        &self,
        endpoint: &ServerEndpoint,
        command: &RconCommand,
    ) -> RconResult<RconResponse> {
        let deadline = self.config.timeout;
        debug!(server = %endpoint.name, command = %command, "rcon session");

        match tokio::time::timeout(deadline, self.run_session(endpoint, command)).await {
            Ok(result) => result,
            Err(_) => Err(RconError::Timeout(deadline)),
        }
    }

    async fn run_session(
        &self,
        endpoint: &ServerEndpoint,
        command: &RconCommand,
    ) -> RconResult<RconResponse> {
        let mut stream = TcpStream::connect(endpoint.address())
            .await
            .map_err(RconError::Connect)?;

        // The server greets with a password prompt before anything else.
        let prompt = read_chunk(&mut stream).await?;
        if prompt.is_empty() {
            return Err(RconError::Protocol(
                "connection closed before password prompt".into(),
            ));
        }

        stream
            .write_all(auth_digest(&endpoint.password).as_bytes())
            .await?;

        let auth = read_chunk(&mut stream).await?;
        let auth = String::from_utf8_lossy(&auth);
        if !auth.contains(AUTH_OK) {
            return Err(RconError::Auth(auth.trim().to_string()));
        }

        stream.write_all(command.to_string().as_bytes()).await?;
        let payload = self.read_reply(&mut stream).await?;

        if let Err(e) = stream.write_all(DISCONNECT).await {
            debug!(server = %endpoint.name, error = %e, "disconnect not delivered");
        }
        if let Err(e) = stream.shutdown().await {
            debug!(server = %endpoint.name, error = %e, "shutdown failed");
        }

        Ok(RconResponse::from_payload(&payload))
    }

    /// Read one reply. JSON replies may span several reads, so keep reading
    /// while the buffer is an incomplete JSON document.
    async fn read_reply(&self, stream: &mut TcpStream) -> RconResult<String> {
        let mut reply = Vec::new();

        loop {
            let chunk = read_chunk(stream).await?;
            if chunk.is_empty() {
                break;
            }
            reply.extend_from_slice(&chunk);

            if reply.len() > self.config.max_reply_bytes {
                return Err(RconError::Protocol(format!(
                    "reply exceeds {} bytes",
                    self.config.max_reply_bytes
                )));
            }

            match std::str::from_utf8(&reply) {
                Ok(text) if !is_incomplete_json(text) => break,
                Ok(_) => {}
                // Split multi-byte character, wait for the rest.
                Err(e) if e.error_len().is_none() => {}
                Err(e) => return Err(RconError::Protocol(format!("reply is not UTF-8: {e}"))),
            }
        }

        let text = String::from_utf8(reply)
            .map_err(|e| RconError::Protocol(format!("reply is not UTF-8: {e}")))?;
        if text.trim().is_empty() {
            return Err(RconError::Protocol("empty reply".into()));
        }
        if is_incomplete_json(&text) {
            warn!(bytes = text.len(), "connection closed mid-reply");
            return Err(RconError::Protocol("truncated JSON reply".into()));
        }

        Ok(text)
    }
}

#[async_trait]
impl RconTransport for RconClient {
    async fn send(
        &self,
        endpoint: &ServerEndpoint,
        command: &RconCommand,
    ) -> banward_core::Result<RconResponse> {
        Self::send(self, endpoint, command)
            .await
            .map_err(|e| e.for_server(&endpoint.name))
    }
}

/// Lowercase hex MD5 of the shared secret, as the server expects it
#[must_use]
pub fn auth_digest(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

async fn read_chunk(stream: &mut TcpStream) -> RconResult<Vec<u8>> {
    let mut buf = vec![0u8; READ_CHUNK];
    let n = stream.read(&mut buf).await?;
    buf.truncate(n);
    Ok(buf)
}

// Bracket balance outside of string literals; enough to tell a truncated
// object from a complete one.
fn is_incomplete_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return false;
    }

    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for c in trimmed.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            _ => {}
        }
    }

    depth > 0 || in_string
}
