use std::time::Duration;
use thiserror::Error;

/// Result type alias for banward operations
pub type Result<T> = std::result::Result<T, BanwardError>;

/// Errors that can occur while synchronizing the ban ledger
#[derive(Error, Debug)]
pub enum BanwardError {
    /// Network or HTTP failure reaching the ledger store
    #[error("store transport failed: {0}")]
    Transport(String),

    /// Malformed envelope or payload
    #[error("failed to decode ledger document: {0}")]
    Decode(String),

    /// Concurrency token mismatch: someone else wrote the ledger first
    #[error("ledger was modified concurrently: {0}")]
    Conflict(String),

    /// Ledger document does not exist
    #[error("ledger document not found: {resource}")]
    NotFound {
        /// Description of the document that wasn't found
        resource: String,
    },

    /// Game server refused or dropped the connection
    #[error("connection to {server} failed: {reason}")]
    Connect {
        /// Server name from the directory
        server: String,
        /// Underlying failure
        reason: String,
    },

    /// Game server rejected the shared secret
    #[error("authentication rejected by {server}")]
    Auth {
        /// Server name from the directory
        server: String,
    },

    /// Game server did not complete the exchange in time
    #[error("{server} did not answer within {timeout:?}")]
    Timeout {
        /// Server name from the directory
        server: String,
        /// Per-call deadline that elapsed
        timeout: Duration,
    },

    /// Game server answered with something that is not a valid reply
    #[error("protocol error from {server}: {reason}")]
    Protocol {
        /// Server name from the directory
        server: String,
        /// What was wrong with the reply
        reason: String,
    },

    /// Malformed human input
    #[error("invalid input: {0}")]
    Validation(String),

    /// Command names a server that is not in the directory
    #[error("server '{0}' not found")]
    UnknownServer(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BanwardError {
    /// Classify the error for dispatch results and log fields
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) | Self::Json(_) => ErrorKind::Decode,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Connect { .. } => ErrorKind::Connect,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Validation(_) => ErrorKind::Validation,
            Self::UnknownServer(_) => ErrorKind::UnknownServer,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if repeating the same request may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Connect { .. }
        )
    }

    /// Returns true if the store rejected a write because of a stale token
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Flat classification of a [`BanwardError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Store unreachable or returned an unexpected status
    Transport,
    /// Document or reply could not be decoded
    Decode,
    /// Concurrency token mismatch
    Conflict,
    /// Document missing
    NotFound,
    /// Server connection refused or reset
    Connect,
    /// Shared secret rejected
    Auth,
    /// Per-call deadline elapsed
    Timeout,
    /// Unexpected reply from a server
    Protocol,
    /// Malformed human input
    Validation,
    /// Server name not in the directory
    UnknownServer,
    /// Startup configuration problem
    Config,
    /// Anything else
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name, used as a log field value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Connect => "connect",
            Self::Auth => "auth",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
            Self::Validation => "validation",
            Self::UnknownServer => "unknown_server",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_keep_distinct_kinds() {
        let refused = BanwardError::Connect {
            server: "eu-1".into(),
            reason: "connection refused".into(),
        };
        let rejected = BanwardError::Auth {
            server: "eu-1".into(),
        };
        assert_eq!(refused.kind(), ErrorKind::Connect);
        assert_eq!(rejected.kind(), ErrorKind::Auth);
        assert!(refused.is_retryable());
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_conflict_is_not_blindly_retryable() {
        let err = BanwardError::Conflict("sha mismatch".into());
        assert!(err.is_conflict());
        assert!(!err.is_retryable());
        assert_eq!(err.kind().to_string(), "conflict");
    }

    #[test]
    fn test_json_error_counts_as_decode() {
        let err: BanwardError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
