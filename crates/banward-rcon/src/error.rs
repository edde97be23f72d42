use banward_core::BanwardError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for remote console operations
pub type RconResult<T> = std::result::Result<T, RconError>;

/// Errors from one remote console session
#[derive(Error, Debug)]
pub enum RconError {
    /// TCP connect failed (refused, unreachable, bad address)
    #[error("connect failed: {0}")]
    Connect(std::io::Error),

    /// Connection dropped mid-exchange
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Server rejected the shared secret
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Reply was empty, oversized or not text
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Session did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl RconError {
    /// Attach the server name, producing the engine-wide error
    #[must_use]
    pub fn for_server(self, server: &str) -> BanwardError {
        let server = server.to_string();
        match self {
            Self::Connect(e) | Self::Network(e) => BanwardError::Connect {
                server,
                reason: e.to_string(),
            },
            Self::Auth(_) => BanwardError::Auth { server },
            Self::Protocol(reason) => BanwardError::Protocol { server, reason },
            Self::Timeout(timeout) => BanwardError::Timeout { server, timeout },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banward_core::ErrorKind;

    #[test]
    fn test_for_server_maps_kinds() {
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert_eq!(
            RconError::Connect(refused).for_server("eu-1").kind(),
            ErrorKind::Connect
        );
        assert_eq!(
            RconError::Auth("Authenticated=0".into())
                .for_server("eu-1")
                .kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            RconError::Timeout(Duration::from_secs(5))
                .for_server("eu-1")
                .kind(),
            ErrorKind::Timeout
        );

        let err = RconError::Protocol("empty reply".into()).for_server("eu-1");
        assert_eq!(err.to_string(), "protocol error from eu-1: empty reply");
    }
}
