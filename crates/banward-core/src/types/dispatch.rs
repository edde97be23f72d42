use crate::error::{BanwardError, ErrorKind};
use crate::types::{RconCommand, RconResponse};

/// Ledger-driven action broadcast to every server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BanAction {
    /// Enforce a ban
    Ban,
    /// Lift a ban
    Unban,
}

impl BanAction {
    /// The remote-console command carrying this action for `subject`
    #[must_use]
    pub fn command(self, subject: &str) -> RconCommand {
        match self {
            Self::Ban => RconCommand::Ban(subject.to_string()),
            Self::Unban => RconCommand::Unban(subject.to_string()),
        }
    }
}

impl std::fmt::Display for BanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ban => f.write_str("ban"),
            Self::Unban => f.write_str("unban"),
        }
    }
}

/// What happened when one command was sent to one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The server answered
    Delivered(RconResponse),
    /// The exchange failed
    Failed {
        /// Failure classification
        kind: ErrorKind,
        /// Human-readable reason
        reason: String,
    },
}

/// Per-server outcome of one fanned-out command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Directory name of the server
    pub server: String,
    /// Reply or failure
    pub outcome: DispatchOutcome,
}

impl DispatchResult {
    /// A server that answered
    #[must_use]
    pub fn delivered(server: impl Into<String>, response: RconResponse) -> Self {
        Self {
            server: server.into(),
            outcome: DispatchOutcome::Delivered(response),
        }
    }

    /// A server that could not be reached or refused the exchange
    #[must_use]
    pub fn failed(server: impl Into<String>, error: &BanwardError) -> Self {
        Self {
            server: server.into(),
            outcome: DispatchOutcome::Failed {
                kind: error.kind(),
                reason: error.to_string(),
            },
        }
    }

    /// Returns true if the server answered
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Delivered(_))
    }

    /// Failure classification, if the exchange failed
    #[must_use]
    pub const fn failure_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            DispatchOutcome::Failed { kind, .. } => Some(*kind),
            DispatchOutcome::Delivered(_) => None,
        }
    }

    /// The reply, if the server answered
    #[must_use]
    pub const fn response(&self) -> Option<&RconResponse> {
        match &self.outcome {
            DispatchOutcome::Delivered(response) => Some(response),
            DispatchOutcome::Failed { .. } => None,
        }
    }
}

impl std::fmt::Display for DispatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            DispatchOutcome::Delivered(response) => write!(f, "{}: ok ({response})", self.server),
            DispatchOutcome::Failed { kind, reason } => {
                write!(f, "{}: failed [{kind}] {reason}", self.server)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_action_commands() {
        assert_eq!(BanAction::Ban.command("bob"), RconCommand::Ban("bob".into()));
        assert_eq!(
            BanAction::Unban.command("bob"),
            RconCommand::Unban("bob".into())
        );
    }

    #[test]
    fn test_failed_result_keeps_kind() {
        let err = BanwardError::Timeout {
            server: "us-2".into(),
            timeout: Duration::from_secs(5),
        };
        let result = DispatchResult::failed("us-2", &err);
        assert!(!result.is_success());
        assert_eq!(result.failure_kind(), Some(ErrorKind::Timeout));
        assert!(result.to_string().contains("[timeout]"));
    }

    #[test]
    fn test_delivered_result() {
        let result = DispatchResult::delivered("us-1", RconResponse::Text("ok".into()));
        assert!(result.is_success());
        assert_eq!(result.failure_kind(), None);
        assert_eq!(result.response(), Some(&RconResponse::Text("ok".into())));
    }
}
