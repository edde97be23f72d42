//! Ad hoc ban submissions and their acknowledgement.

use banward_core::{
    check_argument, parse_ban_date, BanEntry, BanwardError, ConcurrencyToken, DispatchResult,
    Result, CANONICAL_DATE_FORMAT,
};
use chrono::NaiveDate;

/// A validated request to ban one subject until a date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRequest {
    /// Player identity
    pub subject: String,
    /// Last day of the ban
    pub expiry: NaiveDate,
    /// Why the subject is banned
    pub reason: String,
}

impl BanRequest {
    /// Validate the three fields of a submission.
    ///
    /// The date may be written in any accepted ledger format; it is stored
    /// in the canonical one.
    pub fn new(subject: &str, expiry: &str, reason: &str) -> Result<Self> {
        let subject = subject.trim();
        let reason = reason.trim();

        check_argument("subject", subject)?;
        if reason.is_empty() {
            return Err(BanwardError::Validation("reason is empty".into()));
        }

        let expiry = parse_ban_date(expiry).ok_or_else(|| {
            BanwardError::Validation(format!(
                "'{}' is not a date (expected YYYY-MM-DD, DD-MM-YYYY or YYYY/MM/DD)",
                expiry.trim()
            ))
        })?;

        Ok(Self {
            subject: subject.to_string(),
            expiry,
            reason: reason.to_string(),
        })
    }

    /// Parse a chat submission: exactly three lines holding subject,
    /// expiry date and reason.
    pub fn parse_message(message: &str) -> Result<Self> {
        let lines: Vec<&str> = message.trim_end_matches(['\r', '\n']).split('\n').collect();
        match lines.as_slice() {
            [subject, expiry, reason] => Self::new(subject, expiry, reason),
            _ => Err(BanwardError::Validation(format!(
                "expected 3 lines (name, date, reason), got {}",
                lines.len()
            ))),
        }
    }

    /// The ledger entry this request writes
    #[must_use]
    pub fn entry(&self) -> BanEntry {
        BanEntry::new(self.expiry, self.reason.clone())
    }
}

/// What a completed submission did
#[derive(Debug, Clone)]
pub struct BanReceipt {
    /// The applied request
    pub request: BanRequest,
    /// Per-server outcome of the `ban` broadcast
    pub dispatches: Vec<DispatchResult>,
    /// Entry the request replaced, if the subject was already banned
    pub replaced: Option<BanEntry>,
    /// Version written
    pub token: ConcurrencyToken,
    /// Stale writes retried before the commit landed
    pub conflicts: u32,
}

impl BanReceipt {
    /// Servers that didn't apply the ban
    #[must_use]
    pub fn failed_servers(&self) -> Vec<&str> {
        self.dispatches
            .iter()
            .filter(|result| !result.is_success())
            .map(|result| result.server.as_str())
            .collect()
    }
}

impl std::fmt::Display for BanReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Message received and processed:\nName: {}\nDate: {}\nReason: {}",
            self.request.subject,
            self.request.expiry.format(CANONICAL_DATE_FORMAT),
            self.request.reason
        )?;

        let failed = self.failed_servers();
        if !failed.is_empty() {
            write!(f, "\nNot applied on: {}", failed.join(", "))?;
        }
        Ok(())
    }
}
