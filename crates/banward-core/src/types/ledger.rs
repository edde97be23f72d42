use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::{BanwardError, Result};

/// Textual date formats accepted for a ban expiry, tried in order.
pub const ACCEPTED_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"];

/// Format every parsed expiry is written back in.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a ban expiry in any of the [`ACCEPTED_DATE_FORMATS`].
#[must_use]
pub fn parse_ban_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// When a ban ends.
///
/// Documents edited by hand may carry dates in no known format, or values
/// that are not text at all. Those are kept verbatim so a rewrite never
/// loses them, and they never expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// A calendar date (no time of day)
    Date(NaiveDate),
    /// Text that is not a date in any accepted format
    Unparsed(String),
    /// A JSON value other than a string, such as `null` or a number
    Malformed(serde_json::Value),
}

impl Expiry {
    /// Parse strictly, rejecting text in no accepted format
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        parse_ban_date(text).map(Self::Date)
    }

    /// The calendar date, if the expiry parsed
    #[must_use]
    pub const fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            Self::Unparsed(_) | Self::Malformed(_) => None,
        }
    }

    /// Returns true if the ban is over on `today`
    #[must_use]
    pub fn has_elapsed(&self, today: NaiveDate) -> bool {
        self.date().is_some_and(|date| date <= today)
    }
}

impl Default for Expiry {
    fn default() -> Self {
        Self::Unparsed(String::new())
    }
}

impl From<NaiveDate> for Expiry {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<String> for Expiry {
    fn from(text: String) -> Self {
        Self::parse(&text).unwrap_or(Self::Unparsed(text))
    }
}

impl From<serde_json::Value> for Expiry {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::from(text),
            other => Self::Malformed(other),
        }
    }
}

impl Serialize for Expiry {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Malformed(value) => value.serialize(serializer),
            _ => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl std::fmt::Display for Expiry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format(CANONICAL_DATE_FORMAT)),
            Self::Unparsed(text) => f.write_str(text),
            Self::Malformed(value) => write!(f, "{value}"),
        }
    }
}

/// One banned subject's record in the ledger document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanEntry {
    /// Last day of the ban
    #[serde(rename = "banneduntil", default)]
    pub expiry: Expiry,

    /// Why the subject was banned
    #[serde(rename = "BanReason", default)]
    pub reason: String,

    /// Fields this engine doesn't know about, kept for rewrite
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BanEntry {
    /// Create an entry expiring on `expiry`
    #[must_use]
    pub fn new(expiry: impl Into<Expiry>, reason: impl Into<String>) -> Self {
        Self {
            expiry: expiry.into(),
            reason: reason.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// The authoritative mapping of banned subjects to ban details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BanLedger {
    entries: BTreeMap<String, BanEntry>,
}

impl BanLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the JSON payload of a ledger document.
    ///
    /// An empty payload (or `null`) is an empty ledger.
    pub fn from_json(payload: &str) -> Result<Self> {
        let payload = payload.trim();
        if payload.is_empty() || payload == "null" {
            return Ok(Self::default());
        }

        serde_json::from_str(payload)
            .map_err(|e| BanwardError::Decode(format!("invalid ledger payload: {e}")))
    }

    /// Encode as the JSON payload of a ledger document (4-space indent)
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| BanwardError::Internal(e.to_string()))
    }

    /// Number of banned subjects
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nobody is banned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a subject's entry
    #[must_use]
    pub fn get(&self, subject: &str) -> Option<&BanEntry> {
        self.entries.get(subject)
    }

    /// Returns true if the subject has an entry
    #[must_use]
    pub fn contains(&self, subject: &str) -> bool {
        self.entries.contains_key(subject)
    }

    /// Add or replace a subject's entry, returning the previous one
    pub fn insert(&mut self, subject: impl Into<String>, entry: BanEntry) -> Option<BanEntry> {
        self.entries.insert(subject.into(), entry)
    }

    /// Remove a subject's entry
    pub fn remove(&mut self, subject: &str) -> Option<BanEntry> {
        self.entries.remove(subject)
    }

    /// Iterate entries in subject order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BanEntry)> {
        self.entries.iter().map(|(subject, entry)| (subject.as_str(), entry))
    }
}

impl FromIterator<(String, BanEntry)> for BanLedger {
    fn from_iter<I: IntoIterator<Item = (String, BanEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Opaque marker of one version of the remote document.
///
/// An absent token means the document did not exist when it was read; a
/// write with it only succeeds if the document still doesn't exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConcurrencyToken(Option<String>);

impl ConcurrencyToken {
    /// Token for an existing document version
    #[must_use]
    pub fn new(sha: impl Into<String>) -> Self {
        Self(Some(sha.into()))
    }

    /// Token for a document that doesn't exist yet
    #[must_use]
    pub const fn absent() -> Self {
        Self(None)
    }

    /// Returns true if the document didn't exist when read
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// The content hash, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl std::fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(sha) => f.write_str(sha),
            None => f.write_str("<absent>"),
        }
    }
}

/// A ledger as read from the store, bound to the version it came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    /// Decoded ledger
    pub ledger: BanLedger,
    /// Version the ledger was read at
    pub token: ConcurrencyToken,
}

impl LedgerSnapshot {
    /// Pair a ledger with the token it was read at
    #[must_use]
    pub const fn new(ledger: BanLedger, token: ConcurrencyToken) -> Self {
        Self { ledger, token }
    }
}
