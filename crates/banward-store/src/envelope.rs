//! Wire shapes of the contents endpoint and the base64 envelope around the
//! ledger payload.

use banward_core::{BanLedger, BanwardError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// `GET .../contents/{path}` reply
#[derive(Debug, Clone, Deserialize)]
pub struct ContentsResponse {
    /// Base64 payload, wrapped with newlines every 60 characters
    #[serde(default)]
    pub content: String,

    /// Transfer encoding of `content`
    #[serde(default)]
    pub encoding: Option<String>,

    /// Content hash of this version
    pub sha: String,
}

/// `PUT .../contents/{path}` request
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRequest<'a> {
    /// Change description recorded with the write
    pub message: &'a str,

    /// Base64 of the new payload
    pub content: String,

    /// Version being replaced; absent when creating the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,

    /// Target branch, default branch when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<&'a str>,
}

/// `PUT .../contents/{path}` reply
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateResponse {
    /// The new version
    pub content: UpdatedContent,
}

/// Version info inside [`UpdateResponse`]
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatedContent {
    /// Content hash of the new version
    pub sha: String,
}

/// Decode the envelope of a fetched document into a ledger.
///
/// Any encoding other than base64 is refused, even with empty `content`.
/// Documents too large to inline come back as `"encoding": "none"` with no
/// content, which is not an empty ledger.
pub fn decode_ledger(contents: &ContentsResponse) -> Result<BanLedger> {
    if let Some(encoding) = contents.encoding.as_deref() {
        if encoding != "base64" {
            return Err(BanwardError::Decode(format!(
                "unsupported content encoding '{encoding}' ({} bytes inline)",
                contents.content.len()
            )));
        }
    }

    let compact: String = contents
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| BanwardError::Decode(format!("invalid base64 envelope: {e}")))?;
    let payload = String::from_utf8(bytes)
        .map_err(|e| BanwardError::Decode(format!("payload is not UTF-8: {e}")))?;

    BanLedger::from_json(&payload)
}

/// Serialize a ledger and wrap it in the base64 envelope
pub fn encode_ledger(ledger: &BanLedger) -> Result<String> {
    Ok(STANDARD.encode(ledger.to_json()?))
}
