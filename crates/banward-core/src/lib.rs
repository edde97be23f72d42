//! Core types and traits for the banward ban ledger engine.
//!
//! This crate provides the foundational types shared by every banward crate:
//!
//! - **Types**: the ban ledger, remote-console commands and responses,
//!   server endpoints and per-server dispatch outcomes
//! - **Errors**: one taxonomy for store, session and input failures via [`BanwardError`]
//! - **Traits**: the [`RconTransport`] and [`LedgerStore`] seams the engine is built on
//!
//! # Example
//!
//! ```rust,ignore
//! use banward_core::{BanLedger, Result};
//!
//! fn expired_today(document: &str) -> Result<usize> {
//!     let ledger = BanLedger::from_json(document)?;
//!     let today = chrono::Local::now().date_naive();
//!     Ok(ledger.iter().filter(|(_, entry)| entry.expiry.has_elapsed(today)).count())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/banward-core/0.3.0")]

mod error;
mod traits;
pub mod types;

pub use error::{BanwardError, ErrorKind, Result};
pub use traits::{LedgerStore, RconTransport};
pub use types::*;
