//! Client for the remote ban ledger document.
//!
//! The ledger lives as a JSON file in a hosted git repository and is reached
//! through the repository "contents" REST endpoint. Every read hands back the
//! document's content hash; every write must present it, so a concurrent
//! writer turns into a [`BanwardError::Conflict`] instead of a lost update.

#![doc(html_root_url = "https://docs.rs/banward-store/0.3.0")]

mod client;
mod config;
pub mod envelope;

pub use banward_core::{BanwardError, Result};
pub use client::{LedgerStoreClient, LedgerStoreClientBuilder, DEFAULT_API_BASE};
pub use config::*;
