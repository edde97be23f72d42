//! Keeps a shared ban ledger and a fleet of game servers in agreement.
//!
//! The ledger is a JSON document in a hosted git repository, mapping each
//! banned player to the last day of their ban. The engine periodically lifts
//! bans whose day has passed on every server and removes them from the
//! ledger, and applies new bans submitted by operators the same way.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use banward::{EngineConfig, OperatorConsole, SyncEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> banward::Result<()> {
//!     let config = EngineConfig::load("banward.toml".as_ref())?;
//!     let engine = Arc::new(SyncEngine::from_config(&config)?);
//!
//!     // Lift whatever has expired today
//!     let report = engine.run_cycle().await;
//!     println!("unbanned: {:?}", report.unbanned);
//!
//!     // Ban someone from chat input
//!     let console = OperatorConsole::new(engine.clone());
//!     let receipt = console.submit_ban("bob\n2025-02-01\ntoxicity").await?;
//!     println!("{receipt}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/banward/0.3.0")]

pub mod config;
pub mod console;
pub mod directory;
pub mod dispatch;
pub mod orchestrator;
pub mod request;
pub mod scanner;

#[cfg(test)]
mod testing;

// Re-export core types
pub use banward_core::*;

// Re-export the transports
pub use banward_rcon::{RconClient, SessionConfig};
pub use banward_store::{LedgerStoreClient, LedgerStoreClientBuilder, RetryConfig};

pub use config::{EngineConfig, StoreConfig};
pub use console::OperatorConsole;
pub use directory::ServerDirectory;
pub use dispatch::FanoutDispatcher;
pub use orchestrator::{CycleOutcome, CycleReport, CycleState, EngineSettings, SyncEngine};
pub use request::{BanReceipt, BanRequest};

// Re-export runtime for convenience
pub use tokio;
