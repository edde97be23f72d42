//! # banward-daemon
//!
//! Runs the ban ledger sync loop and exposes the operator console on the
//! command line.
//!
//! - `banwardd serve` lifts expired bans on a schedule until interrupted
//! - `banwardd sync` runs a single cycle
//! - `banwardd ban`, `status`, `kick`, `players`, ... are one-off operator
//!   commands

pub mod cli;
pub mod output;

pub use cli::run;
