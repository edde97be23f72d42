//! Command implementations.

pub mod ban;
pub mod serve;
pub mod server;
pub mod sync;

use banward::{OperatorConsole, SyncEngine};
use std::sync::Arc;

/// Shared context for all commands
pub struct Context {
    pub engine: Arc<SyncEngine>,
    pub console: OperatorConsole,
    pub json: bool,
}
