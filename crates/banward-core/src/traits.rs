//! Seams between the engine and the outside world.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BanLedger, ConcurrencyToken, LedgerSnapshot, RconCommand, RconResponse, ServerEndpoint};

/// Delivers one remote-console command to one game server.
///
/// Implementations open a fresh connection per call and keep no state
/// between calls.
#[async_trait]
pub trait RconTransport: Send + Sync {
    /// Connect, authenticate, send `command`, read one reply, disconnect.
    async fn send(&self, endpoint: &ServerEndpoint, command: &RconCommand) -> Result<RconResponse>;
}

/// The remote document holding the authoritative ban ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch the current ledger together with its concurrency token.
    async fn read(&self) -> Result<LedgerSnapshot>;

    /// Replace the whole document if it still matches `token`.
    ///
    /// Returns the token of the newly written version. A stale token fails
    /// with [`crate::BanwardError::Conflict`].
    async fn write(
        &self,
        ledger: &BanLedger,
        token: &ConcurrencyToken,
        description: &str,
    ) -> Result<ConcurrencyToken>;
}
