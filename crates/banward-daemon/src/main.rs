//! banwardd - ban ledger sync daemon and operator commands

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    banward_daemon::run().await
}
