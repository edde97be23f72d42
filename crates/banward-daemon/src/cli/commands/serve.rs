//! Scheduled sync loop.

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use super::Context;

/// Run expiry cycles until Ctrl-C or SIGTERM.
///
/// A cycle already running when the signal arrives is allowed to finish.
pub async fn execute(ctx: Context) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let engine = ctx.engine.clone();
    let sync = tokio::spawn(async move { engine.run(shutdown_rx).await });

    shutdown_signal().await;

    // The loop only exits on its own if the sender is gone
    let _ = shutdown_tx.send(true);
    sync.await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(signal = "interrupt", "shutdown signal received"),
        () = terminate => info!(signal = "terminate", "shutdown signal received"),
    }
}
