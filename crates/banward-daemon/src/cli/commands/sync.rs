//! One-shot expiry cycle.

use anyhow::{bail, Result};
use banward::CycleOutcome;

use super::Context;
use crate::output;

/// Run a single cycle and print what it did.
///
/// Exits non-zero if the cycle aborted on an error.
pub async fn execute(ctx: Context) -> Result<()> {
    let report = ctx.engine.run_cycle().await;
    output::print_cycle_report(&report, ctx.json)?;

    if let CycleOutcome::Aborted { stage, reason, .. } = &report.outcome {
        bail!("cycle failed while {stage}: {reason}");
    }
    Ok(())
}
