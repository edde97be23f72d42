//! Ledger commands: ban and status.

use anyhow::Result;

use super::Context;
use crate::cli::args::{BanArgs, StatusArgs};
use crate::output;

/// Ban a player everywhere and record it
pub async fn execute(ctx: Context, args: BanArgs) -> Result<()> {
    let receipt = ctx
        .console
        .ban(&args.subject, &args.until, &args.reason.join(" "))
        .await?;
    output::print_receipt(&receipt, ctx.json)
}

/// Show a player's ledger entry
pub async fn status(ctx: Context, args: StatusArgs) -> Result<()> {
    let entry = ctx.console.check_unban_status(&args.subject).await?;
    output::print_status(&args.subject, entry.as_ref(), ctx.json)
}
