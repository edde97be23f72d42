//! One-off remote console commands against a single server.

use anyhow::Result;

use super::Context;
use crate::cli::args::{GiveItemArgs, KickArgs, ServerArgs};
use crate::output;

pub fn list(ctx: &Context) -> Result<()> {
    output::print_lines(&ctx.console.servers(), ctx.json)
}

pub async fn kick(ctx: Context, args: KickArgs) -> Result<()> {
    let response = ctx.console.kick(&args.server, &args.player).await?;
    output::print_response(&response, ctx.json)
}

pub async fn rotate_map(ctx: Context, args: ServerArgs) -> Result<()> {
    let response = ctx.console.rotate_map(&args.server).await?;
    output::print_response(&response, ctx.json)
}

pub async fn give_item(ctx: Context, args: GiveItemArgs) -> Result<()> {
    let response = ctx
        .console
        .give_item(&args.server, &args.player, &args.item)
        .await?;
    output::print_response(&response, ctx.json)
}

pub async fn players(ctx: Context, args: ServerArgs) -> Result<()> {
    let players = ctx.console.list_players(&args.server).await?;
    output::print_players(&players, ctx.json)
}

pub async fn bans(ctx: Context, args: ServerArgs) -> Result<()> {
    let bans = ctx.console.list_bans(&args.server).await?;
    output::print_lines(&bans, ctx.json)
}
