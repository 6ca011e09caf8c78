//! Install command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::progress::CliProgress;

/// Install `model`, cancelling cleanly on Ctrl-C.
pub async fn execute(ctx: &CliContext, model: &str) -> Result<()> {
    let watcher = ctx.cancel_on_ctrl_c();

    let progress = CliProgress::new();
    let result = ctx.engine.install(model, &progress, &ctx.cancel).await;
    watcher.abort();

    // The server was only needed for the pull.
    ctx.engine.stop().await;

    let outcome = result?;
    if outcome.cancelled {
        println!("Install of {} cancelled.", outcome.model);
    } else {
        println!("✓ {} is ready.", outcome.model);
    }
    Ok(())
}
