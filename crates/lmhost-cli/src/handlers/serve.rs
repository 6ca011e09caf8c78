//! Serve command handler.

use anyhow::Result;
use tracing::info;

use crate::bootstrap::CliContext;

/// Start (or adopt) the server and hold it until Ctrl-C.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let watcher = ctx.cancel_on_ctrl_c();
    let started = ctx.engine.ensure_running().await;
    if let Err(e) = started {
        watcher.abort();
        ctx.engine.dispose().await;
        return Err(e.into());
    }

    println!("Server ready at {}", ctx.engine.base_url());
    if let Some(exe) = ctx.engine.supervisor().executable() {
        println!("Binary: {}", exe.display());
    }
    println!("Press Ctrl-C to stop.");

    ctx.cancel.cancelled().await;

    info!("Shutting down");
    ctx.engine.dispose().await;
    Ok(())
}
