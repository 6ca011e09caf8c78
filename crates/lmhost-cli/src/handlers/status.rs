//! Status command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;

/// Report whether a server answers on the configured port, and what it serves.
///
/// Never starts anything; a server started by another process counts.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let base_url = ctx.engine.base_url();
    let supervisor = ctx.engine.supervisor();
    match supervisor.probe().await {
        Ok(()) => {
            println!("✓ Server answering at {base_url}");
            match supervisor.server_models().await {
                Ok(models) if models.is_empty() => println!("  No models loaded on the server"),
                Ok(models) => {
                    for model in models {
                        println!("  {}", model.name);
                    }
                }
                Err(e) => println!("  Could not list server models: {e}"),
            }
        }
        Err(e) => {
            println!("✗ No server at {base_url}");
            println!("  {e}");
        }
    }

    let installed = ctx.engine.list_catalog().iter().filter(|m| m.is_installed).count();
    println!("{installed} model(s) installed in {}", ctx.engine.paths().models_dir.display());
    Ok(())
}
