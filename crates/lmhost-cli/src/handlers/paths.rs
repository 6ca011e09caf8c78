//! Paths command handler.
//!
//! Prints every resolved directory, after command-line overrides.

use anyhow::Result;

use crate::bootstrap::CliContext;

pub fn execute(ctx: &CliContext) -> Result<()> {
    println!("{}", ctx.engine.paths());
    println!("server:    {}", ctx.engine.base_url());
    Ok(())
}
