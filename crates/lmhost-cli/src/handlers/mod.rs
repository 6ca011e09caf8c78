//! Command handlers.
//!
//! Each handler is a thin wrapper: `pub async fn execute(ctx: &CliContext, ...)`
//! that calls into the engine and formats the result for the terminal.

pub mod generate;
pub mod install;
pub mod list;
pub mod paths;
pub mod serve;
pub mod status;
