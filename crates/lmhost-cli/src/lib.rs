//! Command-line front end for lmhost.
//!
//! `main.rs` parses arguments, builds a [`CliContext`] through
//! [`bootstrap`], and dispatches to [`handlers`].

// Used only by the binary target.
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod progress;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use parser::Cli;
pub use progress::CliProgress;
