//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the local inference host.
#[derive(Parser)]
#[command(name = "lmhost")]
#[command(about = "Run a local inference server and manage its models")]
#[command(version)]
pub struct Cli {
    /// Port the managed server listens on
    #[arg(long, global = true, env = "LMHOST_PORT")]
    pub port: Option<u16>,

    /// Override the data directory (managed binaries, models)
    #[arg(long = "data-dir", global = true, env = "LMHOST_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
