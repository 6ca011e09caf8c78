//! Subcommands.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Show whether a server answers on the configured port
    Status,

    /// List the model catalog, installed models first
    List,

    /// Install a model from the catalog
    Install {
        /// Catalog name (e.g. "qwen2.5-coder:1.5b")
        model: String,
    },

    /// Generate text with an installed model
    Generate {
        /// Prompt text
        prompt: String,
        /// Model to use (defaults to LMHOST_DEFAULT_MODEL)
        #[arg(short, long)]
        model: Option<String>,
        /// Print fragments as they arrive
        #[arg(long)]
        stream: bool,
        /// Maximum tokens to generate
        #[arg(long = "max-tokens")]
        max_tokens: Option<u32>,
        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Start the server and keep it running until Ctrl-C
    Serve,

    /// Show resolved paths for all lmhost directories
    Paths,
}
