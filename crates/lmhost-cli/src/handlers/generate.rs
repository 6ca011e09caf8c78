//! Generate command handler.

use std::io::Write;

use anyhow::{Result, anyhow};
use lmhost_runtime::{GenerateOptions, GenerationChunk};

use crate::bootstrap::CliContext;

/// Arguments for the generate command.
pub struct GenerateArgs {
    pub prompt: String,
    pub model: Option<String>,
    pub stream: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// The explicit model, else the configured default.
fn pick_model(explicit: Option<String>, default: Option<&String>) -> Result<String> {
    explicit
        .or_else(|| default.cloned())
        .ok_or_else(|| anyhow!("No model given. Pass --model or set LMHOST_DEFAULT_MODEL."))
}

pub async fn execute(ctx: &CliContext, args: GenerateArgs) -> Result<()> {
    let model = pick_model(args.model, ctx.settings.default_model.as_ref())?;
    let options = GenerateOptions {
        max_tokens: args.max_tokens,
        temperature: args.temperature,
        ..GenerateOptions::default()
    };

    let watcher = ctx.cancel_on_ctrl_c();
    let work = async {
        if args.stream {
            let mut stdout = std::io::stdout();
            let text = ctx
                .engine
                .generate_streaming(&model, &args.prompt, &options, |chunk| {
                    if let GenerationChunk::Text(fragment) = chunk {
                        let _ = stdout.write_all(fragment.as_bytes());
                        let _ = stdout.flush();
                    }
                })
                .await;
            if text.is_ok() {
                println!();
            }
            text.map(drop)
        } else {
            ctx.engine
                .generate(&model, &args.prompt, &options)
                .await
                .map(|text| println!("{text}"))
        }
    };
    let result = tokio::select! {
        result = work => result.map_err(anyhow::Error::from),
        () = ctx.cancel.cancelled() => Err(anyhow!("Generation cancelled")),
    };
    watcher.abort();

    ctx.engine.stop().await;
    result
}
