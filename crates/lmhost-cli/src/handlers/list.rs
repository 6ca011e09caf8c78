//! List command handler.
//!
//! Displays the model catalog in a formatted table, installed models first.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::presentation::{print_separator, truncate_string};

pub fn execute(ctx: &CliContext) -> Result<()> {
    let models = ctx.engine.list_catalog();

    if models.is_empty() {
        println!("The model catalog is empty.");
        return Ok(());
    }

    println!(
        "{:<3} {:<26} {:<26} {:<8} {:<20} Description",
        "", "Name", "Display Name", "Size", "Capabilities"
    );
    print_separator(110);

    for model in models {
        let marker = if model.is_installed { "✓" } else { "" };
        println!(
            "{:<3} {:<26} {:<26} {:<8} {:<20} {}",
            marker,
            truncate_string(&model.name, 25),
            truncate_string(&model.display_name, 25),
            model.size,
            truncate_string(&model.capabilities.tags().join(","), 19),
            model.description
        );
    }

    if ctx.settings.default_model.is_none() {
        println!();
        println!("Tip: set LMHOST_DEFAULT_MODEL to skip --model on generate.");
    }

    Ok(())
}
