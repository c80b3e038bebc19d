//! Split command implementation
//!
//! Implements `recipeci split`: partition the recipe graph into batches and
//! write them to a batch file.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::Context;
use crate::cli::output::status;
use crate::core::batch_file::write_batch_file;
use crate::core::partition::{partition, BatchMap};
use crate::core::recipe::TomlRecipeReader;
use crate::core::scan::{DirtyMode, GraphBuilder};
use crate::core::settings::Settings;
use crate::core::submit::total_packages;
use crate::error::RecipeciError;

/// Execute the split command
pub fn execute(
    context: &Context,
    path: &Path,
    target_size: Option<usize>,
    output: Option<PathBuf>,
    nested: bool,
) -> Result<i32> {
    let settings = context.settings(path)?;
    let target_size = target_size.unwrap_or_else(|| settings.target_size());
    let batches = split_recipes(path, &settings, nested, target_size)?;

    let output = output.unwrap_or_else(|| settings.split_output());
    write_batch_file(&output, &batches)?;

    if context.output.json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
    } else if context.output.human() {
        println!(
            "{} Wrote {} batches ({} packages) to {}",
            status::SUCCESS,
            batches.len(),
            total_packages(&batches),
            output.display()
        );
    }
    Ok(0)
}

fn split_recipes(
    path: &Path,
    settings: &Settings,
    nested: bool,
    target_size: usize,
) -> Result<BatchMap, RecipeciError> {
    let graph = GraphBuilder::new(TomlRecipeReader::new(settings.recipe_file()))
        .nested(nested || settings.nested())
        .build(path, &DirtyMode::Clean)?;
    Ok(partition(&graph, target_size)?)
}
