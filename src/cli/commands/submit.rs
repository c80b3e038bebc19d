//! Submit command implementation
//!
//! Implements `recipeci submit`: hand batches from a batch file to a remote
//! build queue, one submission per batch key.

use anyhow::{bail, Context as _, Result};
use std::path::{Path, PathBuf};

use super::Context;
use crate::cli::output::status;
use crate::core::batch_file::{batch_packages, read_batch_file};
use crate::core::submit::{total_packages, SubmitOptions, Submission};
use crate::infra::filesystem::apply_overlay;
use crate::infra::submitter::{write_descriptor, Submitter};

/// Submit options
pub struct SubmitArgs {
    pub batch_file: Option<PathBuf>,
    pub keys: Vec<String>,
    pub all_batches: Option<PathBuf>,
    pub platforms: Vec<String>,
    pub user: Option<String>,
    pub queue: Option<String>,
    pub labels: Vec<String>,
    pub overlay: Option<PathBuf>,
    pub dry_run: bool,
}

/// Execute the submit command
pub async fn execute(context: &Context, path: &Path, args: SubmitArgs) -> Result<i32> {
    let settings = context.settings(path)?;

    let (file, all) = match (&args.all_batches, &args.batch_file) {
        (Some(file), _) => (file, true),
        (None, Some(file)) => (file, false),
        (None, None) => bail!("Nothing to submit: use --batch-file with --key, or --all-batches"),
    };
    let batches = read_batch_file(file)?;
    let keys: Vec<String> = if all {
        batches.keys().cloned().collect()
    } else {
        args.keys.clone()
    };

    let platforms = if args.platforms.is_empty() {
        settings.submit_platforms()
    } else {
        args.platforms
    };
    if platforms.is_empty() {
        bail!("No target platform: pass --platform or set submit.platforms");
    }

    let options = SubmitOptions {
        user: args
            .user
            .unwrap_or_else(|| settings.submit_user().to_string()),
        queue: args
            .queue
            .unwrap_or_else(|| settings.submit_queue().to_string()),
        labels: if args.labels.is_empty() {
            settings.submit_labels()
        } else {
            args.labels
        },
        platforms,
        dry_run: args.dry_run,
    };

    if let Some(overlay) = &args.overlay {
        apply_overlay(overlay, path)
            .with_context(|| format!("Failed to apply overlay {}", overlay.display()))?;
    }

    if context.output.human() && all {
        println!(
            "{} batches with {} packages in total",
            batches.len(),
            total_packages(&batches)
        );
    }

    let submitter = if args.dry_run {
        None
    } else {
        Some(Submitter::new(settings.submit_tool(), path)?)
    };

    for key in &keys {
        let packages = batch_packages(&batches, key, file)?;
        let submission = Submission::new(key, packages, &options)?;

        match &submitter {
            Some(submitter) => {
                let tail = submitter
                    .submit(&submission, &options)
                    .await
                    .with_context(|| format!("Failed to submit batch '{key}'"))?;
                if context.output.human() {
                    println!(
                        "{} {key}: {} packages submitted as {}",
                        status::SUCCESS,
                        submission.packages.len(),
                        submission.full_package(&options)
                    );
                    for line in tail {
                        println!("  {line}");
                    }
                }
            }
            None => {
                let descriptor = write_descriptor(path, &submission)?;
                if context.output.human() {
                    let tool = settings.submit_tool();
                    println!(
                        "{key}: {} packages, descriptor {}",
                        submission.packages.len(),
                        descriptor.display()
                    );
                    println!("  + {tool} {}", submission.create_args(&options).join(" "));
                    println!("  + {tool} {}", submission.submit_args(&options).join(" "));
                }
            }
        }
    }
    Ok(0)
}
