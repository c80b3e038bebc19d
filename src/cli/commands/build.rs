//! Build command implementation
//!
//! Implements `recipeci build`: plan the selection, run the build tool once
//! per package and report the outcome. The exit status is the number of
//! failed packages.

use anyhow::{Context as _, Result};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{Context, TargetArgs};
use crate::cli::output::{create_build_bar, status};
use crate::core::executor::{ArtifactCache, BuildEvent, BuildExecutor, ExecuteOptions};
use crate::core::settings::Settings;
use crate::core::summary::ExecutionSummary;
use crate::infra::dirs::RecipeciDirs;
use crate::infra::filesystem::apply_overlay;
use crate::infra::runner::ProcessRunner;

/// Build options
pub struct BuildOptions {
    /// Record packages as built without running anything
    pub dry_run: bool,
    /// Build dependents of failed packages anyway
    pub no_autofail: bool,
    /// Cumulative time budget in seconds
    pub job_timeout: Option<u64>,
    /// Reserve of the budget in seconds
    pub timeout_buffer: Option<u64>,
    /// Extra build tool arguments
    pub args: Option<String>,
    /// Overlay directory copied over the recipes first
    pub overlay: Option<PathBuf>,
    /// Skip packages already in the build cache
    pub skip_built: bool,
}

impl BuildOptions {
    fn execute_options(&self, settings: &Settings, level: usize) -> ExecuteOptions {
        let skip_built = self.skip_built.then(|| {
            ArtifactCache::new(
                RecipeciDirs::new().build_cache_dir(),
                settings.artifact_extension(),
            )
        });

        ExecuteOptions {
            level,
            dry_run: self.dry_run,
            autofail: !self.no_autofail && settings.autofail(),
            job_timeout: self
                .job_timeout
                .map(Duration::from_secs)
                .or_else(|| settings.job_timeout()),
            timeout_buffer: self
                .timeout_buffer
                .map_or_else(|| settings.timeout_buffer(), Duration::from_secs),
            extra_args: self
                .args
                .as_deref()
                .map(|a| a.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            skip_built,
        }
    }
}

/// Execute the build command
pub async fn execute(context: &Context, target: &TargetArgs, options: BuildOptions) -> Result<i32> {
    let output = context.output;
    let settings = context.settings(&target.path)?;

    if let Some(overlay) = &options.overlay {
        let copied = apply_overlay(overlay, &target.path)
            .with_context(|| format!("Failed to apply overlay {}", overlay.display()))?;
        tracing::info!("Applied {copied} overlay files");
    }

    let (graph, selection) = target.resolve(&settings)?;
    let Some(selection) = selection else {
        if output.json {
            println!("{}", serde_json::to_string_pretty(&ExecutionSummary::default())?);
        } else if output.human() {
            println!("Nothing to build");
        }
        return Ok(0);
    };

    let mut runner = ProcessRunner::new(settings.build_tool(), settings.build_args())
        .poll_interval(settings.poll_interval())
        .watch_dir(settings.build.watch_dir.clone());
    if !options.dry_run {
        runner = runner.resolve()?;
    }

    let executor =
        BuildExecutor::new(runner).options(options.execute_options(&settings, target.level));
    let plan = executor.plan(&graph, &selection)?;
    let order = plan.buildable();

    if output.human() {
        println!("Build order:");
        for name in &order {
            println!("  {name}");
        }
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    let bar = if output.human() {
        create_build_bar(order.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let summary = executor
        .execute_plan(&plan, &cancel, |event| match event {
            BuildEvent::Started { package, .. } => bar.set_message(package.to_string()),
            BuildEvent::Finished { .. } => bar.inc(1),
        })
        .await;
    bar.finish_and_clear();

    report(context, &summary)?;
    Ok(summary.exit_code())
}

fn report(context: &Context, summary: &ExecutionSummary) -> Result<()> {
    if context.output.json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    if !context.output.human() {
        return Ok(());
    }

    for name in &summary.succeeded {
        println!("{} {name}", status::SUCCESS);
    }
    for name in &summary.failed {
        match summary.autofailed.get(name) {
            Some(causes) => println!("{} {name} (dependencies failed: {})", status::ERROR, causes.join(", ")),
            None => println!("{} {name}", status::ERROR),
        }
    }
    for name in &summary.not_tested {
        println!("{} {name} (not tested)", status::WARNING);
    }

    println!();
    print!("{}", summary.stats_table());
    println!(
        "{} succeeded, {} failed, {} not tested{}",
        summary.succeeded.len(),
        summary.failed.len(),
        summary.not_tested.len(),
        if summary.interrupted {
            " (interrupted)"
        } else if summary.timed_out {
            " (time budget used up)"
        } else {
            ""
        }
    );
    Ok(())
}
