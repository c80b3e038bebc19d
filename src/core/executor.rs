//! Build execution
//!
//! Walks a build order one package at a time, handing each to a
//! [`BuildRunner`]. Failures cascade to dependents (autofail), a cumulative
//! time budget stops the run early, and a cancellation token interrupts it.
//! Partial progress is always returned in the [`ExecutionSummary`].

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::defaults::DEFAULT_TIMEOUT_BUFFER_SECS;
use crate::core::graph::DependencyGraph;
use crate::core::planner::{self, BuildPlan, Selection};
use crate::core::recipe::Recipe;
use crate::core::summary::ExecutionSummary;
use crate::error::{PlanError, RunnerError};

/// Where a [`BuildResult`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    /// The build tool ran
    Executed,
    /// Dry run; nothing ran
    DryRun,
    /// The artifact already existed in the build cache
    Cached,
}

/// Measurements of one package build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildResult {
    /// Wall-clock build time
    #[serde(serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
    /// Peak resident memory of the build process tree (bytes)
    pub peak_rss: u64,
    /// Peak virtual memory of the build process tree (bytes)
    pub peak_vms: u64,
    /// Largest growth of the watched directory during the build (bytes)
    pub disk_delta: i64,
    /// Exit status of the build tool; 0 on success
    pub return_code: i32,
    pub origin: ResultOrigin,
}

impl BuildResult {
    /// Successful result that cost nothing
    pub fn zero(origin: ResultOrigin) -> Self {
        Self {
            elapsed: Duration::ZERO,
            peak_rss: 0,
            peak_vms: 0,
            disk_delta: 0,
            return_code: 0,
            origin,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.return_code == 0
    }
}

fn as_secs_f64<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// One package handed to a [`BuildRunner`]
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub package: &'a str,
    pub recipe_path: &'a Path,
    /// Extra arguments for the build tool
    pub extra_args: &'a [String],
}

/// Runs the build of a single package
///
/// A non-zero exit is reported through [`BuildResult::return_code`]; errors
/// are reserved for builds that could not be run at all. When `cancel` fires
/// the runner stops the build and returns [`RunnerError::Interrupted`].
pub trait BuildRunner {
    fn run(
        &self,
        request: &BuildRequest<'_>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BuildResult, RunnerError>> + Send;
}

/// Directory of already built artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCache {
    pub dir: PathBuf,
    pub extension: String,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Whether the artifact of `recipe` is present
    pub fn contains(&self, recipe: &Recipe) -> bool {
        self.dir.join(recipe.artifact_name(&self.extension)).is_file()
    }
}

/// Options of one execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Dependency levels added around requested packages
    pub level: usize,
    /// Record every package as built without running anything
    pub dry_run: bool,
    /// Fail packages whose declared dependencies failed, without building
    pub autofail: bool,
    /// Cumulative build time budget
    pub job_timeout: Option<Duration>,
    /// Part of the budget kept in reserve
    pub timeout_buffer: Duration,
    /// Extra arguments for every build
    pub extra_args: Vec<String>,
    /// Skip packages whose artifact is already in this cache
    pub skip_built: Option<ArtifactCache>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            level: 0,
            dry_run: false,
            autofail: true,
            job_timeout: None,
            timeout_buffer: Duration::from_secs(DEFAULT_TIMEOUT_BUFFER_SECS),
            extra_args: Vec::new(),
            skip_built: None,
        }
    }
}

impl ExecuteOptions {
    /// Elapsed time after which no further package is started
    fn budget(&self) -> Option<Duration> {
        self.job_timeout
            .map(|timeout| timeout.saturating_sub(self.timeout_buffer))
    }
}

/// Progress notifications emitted while executing
#[derive(Debug, Clone, Copy)]
pub enum BuildEvent<'a> {
    /// A package is about to be processed
    Started { package: &'a str, index: usize },
    /// A package finished
    Finished { package: &'a str, succeeded: bool },
}

/// Sequential build executor
#[derive(Debug, Clone)]
pub struct BuildExecutor<R> {
    runner: R,
    options: ExecuteOptions,
}

impl<R: BuildRunner> BuildExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            options: ExecuteOptions::default(),
        }
    }

    #[must_use]
    pub fn options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    /// Plan the packages `selection` needs
    pub fn plan(
        &self,
        graph: &DependencyGraph,
        selection: &Selection,
    ) -> Result<BuildPlan, PlanError> {
        planner::plan(graph, selection, self.options.level)
    }

    /// Plan and build `selection`
    pub async fn execute(
        &self,
        graph: &DependencyGraph,
        selection: &Selection,
        cancel: &CancellationToken,
    ) -> Result<ExecutionSummary, PlanError> {
        let plan = self.plan(graph, selection)?;
        Ok(self.execute_plan(&plan, cancel, |_| {}).await)
    }

    /// Build every package of `plan` that has a recipe, in order
    pub async fn execute_plan<F>(
        &self,
        plan: &BuildPlan,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> ExecutionSummary
    where
        F: FnMut(BuildEvent<'_>),
    {
        let order = plan.buildable();
        let mut summary = ExecutionSummary::new(order.clone());
        let mut failed: BTreeSet<String> = BTreeSet::new();
        let mut total = Duration::ZERO;
        let budget = self.options.budget();

        for (index, name) in order.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("Interrupted before building {name}");
                summary.interrupted = true;
                summary.not_tested.extend(order[index..].iter().cloned());
                break;
            }

            let Some(recipe) = plan.subgraph.node(name).and_then(|n| n.recipe.as_ref()) else {
                continue;
            };
            on_event(BuildEvent::Started {
                package: name,
                index,
            });

            if self.options.autofail {
                let causes: Vec<String> = recipe
                    .dependencies
                    .keys()
                    .filter(|dep| failed.contains(*dep))
                    .cloned()
                    .collect();
                if !causes.is_empty() {
                    tracing::warn!(
                        "Building {name} failed because one or more of its dependencies failed to build: {}",
                        causes.join(", ")
                    );
                    failed.insert(name.clone());
                    summary.failed.push(name.clone());
                    summary.autofailed.insert(name.clone(), causes);
                    on_event(BuildEvent::Finished {
                        package: name,
                        succeeded: false,
                    });
                    continue;
                }
            }

            let result = match self.build_one(recipe, cancel).await {
                Ok(result) => result,
                Err(RunnerError::Interrupted { .. }) => {
                    tracing::warn!("Build of {name} interrupted");
                    summary.interrupted = true;
                    summary.not_tested.extend(order[index..].iter().cloned());
                    break;
                }
                Err(e) => {
                    tracing::error!("{e}");
                    failed.insert(name.clone());
                    summary.failed.push(name.clone());
                    on_event(BuildEvent::Finished {
                        package: name,
                        succeeded: false,
                    });
                    continue;
                }
            };

            total += result.elapsed;
            let succeeded = result.succeeded();
            if succeeded {
                tracing::info!("Built {name} in {:.1}s", result.elapsed.as_secs_f64());
                summary.succeeded.push(name.clone());
            } else {
                tracing::error!(
                    "Build of {name} failed with exit code {}",
                    result.return_code
                );
                failed.insert(name.clone());
                summary.failed.push(name.clone());
            }
            summary.results.insert(name.clone(), result);
            on_event(BuildEvent::Finished {
                package: name,
                succeeded,
            });

            if budget.is_some_and(|budget| total >= budget) {
                let remaining = &order[index + 1..];
                if !remaining.is_empty() {
                    tracing::warn!(
                        "Time budget used up after {:.0}s; {} packages not tested",
                        total.as_secs_f64(),
                        remaining.len()
                    );
                    summary.timed_out = true;
                    summary.not_tested.extend(remaining.iter().cloned());
                }
                break;
            }
        }

        summary
    }

    async fn build_one(
        &self,
        recipe: &Recipe,
        cancel: &CancellationToken,
    ) -> Result<BuildResult, RunnerError> {
        if let Some(cache) = &self.options.skip_built {
            if cache.contains(recipe) {
                tracing::info!("{} is already built, skipping", recipe.name);
                return Ok(BuildResult::zero(ResultOrigin::Cached));
            }
        }

        if self.options.dry_run {
            tracing::info!("Would build {}", recipe.path.display());
            return Ok(BuildResult::zero(ResultOrigin::DryRun));
        }

        let request = BuildRequest {
            package: &recipe.name,
            recipe_path: &recipe.path,
            extra_args: &self.options.extra_args,
        };
        self.runner.run(&request, cancel).await
    }
}
