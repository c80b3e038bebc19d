//! Build tool process runner
//!
//! Runs `<tool> <args...> <extra args...> <recipe dir>` for one package while
//! sampling its resource usage on a fixed interval. On Unix the build runs in
//! its own process group so an interrupt takes down everything it started.

use std::path::PathBuf;
#[cfg(unix)]
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::defaults::DEFAULT_POLL_INTERVAL_MS;
use crate::core::executor::{BuildRequest, BuildResult, BuildRunner, ResultOrigin};
use crate::error::RunnerError;
#[cfg(unix)]
use crate::infra::monitor::process_tree;
use crate::infra::monitor::{ResourceMonitor, ResourcePeaks};

/// [`BuildRunner`] that spawns the build tool as a child process
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    tool: PathBuf,
    args: Vec<String>,
    poll_interval: Duration,
    watch_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(tool: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            watch_dir: None,
        }
    }

    /// Look the tool up on `PATH` so a missing tool fails once, up front
    pub fn resolve(mut self) -> Result<Self, RunnerError> {
        self.tool = which::which(&self.tool).map_err(|_| RunnerError::ToolNotFound {
            tool: self.tool.display().to_string(),
        })?;
        Ok(self)
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Report the growth of `dir` as the disk usage of each build
    #[must_use]
    pub fn watch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.watch_dir = dir;
        self
    }

    fn command(&self, request: &BuildRequest<'_>) -> Command {
        let mut command = Command::new(&self.tool);
        command
            .args(&self.args)
            .args(request.extra_args)
            .arg(request.recipe_path)
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command
    }

    fn command_line(&self, request: &BuildRequest<'_>) -> String {
        std::iter::once(self.tool.display().to_string())
            .chain(self.args.iter().cloned())
            .chain(request.extra_args.iter().cloned())
            .chain(std::iter::once(request.recipe_path.display().to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl BuildRunner for ProcessRunner {
    async fn run(
        &self,
        request: &BuildRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<BuildResult, RunnerError> {
        tracing::info!("+ {}", self.command_line(request));

        // Disk baseline before the build can write anything
        let watch_dir = self.watch_dir.clone();
        let mut monitor = tokio::task::spawn_blocking(move || ResourceMonitor::new(None, watch_dir))
            .await
            .map_err(|e| RunnerError::Spawn {
                package: request.package.to_string(),
                error: e.to_string(),
            })?;

        let start = Instant::now();
        let mut child = self
            .command(request)
            .spawn()
            .map_err(|e| RunnerError::Spawn {
                package: request.package.to_string(),
                error: e.to_string(),
            })?;

        let stop_sampling = CancellationToken::new();
        monitor.track(child.id());
        let sampler = tokio::spawn(sample_until(
            monitor,
            self.poll_interval,
            stop_sampling.clone(),
        ));

        let exited = tokio::select! {
            status = child.wait() => Some(status),
            () = cancel.cancelled() => None,
        };

        let Some(status) = exited else {
            tracing::debug!("Killing build of {}", request.package);
            terminate(&mut child).await;
            stop_sampling.cancel();
            sampler.abort();
            return Err(RunnerError::Interrupted {
                package: request.package.to_string(),
            });
        };
        stop_sampling.cancel();
        let status = status.map_err(|e| RunnerError::Spawn {
            package: request.package.to_string(),
            error: e.to_string(),
        })?;

        let peaks = sampler.await.unwrap_or_else(|e| {
            tracing::debug!("Resource sampling of {} failed: {e}", request.package);
            ResourcePeaks::default()
        });
        let return_code = status.code().unwrap_or(-1);
        tracing::debug!(
            "{} exited with {return_code} after {:.1}s",
            request.package,
            start.elapsed().as_secs_f64()
        );

        Ok(BuildResult {
            elapsed: start.elapsed(),
            peak_rss: peaks.rss,
            peak_vms: peaks.vms,
            disk_delta: peaks.disk_delta,
            return_code,
            origin: ResultOrigin::Executed,
        })
    }
}

/// Sample the build on every tick until `stop` fires, off the async workers
async fn sample_until(
    mut monitor: ResourceMonitor,
    interval: Duration,
    stop: CancellationToken,
) -> ResourcePeaks {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = stop.cancelled() => break,
            _ = ticker.tick() => {
                let sampled = tokio::task::spawn_blocking(move || {
                    monitor.sample();
                    monitor
                })
                .await;
                match sampled {
                    Ok(sampled) => monitor = sampled,
                    Err(e) => {
                        tracing::debug!("Resource sampling stopped: {e}");
                        return ResourcePeaks::default();
                    }
                }
            }
        }
    }
    monitor.peaks()
}

/// Kill the build's process group and every known descendant, then reap it
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        kill_tree(pid).await;
    }
    if let Err(e) = child.start_kill() {
        tracing::debug!("Build process already gone: {e}");
    }
    if let Err(e) = child.wait().await {
        tracing::warn!("Failed to reap build process: {e}");
    }
}

#[cfg(unix)]
async fn kill_tree(pid: u32) {
    // Collected before the kill, while descendants are still linked to `pid`
    let tree = tokio::task::spawn_blocking(move || process_tree(pid))
        .await
        .unwrap_or_default();
    let mut targets = vec![format!("-{pid}")];
    targets.extend(tree.into_iter().filter(|&p| p != pid).map(|p| p.to_string()));

    match Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .args(&targets)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        // Non-zero when some targets already exited
        Ok(status) if !status.success() => {
            tracing::debug!("kill {} exited with {status}", targets.join(" "));
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to signal process group {pid}: {e}"),
    }
}

#[cfg(not(unix))]
async fn kill_tree(_pid: u32) {}
