//! Execution summary
//!
//! Outcome of one [`crate::core::executor::BuildExecutor`] run and its
//! human-readable rendering.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use crate::config::defaults::{INTERRUPTED_EXIT_CODE, MAX_EXIT_CODE};
use crate::core::executor::BuildResult;

/// Result of one build run
///
/// Every package of `order` ends in exactly one of `succeeded`, `failed` and
/// `not_tested`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionSummary {
    /// Packages in the order they were planned
    pub order: Vec<String>,
    /// Packages that built (or were cached, or dry-run)
    pub succeeded: Vec<String>,
    /// Packages whose build failed, including autofailed ones
    pub failed: Vec<String>,
    /// Packages never attempted because of the time budget or an interrupt
    pub not_tested: Vec<String>,
    /// Autofailed package -> the failed dependencies that caused it
    pub autofailed: BTreeMap<String, Vec<String>>,
    /// Per-package measurements of attempted builds
    pub results: BTreeMap<String, BuildResult>,
    /// The run was cancelled
    pub interrupted: bool,
    /// The run stopped because the time budget was used up
    pub timed_out: bool,
}

impl ExecutionSummary {
    /// Empty summary for a planned `order`
    pub fn new(order: Vec<String>) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    /// Largest peak RSS of any build
    pub fn max_rss(&self) -> u64 {
        self.results.values().map(|r| r.peak_rss).max().unwrap_or(0)
    }

    /// Largest peak VMS of any build
    pub fn max_vms(&self) -> u64 {
        self.results.values().map(|r| r.peak_vms).max().unwrap_or(0)
    }

    /// Sum of all build times
    pub fn total_elapsed(&self) -> Duration {
        self.results.values().map(|r| r.elapsed).sum()
    }

    /// Process exit status for this run
    ///
    /// The number of failed packages, clamped to 255, or 130 when the run was
    /// interrupted.
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            return INTERRUPTED_EXIT_CODE;
        }
        i32::try_from(self.failed.len())
            .unwrap_or(MAX_EXIT_CODE)
            .min(MAX_EXIT_CODE)
    }

    /// Per-package table plus aggregate statistics
    pub fn stats_table(&self) -> String {
        let width = self
            .results
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("package".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$}  {:>10}  {:>8}  {:>8}  {:>4}",
            "package", "elapsed", "rss", "disk", "rc"
        );
        for name in &self.order {
            let Some(result) = self.results.get(name) else {
                continue;
            };
            let _ = writeln!(
                out,
                "{name:<width$}  {:>10}  {:>8}  {:>8}  {:>4}",
                format_duration(result.elapsed),
                bytes_to_human(result.peak_rss),
                signed_bytes_to_human(result.disk_delta),
                result.return_code
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Max RSS: {}", bytes_to_human(self.max_rss()));
        let _ = writeln!(out, "Max VMS: {}", bytes_to_human(self.max_vms()));
        let _ = writeln!(
            out,
            "Total elapsed: {:.1} min",
            self.total_elapsed().as_secs_f64() / 60.0
        );
        out
    }
}

/// Human-readable byte count with binary prefixes
///
/// ```
/// use recipeci::core::summary::bytes_to_human;
/// assert_eq!(bytes_to_human(10_000), "9.8K");
/// assert_eq!(bytes_to_human(100_001_221), "95.4M");
/// assert_eq!(bytes_to_human(512), "512B");
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn bytes_to_human(n: u64) -> String {
    const SYMBOLS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
    for (i, symbol) in SYMBOLS.iter().enumerate().rev() {
        let prefix = 1u64 << ((i + 1) * 10);
        if n >= prefix {
            return format!("{:.1}{symbol}", n as f64 / prefix as f64);
        }
    }
    format!("{n}B")
}

fn signed_bytes_to_human(n: i64) -> String {
    if n < 0 {
        format!("-{}", bytes_to_human(n.unsigned_abs()))
    } else {
        bytes_to_human(n.unsigned_abs())
    }
}

fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::ResultOrigin;

    fn result(secs: u64, rss: u64, vms: u64) -> BuildResult {
        BuildResult {
            elapsed: Duration::from_secs(secs),
            peak_rss: rss,
            peak_vms: vms,
            disk_delta: -2048,
            return_code: 0,
            origin: ResultOrigin::Executed,
        }
    }

    #[test]
    fn test_bytes_to_human() {
        assert_eq!(bytes_to_human(0), "0B");
        assert_eq!(bytes_to_human(1023), "1023B");
        assert_eq!(bytes_to_human(1024), "1.0K");
        assert_eq!(bytes_to_human(10_000), "9.8K");
        assert_eq!(bytes_to_human(100_001_221), "95.4M");
        assert_eq!(bytes_to_human(3 << 30), "3.0G");
        assert_eq!(signed_bytes_to_human(-2048), "-2.0K");
    }

    #[test]
    fn test_aggregates() {
        let mut summary = ExecutionSummary::new(vec!["a".into(), "b".into()]);
        summary.results.insert("a".into(), result(30, 100, 900));
        summary.results.insert("b".into(), result(90, 400, 500));

        assert_eq!(summary.max_rss(), 400);
        assert_eq!(summary.max_vms(), 900);
        assert_eq!(summary.total_elapsed(), Duration::from_secs(120));

        let table = summary.stats_table();
        assert!(table.contains("1m30s"));
        assert!(table.contains("Total elapsed: 2.0 min"));
        assert!(table.contains("-2.0K"));
    }

    #[test]
    fn test_exit_code() {
        let mut summary = ExecutionSummary::default();
        assert_eq!(summary.exit_code(), 0);

        summary.failed = (0..3).map(|i| format!("p{i}")).collect();
        assert_eq!(summary.exit_code(), 3);

        summary.failed = (0..300).map(|i| format!("p{i}")).collect();
        assert_eq!(summary.exit_code(), 255);

        summary.interrupted = true;
        assert_eq!(summary.exit_code(), 130);
    }
}
