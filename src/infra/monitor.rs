//! Resource sampling of running builds
//!
//! Memory is summed over the build's whole process tree, read from `/proc` on
//! Linux. Other platforms report no memory. Disk usage is the growth of a
//! watched directory since the build started. Sampling never fails: anything
//! unreadable is left out of the sample.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::infra::filesystem::dir_size;

/// `root` and every process descending from it
///
/// Only `root` itself where the process table cannot be read.
pub fn process_tree(root: u32) -> BTreeSet<u32> {
    proc::tree(root)
}

/// Running maxima over all samples of one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourcePeaks {
    pub rss: u64,
    pub vms: u64,
    pub disk_delta: i64,
}

/// Samples a process tree and a watched directory
#[derive(Debug)]
pub struct ResourceMonitor {
    root_pid: Option<u32>,
    watch_dir: Option<PathBuf>,
    initial_disk: u64,
    peaks: ResourcePeaks,
}

impl ResourceMonitor {
    /// Start monitoring `root_pid` and the growth of `watch_dir`
    pub fn new(root_pid: Option<u32>, watch_dir: Option<PathBuf>) -> Self {
        let initial_disk = watch_dir.as_deref().map_or(0, dir_size);
        Self {
            root_pid,
            watch_dir,
            initial_disk,
            peaks: ResourcePeaks::default(),
        }
    }

    /// Follow the process tree of `pid` from the next sample on
    pub fn track(&mut self, pid: Option<u32>) {
        self.root_pid = pid;
    }

    /// Take one sample and fold it into the peaks
    pub fn sample(&mut self) {
        if let Some(pid) = self.root_pid {
            let (rss, vms) = proc::tree_memory(pid);
            self.peaks.rss = self.peaks.rss.max(rss);
            self.peaks.vms = self.peaks.vms.max(vms);
        }

        if let Some(dir) = &self.watch_dir {
            let now = dir_size(dir);
            let grown = i64::try_from(now).unwrap_or(i64::MAX)
                - i64::try_from(self.initial_disk).unwrap_or(i64::MAX);
            self.peaks.disk_delta = self.peaks.disk_delta.max(grown);
        }
    }

    pub fn peaks(&self) -> ResourcePeaks {
        self.peaks
    }
}

#[cfg(target_os = "linux")]
mod proc {
    use std::collections::{BTreeMap, BTreeSet};
    use std::fs;

    /// Summed (rss, vms) in bytes of `root` and all its descendants
    pub fn tree_memory(root: u32) -> (u64, u64) {
        tree(root)
            .into_iter()
            .filter_map(memory)
            .fold((0, 0), |(rss, vms), (r, v)| (rss + r, vms + v))
    }

    pub fn tree(root: u32) -> BTreeSet<u32> {
        let mut children: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        if let Ok(entries) = fs::read_dir("/proc") {
            for entry in entries.filter_map(Result::ok) {
                let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse().ok()) else {
                    continue;
                };
                if let Some(ppid) = parent(pid) {
                    children.entry(ppid).or_default().push(pid);
                }
            }
        }

        let mut found = BTreeSet::from([root]);
        let mut stack = vec![root];
        while let Some(pid) = stack.pop() {
            for &child in children.get(&pid).into_iter().flatten() {
                if found.insert(child) {
                    stack.push(child);
                }
            }
        }
        found
    }

    /// Parent pid from `/proc/<pid>/stat`
    fn parent(pid: u32) -> Option<u32> {
        let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        // the command name may contain spaces and parentheses
        let rest = &stat[stat.rfind(')')? + 1..];
        rest.split_whitespace().nth(1)?.parse().ok()
    }

    fn memory(pid: u32) -> Option<(u64, u64)> {
        let status = fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        Some(parse_status(&status))
    }

    /// (VmRSS, VmSize) in bytes from a `/proc/<pid>/status` body
    pub fn parse_status(status: &str) -> (u64, u64) {
        let field = |key: &str| {
            status
                .lines()
                .find_map(|line| line.strip_prefix(key))
                .and_then(|value| value.split_whitespace().next())
                .and_then(|kb| kb.parse::<u64>().ok())
                .map_or(0, |kb| kb * 1024)
        };
        (field("VmRSS:"), field("VmSize:"))
    }
}

#[cfg(not(target_os = "linux"))]
mod proc {
    use std::collections::BTreeSet;
    use std::sync::Once;

    pub fn tree(root: u32) -> BTreeSet<u32> {
        BTreeSet::from([root])
    }

    pub fn tree_memory(_root: u32) -> (u64, u64) {
        static UNSUPPORTED: Once = Once::new();
        UNSUPPORTED.call_once(|| {
            tracing::debug!("Memory sampling needs /proc; RSS and VMS are reported as 0");
        });
        (0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disk_delta_tracks_growth() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("before"), vec![0u8; 10]).unwrap();

        let mut monitor = ResourceMonitor::new(None, Some(dir.path().to_path_buf()));
        monitor.sample();
        assert_eq!(monitor.peaks().disk_delta, 0);

        std::fs::write(dir.path().join("after"), vec![0u8; 500]).unwrap();
        monitor.sample();
        std::fs::remove_file(dir.path().join("after")).unwrap();
        monitor.sample();
        assert_eq!(monitor.peaks().disk_delta, 500);
    }

    #[test]
    fn test_baseline_is_taken_at_creation() {
        let dir = TempDir::new().unwrap();
        let mut monitor = ResourceMonitor::new(None, Some(dir.path().to_path_buf()));
        std::fs::write(dir.path().join("early"), vec![0u8; 64]).unwrap();
        monitor.track(None);
        monitor.sample();
        assert_eq!(monitor.peaks().disk_delta, 64);
    }

    #[test]
    fn test_nothing_to_watch() {
        let mut monitor = ResourceMonitor::new(None, None);
        monitor.sample();
        assert_eq!(monitor.peaks(), ResourcePeaks::default());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_parse_status() {
        let status = "Name:\tcc1\nVmSize:\t  20480 kB\nVmRSS:\t   1024 kB\n";
        assert_eq!(proc::parse_status(status), (1024 * 1024, 20480 * 1024));
        assert_eq!(proc::parse_status("Name:\tzombie\n"), (0, 0));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_samples_own_process() {
        let mut monitor = ResourceMonitor::new(Some(std::process::id()), None);
        monitor.sample();
        assert!(monitor.peaks().rss > 0);
        assert!(monitor.peaks().vms >= monitor.peaks().rss);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_tree_includes_children() {
        let mut child = std::process::Command::new("sleep").arg("5").spawn().unwrap();
        let tree = process_tree(std::process::id());
        child.kill().unwrap();
        child.wait().unwrap();

        assert!(tree.contains(&std::process::id()));
        assert!(tree.contains(&child.id()));
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_memory_unsupported_reports_zero() {
        let mut monitor = ResourceMonitor::new(Some(std::process::id()), None);
        monitor.sample();
        monitor.sample();
        assert_eq!(monitor.peaks(), ResourcePeaks::default());
        assert_eq!(process_tree(7), BTreeSet::from([7]));
    }
}
