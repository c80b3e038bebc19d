//! Output formatting and progress indicators
//!
//! Progress bars, status prefixes and the global quiet/JSON/verbosity
//! switches shared by all commands.

use indicatif::{ProgressBar, ProgressStyle};

/// Output switches from the global command-line flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
    /// Machine-readable output on stdout
    pub json: bool,
    /// `-v` count
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Whether human-readable progress and listings should be printed
    pub fn human(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Default log filter for this verbosity; `RUST_LOG` overrides it
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Create a progress bar for build steps
pub fn create_build_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} packages ({msg})")
    {
        pb.set_style(style.progress_chars("█▓▒░"));
    }
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_follows_verbosity() {
        assert_eq!(OutputConfig::new(false, false, 0).log_filter(), "warn");
        assert_eq!(OutputConfig::new(false, false, 1).log_filter(), "info");
        assert_eq!(OutputConfig::new(false, false, 3).log_filter(), "debug");
        assert_eq!(OutputConfig::new(true, false, 2).log_filter(), "error");
    }

    #[test]
    fn test_human_output() {
        assert!(OutputConfig::default().human());
        assert!(!OutputConfig::new(true, false, 0).human());
        assert!(!OutputConfig::new(false, true, 0).human());
    }
}
