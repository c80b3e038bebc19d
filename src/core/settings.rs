//! Settings management
//!
//! Reads `recipeci.toml` style settings. Every field is optional; the
//! effective-value getters fall back to [`crate::config::defaults`].
//!
//! Lookup order: an explicit `--config` file, then `recipeci.toml` in the
//! recipe root, then `config.toml` in the global config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::defaults;
use crate::error::SettingsError;
use crate::infra::dirs::RecipeciDirs;

/// Settings for recipeci
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Recipe scanning
    #[serde(default)]
    pub scan: ScanSettings,

    /// Build execution
    #[serde(default)]
    pub build: BuildSettings,

    /// Batch splitting
    #[serde(default)]
    pub split: SplitSettings,

    /// Batch submission
    #[serde(default)]
    pub submit: SubmitSettings,
}

/// Recipe scanning settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Recipe file name inside each package directory
    pub recipe_file: Option<String>,

    /// Also scan one level of nested directories
    pub nested: Option<bool>,
}

/// Build execution settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Build tool executable
    pub tool: Option<String>,

    /// Arguments placed before the recipe directory
    pub args: Option<Vec<String>>,

    /// Resource sampling interval in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// Cumulative build time budget in seconds
    pub job_timeout_secs: Option<u64>,

    /// Seconds kept in reserve before the budget runs out
    pub timeout_buffer_secs: Option<u64>,

    /// Fail dependents of failed packages without building them
    pub autofail: Option<bool>,

    /// Extension of artifacts in the build cache
    pub artifact_extension: Option<String>,

    /// Directory whose growth is reported as disk usage of each build
    pub watch_dir: Option<PathBuf>,
}

/// Batch splitting settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitSettings {
    /// Target packages per batch
    pub target_size: Option<usize>,

    /// Batch file to write
    pub output: Option<PathBuf>,
}

/// Batch submission settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitSettings {
    /// Submission tool executable
    pub tool: Option<String>,

    /// Account owning the submitted packages
    pub user: Option<String>,

    /// Queue name under `user`
    pub queue: Option<String>,

    /// Labels attached to submitted builds
    pub labels: Option<Vec<String>>,

    /// Default target platforms
    pub platforms: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from a specific path
    ///
    /// A missing file yields the defaults; an unreadable or invalid file is
    /// an error.
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Find and load the settings that apply to `recipe_root`
    pub fn discover(
        explicit: Option<&Path>,
        recipe_root: &Path,
        dirs: &RecipeciDirs,
    ) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    error: "file does not exist".to_string(),
                });
            }
            return Self::load_from_path(path);
        }

        let project = recipe_root.join(defaults::PROJECT_SETTINGS_FILE);
        if project.exists() {
            tracing::debug!("Using settings from {}", project.display());
            return Self::load_from_path(&project);
        }

        Self::load_from_path(&dirs.global_config_path())
    }

    #[must_use]
    pub fn recipe_file(&self) -> &str {
        self.scan
            .recipe_file
            .as_deref()
            .unwrap_or(defaults::DEFAULT_RECIPE_FILE)
    }

    #[must_use]
    pub fn nested(&self) -> bool {
        self.scan.nested.unwrap_or(false)
    }

    #[must_use]
    pub fn build_tool(&self) -> &str {
        self.build
            .tool
            .as_deref()
            .unwrap_or(defaults::DEFAULT_BUILD_TOOL)
    }

    #[must_use]
    pub fn build_args(&self) -> Vec<String> {
        self.build.args.clone().unwrap_or_else(|| {
            defaults::DEFAULT_BUILD_ARGS
                .iter()
                .map(|a| (*a).to_string())
                .collect()
        })
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.build
                .poll_interval_ms
                .unwrap_or(defaults::DEFAULT_POLL_INTERVAL_MS)
                .max(1),
        )
    }

    #[must_use]
    pub fn job_timeout(&self) -> Option<Duration> {
        self.build.job_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn timeout_buffer(&self) -> Duration {
        Duration::from_secs(
            self.build
                .timeout_buffer_secs
                .unwrap_or(defaults::DEFAULT_TIMEOUT_BUFFER_SECS),
        )
    }

    #[must_use]
    pub fn autofail(&self) -> bool {
        self.build.autofail.unwrap_or(true)
    }

    #[must_use]
    pub fn artifact_extension(&self) -> &str {
        self.build
            .artifact_extension
            .as_deref()
            .unwrap_or(defaults::DEFAULT_ARTIFACT_EXTENSION)
    }

    #[must_use]
    pub fn target_size(&self) -> usize {
        self.split
            .target_size
            .unwrap_or(defaults::DEFAULT_TARGET_BATCH_SIZE)
    }

    #[must_use]
    pub fn split_output(&self) -> PathBuf {
        self.split
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_BATCH_FILE))
    }

    #[must_use]
    pub fn submit_tool(&self) -> &str {
        self.submit
            .tool
            .as_deref()
            .unwrap_or(defaults::DEFAULT_SUBMIT_TOOL)
    }

    #[must_use]
    pub fn submit_user(&self) -> &str {
        self.submit
            .user
            .as_deref()
            .unwrap_or(defaults::DEFAULT_SUBMIT_USER)
    }

    #[must_use]
    pub fn submit_queue(&self) -> &str {
        self.submit
            .queue
            .as_deref()
            .unwrap_or(defaults::DEFAULT_SUBMIT_QUEUE)
    }

    #[must_use]
    pub fn submit_labels(&self) -> Vec<String> {
        self.submit.labels.clone().unwrap_or_else(|| {
            defaults::DEFAULT_SUBMIT_LABELS
                .iter()
                .map(|l| (*l).to_string())
                .collect()
        })
    }

    #[must_use]
    pub fn submit_platforms(&self) -> Vec<String> {
        self.submit.platforms.clone().unwrap_or_default()
    }
}
