//! Platform-specific directory management
//!
//! Provides the config and artifact cache locations used by recipeci.
//! Follows XDG Base Directory Specification on Linux and standard locations on macOS.
//!
//! Environment variables can override default directories:
//! - `RECIPECI_CONFIG_DIR` - Override config directory
//! - `RECIPECI_BUILD_CACHE` - Override the artifact cache consulted by `--skip-built`

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "RECIPECI_CONFIG_DIR";
pub const ENV_BUILD_CACHE: &str = "RECIPECI_BUILD_CACHE";

/// Application name used in directory paths
const APP_NAME: &str = "recipeci";

const ARTIFACTS_SUBDIR: &str = "artifacts";

/// Platform-specific directory provider for recipeci
#[derive(Debug, Clone)]
pub struct RecipeciDirs {
    config_dir: PathBuf,
    build_cache_dir: PathBuf,
}

impl RecipeciDirs {
    /// Resolve directories from the environment, then platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
            build_cache_dir: Self::resolve_build_cache_dir(),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/recipeci` or `~/.config/recipeci`
    /// - macOS: `~/Library/Application Support/recipeci`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Directory holding previously built artifacts
    ///
    /// Artifacts are looked up as `<name>-<version>-<build>.<extension>`.
    #[must_use]
    pub fn build_cache_dir(&self) -> PathBuf {
        self.build_cache_dir.clone()
    }

    /// Get the global config file path
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }

    fn resolve_build_cache_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_BUILD_CACHE) {
            return PathBuf::from(path);
        }

        dirs::cache_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| PathBuf::from(".").join(".cache").join(APP_NAME))
            .join(ARTIFACTS_SUBDIR)
    }
}

impl Default for RecipeciDirs {
    fn default() -> Self {
        Self::new()
    }
}
