//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// A temporary directory holding recipes, settings and an isolated config and
/// build cache directory.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
    home: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            home: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Build cache directory the binary is pointed at
    pub fn build_cache(&self) -> PathBuf {
        self.home.path().join("cache")
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Write `<dir>/recipe.toml` declaring `name` with build dependencies `deps`
    pub fn write_recipe(&self, dir: &str, name: &str, deps: &[&str]) {
        let build = deps
            .iter()
            .map(|d| format!("\"{d}\""))
            .collect::<Vec<_>>()
            .join(", ");
        self.create_file(
            &format!("{dir}/recipe.toml"),
            &format!(
                "[package]\nname = \"{name}\"\nversion = \"1.0\"\n\n[build]\nnumber = 0\n\n[requirements]\nbuild = [{build}]\n"
            ),
        );
    }

    /// Write `recipeci.toml` in the project root
    pub fn write_settings(&self, content: &str) {
        self.create_file("recipeci.toml", content);
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run recipeci in the project directory
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_recipeci"))
            .current_dir(self.dir.path())
            .env("RECIPECI_CONFIG_DIR", self.home.path().join("config"))
            .env("RECIPECI_BUILD_CACHE", self.build_cache())
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .expect("Failed to execute recipeci")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// stdout of a finished command
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// stderr of a finished command
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Project with `app -> lib -> base` and an unrelated `tool`
pub fn chain_project() -> TestProject {
    let project = TestProject::new();
    project.write_recipe("base", "base", &[]);
    project.write_recipe("lib", "lib", &["base", "python"]);
    project.write_recipe("app", "app", &["lib"]);
    project.write_recipe("tool", "tool", &[]);
    project
}

/// Settings running a shell script as the build tool
///
/// The script sees the recipe directory as `$0`, records its name in
/// `built.log` and fails for the packages in `failing`.
pub fn shell_tool_settings(failing: &[&str]) -> String {
    let cases: String = failing
        .iter()
        .map(|name| format!("*/{name}) exit 1;; "))
        .collect();
    format!(
        "[build]\ntool = \"sh\"\nargs = [\"-c\", 'basename \"$0\" >> built.log; case \"$0\" in {cases}esac; exit 0']\npoll_interval_ms = 20\n"
    )
}
