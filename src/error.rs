//! Error types for recipeci
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Recipe reading errors
///
/// Always recovered by the graph builder: the offending directory is skipped.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// No recipe file in the directory
    #[error("No recipe found at '{path}'")]
    NotFound { path: PathBuf },

    /// Recipe file could not be read
    #[error("Failed to read recipe '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Recipe file is not valid
    #[error("Malformed recipe '{path}': {error}")]
    Malformed { path: PathBuf, error: String },
}

/// Settings file errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read settings file
    #[error("Failed to read settings file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse settings file
    #[error("Failed to parse settings file '{path}': {error}")]
    Parse { path: PathBuf, error: String },
}

/// Recipe directory scanning errors
#[derive(Error, Debug)]
pub enum ScanError {
    /// Scan root is missing or not a directory
    #[error("Recipe directory not found: {path}")]
    NotADirectory { path: PathBuf },

    /// Directory listing failed
    #[error("Failed to list '{path}': {error}")]
    ReadDir { path: PathBuf, error: String },
}

/// Graph structure errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// No topological order exists
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    Cyclic { cycle: Vec<String> },
}

/// Build order planning errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Requested package has no node in the graph
    #[error("Package '{name}' not found in recipe directory")]
    UnknownPackage { name: String },

    /// Graph could not be ordered
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Batch partitioning errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// Target batch size must be positive
    #[error("Target batch size must be at least 1")]
    InvalidTargetSize,

    /// Graph could not be ordered
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Batch file errors
#[derive(Error, Debug)]
pub enum BatchFileError {
    /// Failed to read the batch file
    #[error("Failed to read batch file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to write the batch file
    #[error("Failed to write batch file '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// Batch file is not a JSON object of string lists
    #[error("Failed to parse batch file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Requested key is not a batch in the file
    #[error("Batch '{key}' not found in '{path}'")]
    MissingKey { key: String, path: PathBuf },
}

/// Build command runner errors
///
/// A non-zero exit status is not an error; it is reported through
/// [`crate::core::executor::BuildResult::return_code`].
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Build tool not found on PATH
    #[error("Build tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    /// Build process could not be started or awaited
    #[error("Failed to run build for '{package}': {error}")]
    Spawn { package: String, error: String },

    /// Build was cancelled by the user
    #[error("Build of '{package}' interrupted")]
    Interrupted { package: String },
}

/// Batch submission errors
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Submission tool not found on PATH
    #[error("Submission tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    /// Descriptor could not be rendered
    #[error("Failed to render submission descriptor for '{key}': {error}")]
    Render { key: String, error: String },

    /// Descriptor could not be written
    #[error(transparent)]
    Descriptor(#[from] FilesystemError),

    /// Tool could not be started
    #[error("Failed to run '{command}': {error}")]
    Spawn { command: String, error: String },

    /// Creating the remote package failed
    #[error("Could not create package '{package}' (exit code {code})")]
    CreatePackage { package: String, code: i32 },

    /// Queue submission failed
    #[error("Submission of batch '{key}' failed (exit code {code})")]
    Rejected { key: String, code: i32 },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// Top-level recipeci error type
#[derive(Error, Debug)]
pub enum RecipeciError {
    /// Scan error
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Settings error
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Plan error
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Partition error
    #[error("Partition error: {0}")]
    Partition(#[from] PartitionError),

    /// Batch file error
    #[error("Batch file error: {0}")]
    BatchFile(#[from] BatchFileError),

    /// Runner error
    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    /// Submit error
    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),
}
