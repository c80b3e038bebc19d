//! Core business logic module
//!
//! Graph construction, planning, partitioning and execution control.
//! Process spawning and filesystem side effects belong in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`recipe`] - Recipe file parsing
//! - [`graph`] - Package dependency graph
//! - [`scan`] - Graph construction from a recipe directory
//! - [`dirty`] - Dirty-set propagation over dependents
//! - [`planner`] - Build order planning
//! - [`partition`] - Batch partitioning
//! - [`batch_file`] - Batch file I/O
//! - [`changes`] - Change-set parsing
//! - [`executor`] - Sequential build execution
//! - [`summary`] - Execution summary and statistics
//! - [`submit`] - Batch submission planning
//! - [`settings`] - Settings file handling

pub mod batch_file;
pub mod changes;
pub mod dirty;
pub mod executor;
pub mod graph;
pub mod partition;
pub mod planner;
pub mod recipe;
pub mod scan;
pub mod settings;
pub mod submit;
pub mod summary;
