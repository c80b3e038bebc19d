//! recipeci - dependency-aware build scheduler for package recipes
//!
//! Reads a directory of package recipes into a dependency graph, plans a
//! dependencies-first build order, splits large graphs into self-contained
//! batches and builds packages one at a time while cascading failures and
//! tracking a time budget.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Graph, planning, partitioning and execution logic
//! - [`infra`] - Infrastructure layer (processes, filesystem, directories)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
