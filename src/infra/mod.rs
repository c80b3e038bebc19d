//! Infrastructure layer
//!
//! Handles all I/O operations: external processes, resource sampling and
//! the filesystem.

pub mod dirs;
pub mod filesystem;
pub mod monitor;
pub mod runner;
pub mod submitter;
