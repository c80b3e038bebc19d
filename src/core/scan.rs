//! Recipe directory scanning
//!
//! Builds a [`DependencyGraph`] from a directory whose subdirectories are
//! recipes. Directories that fail to read as a recipe are skipped.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::graph::DependencyGraph;
use crate::core::recipe::RecipeReader;
use crate::error::ScanError;

/// How the builder sets the initial dirty flag of recipe nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyMode {
    /// Every recipe node is dirty (build everything)
    All,
    /// No node is dirty
    Clean,
    /// A node is dirty iff its recipe directory is in the change set
    ///
    /// Entries are paths relative to the scan root (`pkg`, `group/pkg`) or a
    /// bare directory name. A changed `group` marks every recipe below it.
    Changed(BTreeSet<String>),
}

impl DirtyMode {
    fn is_dirty(&self, relative: &Path) -> bool {
        match self {
            Self::All => true,
            Self::Clean => false,
            Self::Changed(set) => {
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                if parts.last().is_some_and(|name| set.contains(name)) {
                    return true;
                }
                (1..=parts.len()).any(|n| set.contains(&parts[..n].join("/")))
            }
        }
    }
}

/// Builds dependency graphs from recipe directories
#[derive(Debug, Clone)]
pub struct GraphBuilder<R> {
    reader: R,
    nested: bool,
}

impl<R: RecipeReader> GraphBuilder<R> {
    /// Create a builder reading recipes with `reader`
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            nested: false,
        }
    }

    /// Also consider the subdirectories of each immediate subdirectory
    #[must_use]
    pub fn nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    /// Scan `directory` and build the graph
    pub fn build(&self, directory: &Path, mode: &DirtyMode) -> Result<DependencyGraph, ScanError> {
        if !directory.is_dir() {
            return Err(ScanError::NotADirectory {
                path: directory.to_path_buf(),
            });
        }

        let mut graph = DependencyGraph::new();
        let mut read = 0usize;
        for candidate in self.candidates(directory)? {
            let recipe = match self.reader.read(&candidate) {
                Ok(recipe) => recipe,
                Err(e) => {
                    tracing::debug!("Skipping {}: {e}", candidate.display());
                    continue;
                }
            };

            let relative = candidate.strip_prefix(directory).unwrap_or(&candidate);
            let dirty = mode.is_dirty(relative);
            let name = recipe.name.clone();
            if let Some(previous) = graph.add_recipe(recipe, dirty) {
                tracing::warn!(
                    "Package '{name}' is declared by both {} and {}; using the latter",
                    previous.path.display(),
                    candidate.display()
                );
            }
            read += 1;
        }

        tracing::info!(
            "Read {read} recipes from {} ({} packages in graph)",
            directory.display(),
            graph.len()
        );
        Ok(graph)
    }

    fn candidates(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let top = visible_subdirs(root).map_err(|e| ScanError::ReadDir {
            path: root.to_path_buf(),
            error: e.to_string(),
        })?;

        if !self.nested {
            return Ok(top);
        }

        let mut all = Vec::new();
        for dir in top {
            let inner = visible_subdirs(&dir).unwrap_or_else(|e| {
                tracing::debug!("Cannot list {}: {e}", dir.display());
                Vec::new()
            });
            all.push(dir);
            all.extend(inner);
        }
        Ok(all)
    }
}

/// Immediate non-hidden subdirectories, sorted
fn visible_subdirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
