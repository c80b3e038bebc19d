//! Filesystem operations
//!
//! Directory sizing and recipe overlays.

use std::path::Path;

use crate::error::FilesystemError;

/// Suffix of the backup copy written next to every overlaid file
pub const OVERLAY_BACKUP_SUFFIX: &str = "_removed";

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| FilesystemError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        })
}

/// Total size in bytes of the regular files below `path`
///
/// Unreadable entries are skipped; a missing path has size 0.
pub fn dir_size(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Copy overlay files onto the recipe tree
///
/// Every file `overlay/<pkg>/<rel>` is copied to `recipes/<pkg>/<rel>`, plus
/// a backup at `recipes/<pkg>/<rel>_removed`. Packages without a directory in
/// `recipes` are left alone. Returns the number of overlaid files.
pub fn apply_overlay(overlay: &Path, recipes: &Path) -> Result<usize, FilesystemError> {
    let packages = std::fs::read_dir(overlay).map_err(|e| FilesystemError::ReadFile {
        path: overlay.to_path_buf(),
        error: e.to_string(),
    })?;

    let mut copied = 0;
    for package in packages.filter_map(Result::ok) {
        let source_root = package.path();
        if !source_root.is_dir() {
            continue;
        }
        let target_root = recipes.join(package.file_name());
        if !target_root.is_dir() {
            tracing::debug!(
                "No recipe for overlay {}, skipping",
                source_root.display()
            );
            continue;
        }

        for entry in walkdir::WalkDir::new(&source_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry
                .path()
                .strip_prefix(&source_root)
                .unwrap_or(entry.path());
            let target = target_root.join(relative);
            let mut backup = target.clone().into_os_string();
            backup.push(OVERLAY_BACKUP_SUFFIX);

            tracing::info!("Copy {} to {}", entry.path().display(), target.display());
            copy_file(entry.path(), Path::new(&backup))?;
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
