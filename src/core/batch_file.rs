//! Batch file I/O
//!
//! A batch file is a JSON object mapping each batch key to the ordered list of
//! packages that must be built before it:
//!
//! ```json
//! { "app": ["zlib", "libfoo"], "tool": ["base"] }
//! ```

use std::path::Path;

use crate::core::partition::BatchMap;
use crate::error::BatchFileError;

/// Write `batches` as pretty JSON
pub fn write_batch_file(path: &Path, batches: &BatchMap) -> Result<(), BatchFileError> {
    let content = serde_json::to_string_pretty(batches).map_err(|e| BatchFileError::Write {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BatchFileError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }

    std::fs::write(path, content + "\n").map_err(|e| BatchFileError::Write {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read a batch file written by [`write_batch_file`]
pub fn read_batch_file(path: &Path) -> Result<BatchMap, BatchFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| BatchFileError::Read {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| BatchFileError::Parse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Packages of one batch in build order: its members, then the key itself
pub fn batch_packages(
    batches: &BatchMap,
    key: &str,
    path: &Path,
) -> Result<Vec<String>, BatchFileError> {
    let members = batches.get(key).ok_or_else(|| BatchFileError::MissingKey {
        key: key.to_string(),
        path: path.to_path_buf(),
    })?;

    let mut packages = members.clone();
    packages.push(key.to_string());
    Ok(packages)
}
