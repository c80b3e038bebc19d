//! Change-set parsing
//!
//! Turns a list of changed paths (one per line, as printed by
//! `git diff --name-only`) into the set of changed top-level directories.

use std::collections::BTreeSet;
use std::path::{Component, Path};

/// Top-level directory of every path listed in `text`
///
/// Blank lines and `#` comments are ignored; a leading `./` is skipped.
pub fn parse_changed_paths(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(top_level_dir)
        .collect()
}

/// First normal component of `path`
pub fn top_level_dir(path: &str) -> Option<String> {
    Path::new(path).components().find_map(|c| match c {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    })
}
