//! Dirty-set propagation
//!
//! A package is dirty when its recipe changed or when something it depends on
//! is dirty. Propagation is bounded by a depth: each round adds the direct
//! dependents of everything dirty so far.

use std::collections::BTreeSet;

use crate::core::graph::DependencyGraph;

/// Expand the dirty flags of `graph` by `depth` hops of dependents
///
/// Returns every dirty package afterwards. Newly reached packages get their
/// `dirty` flag set, so calling again with depth 0 returns the same set.
pub fn dirty_set(graph: &mut DependencyGraph, depth: usize) -> BTreeSet<String> {
    let mut dirty: BTreeSet<String> = graph
        .nodes()
        .filter(|n| n.dirty)
        .map(|n| n.name.clone())
        .collect();
    let mut frontier = dirty.clone();

    for round in 0..depth {
        let reached: BTreeSet<String> = frontier
            .iter()
            .flat_map(|name| graph.predecessors(name))
            .filter(|name| !dirty.contains(*name))
            .map(str::to_string)
            .collect();

        if reached.is_empty() {
            tracing::debug!("Dirty set stable after {round} rounds");
            break;
        }

        for name in &reached {
            if let Some(node) = graph.node_mut(name) {
                node.dirty = true;
            }
        }
        dirty.extend(reached.iter().cloned());
        frontier = reached;
    }

    dirty
}
