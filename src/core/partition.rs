//! Batch partitioning
//!
//! Splits one large graph into named batches of roughly `target_size`
//! packages so independent CI workers can each build one batch. Every batch is
//! closed under dependencies: a worker never needs another batch's output.
//!
//! 1. Walk packages dependents-first; each package not yet covered becomes the
//!    root of a candidate batch holding its full dependency closure.
//! 2. Members are ordered leaf-most first, which is a valid build order.
//! 3. Small candidates are coalesced, smallest first, until a group reaches
//!    `target_size`; the group is keyed by its last candidate.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::graph::DependencyGraph;
use crate::error::PartitionError;

/// Batch key -> ordered members (the key itself excluded)
pub type BatchMap = BTreeMap<String, Vec<String>>;

/// Partition `graph` into batches of roughly `target_size` packages
///
/// A dependency closure is never split, so a single root whose closure
/// exceeds `target_size` still forms one batch.
pub fn partition(graph: &DependencyGraph, target_size: usize) -> Result<BatchMap, PartitionError> {
    if target_size == 0 {
        return Err(PartitionError::InvalidTargetSize);
    }

    let candidates = candidate_batches(graph)?;
    tracing::debug!("{} candidate batches before coalescing", candidates.len());

    let batches = coalesce(&candidates, target_size);
    tracing::info!(
        "Split {} packages into {} batches (target size {target_size})",
        graph.len(),
        batches.len()
    );
    Ok(batches)
}

/// One batch per uncovered root, members sorted leaf-most first
fn candidate_batches(graph: &DependencyGraph) -> Result<BatchMap, PartitionError> {
    let order = graph.dependents_first_order()?;
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut covered: BTreeSet<&str> = BTreeSet::new();
    let mut candidates = BatchMap::new();
    for root in &order {
        if covered.contains(root.as_str()) {
            continue;
        }

        let mut members = graph.dependency_closure(root)?;
        covered.insert(root.as_str());
        for member in &members {
            if let Some((name, _)) = rank.get_key_value(member.as_str()) {
                covered.insert(*name);
            }
        }

        members.sort_by_key(|m| std::cmp::Reverse(rank.get(m.as_str()).copied().unwrap_or(0)));
        candidates.insert(root.clone(), members);
    }
    Ok(candidates)
}

/// Merge small candidates until each group reaches `target_size` packages
fn coalesce(candidates: &BatchMap, target_size: usize) -> BatchMap {
    let mut by_size: Vec<(&String, &Vec<String>)> = candidates.iter().collect();
    by_size.sort_by(|(ka, va), (kb, vb)| va.len().cmp(&vb.len()).then_with(|| ka.cmp(kb)));

    let mut batches = BatchMap::new();
    let mut group: Vec<Vec<&str>> = Vec::new();
    let mut group_len = 0usize;
    let mut last_key: Option<&str> = None;

    for (key, members) in by_size {
        let mut entry: Vec<&str> = members.iter().map(String::as_str).collect();
        entry.push(key.as_str());
        group_len += entry.len();
        group.push(entry);
        last_key = Some(key.as_str());

        if group_len >= target_size {
            flush(&mut batches, key, &group);
            group.clear();
            group_len = 0;
        }
    }

    if let Some(key) = last_key {
        if !group.is_empty() {
            flush(&mut batches, key, &group);
        }
    }
    batches
}

/// Concatenate a group's members under `key`, de-duplicated, key excluded
fn flush(batches: &mut BatchMap, key: &str, group: &[Vec<&str>]) {
    let members = batches.entry(key.to_string()).or_default();
    let mut seen: BTreeSet<String> = members.iter().cloned().collect();
    for name in group.iter().flatten() {
        if *name != key && seen.insert((*name).to_string()) {
            members.push((*name).to_string());
        }
    }
}
