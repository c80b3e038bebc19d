//! Test utilities
//!
//! Graph builders for unit tests and generators for proptest.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::core::graph::DependencyGraph;
use crate::core::recipe::Recipe;

/// Recipe-backed package with the given dependencies
pub fn recipe(name: &str, deps: &[&str]) -> Recipe {
    Recipe {
        name: name.to_string(),
        version: "1.0".to_string(),
        build_number: 0,
        dependencies: deps
            .iter()
            .map(|d| ((*d).to_string(), String::new()))
            .collect(),
        path: PathBuf::from("recipes").join(name),
    }
}

/// Graph where every endpoint of `edges` has a recipe
pub fn graph_from_edges(edges: &[(&str, &str)]) -> DependencyGraph {
    let mut deps: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for &(from, to) in edges {
        deps.entry(from).or_default().push(to);
        deps.entry(to).or_default();
    }

    let mut graph = DependencyGraph::new();
    for (name, targets) in deps {
        graph.add_recipe(recipe(name, &targets), false);
    }
    graph
}

/// Names as an owned set
pub fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

pub mod generators {
    use proptest::prelude::*;

    use super::recipe;
    use crate::core::graph::DependencyGraph;

    /// Random acyclic graph: package `i` may only depend on packages `j < i`
    pub fn dag() -> impl Strategy<Value = DependencyGraph> {
        (1usize..14)
            .prop_flat_map(|n| (Just(n), proptest::collection::vec(any::<bool>(), n * n)))
            .prop_map(|(n, bits)| {
                let names: Vec<String> = (0..n).map(|i| format!("p{i:02}")).collect();
                let mut graph = DependencyGraph::new();
                for i in 0..n {
                    let deps: Vec<&str> = (0..i)
                        .filter(|j| bits[i * n + j])
                        .map(|j| names[j].as_str())
                        .collect();
                    graph.add_recipe(recipe(&names[i], &deps), false);
                }
                graph
            })
    }

    /// Random acyclic graph with a random subset of packages marked dirty
    pub fn dirty_dag() -> impl Strategy<Value = DependencyGraph> {
        (dag(), proptest::collection::vec(any::<bool>(), 14)).prop_map(|(mut graph, flags)| {
            let names: Vec<String> = graph.names().map(str::to_string).collect();
            for (name, flag) in names.iter().zip(flags) {
                if let Some(node) = graph.node_mut(name) {
                    node.dirty = flag;
                }
            }
            graph
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_dag_generator_is_acyclic(graph in dag()) {
            prop_assert!(!graph.is_empty());
            prop_assert!(!graph.has_cycle());
            prop_assert!(graph.nodes().all(|n| n.has_metadata()));
        }
    }
}
