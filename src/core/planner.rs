//! Build order planning
//!
//! Selects the part of the graph a build needs and orders it so that every
//! package comes after its dependencies.

use std::collections::BTreeSet;

use crate::core::graph::DependencyGraph;
use crate::error::PlanError;

/// Which packages a build is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The whole graph
    All,
    /// The named packages, optionally widened by dependency levels
    Packages(Vec<String>),
}

impl Selection {
    /// Select the given names
    pub fn packages<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Packages(names.into_iter().map(Into::into).collect())
    }
}

/// Selected sub-graph and its build order
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Induced sub-graph over the selected packages
    pub subgraph: DependencyGraph,
    /// Dependencies first; lexical order among independent packages
    pub order: Vec<String>,
}

impl BuildPlan {
    /// Packages in order that have a recipe and can be handed to the build tool
    pub fn buildable(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| {
                self.subgraph
                    .node(name)
                    .is_some_and(crate::core::graph::PackageNode::has_metadata)
            })
            .cloned()
            .collect()
    }
}

/// Plan a build of `selection`
///
/// For [`Selection::Packages`], `level` rounds each add the direct
/// dependencies of the packages added in the previous round. The sub-graph
/// is induced over the final set, so edges between two added dependencies are
/// respected too.
pub fn plan(
    graph: &DependencyGraph,
    selection: &Selection,
    level: usize,
) -> Result<BuildPlan, PlanError> {
    let subgraph = match selection {
        Selection::All => graph.clone(),
        Selection::Packages(requested) => {
            let selected = expand(graph, requested, level)?;
            graph.subgraph(&selected)
        }
    };

    let order = subgraph.topological_order()?;
    tracing::debug!("Planned {} packages", order.len());
    Ok(BuildPlan { subgraph, order })
}

fn expand(
    graph: &DependencyGraph,
    requested: &[String],
    level: usize,
) -> Result<BTreeSet<String>, PlanError> {
    if let Some(unknown) = requested.iter().find(|name| !graph.contains(name)) {
        return Err(PlanError::UnknownPackage {
            name: unknown.clone(),
        });
    }

    let mut selected: BTreeSet<String> = requested.iter().cloned().collect();
    let mut frontier = selected.clone();
    for _ in 0..level {
        let next: BTreeSet<String> = frontier
            .iter()
            .flat_map(|name| graph.successors(name))
            .filter(|dep| !selected.contains(*dep))
            .map(str::to_string)
            .collect();
        if next.is_empty() {
            break;
        }
        selected.extend(next.iter().cloned());
        frontier = next;
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recipe::Recipe;
    use crate::error::GraphError;
    use crate::test_utils::generators::dag;
    use crate::test_utils::{graph_from_edges, recipe};
    use proptest::prelude::*;

    #[test]
    fn test_build_everything_chain() {
        let graph = graph_from_edges(&[("A", "B"), ("B", "C")]);
        let plan = plan(&graph, &Selection::All, 0).unwrap();
        assert_eq!(plan.order, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_requested_only_at_level_zero() {
        let graph = graph_from_edges(&[("A", "B"), ("B", "C")]);
        let plan = plan(&graph, &Selection::packages(["A"]), 0).unwrap();
        assert_eq!(plan.order, vec!["A"]);
    }

    #[test]
    fn test_levels_widen_breadth_first() {
        let graph = graph_from_edges(&[("A", "B"), ("B", "C"), ("C", "D")]);
        let one = plan(&graph, &Selection::packages(["A"]), 1).unwrap();
        assert_eq!(one.order, vec!["B", "A"]);
        let two = plan(&graph, &Selection::packages(["A"]), 2).unwrap();
        assert_eq!(two.order, vec!["C", "B", "A"]);
        let many = plan(&graph, &Selection::packages(["A"]), 50).unwrap();
        assert_eq!(many.order, vec!["D", "C", "B", "A"]);
    }

    #[test]
    fn test_edges_between_added_dependencies_are_kept() {
        // A needs B and C; B also needs C. At level 1 C must still precede B.
        let graph = graph_from_edges(&[("A", "B"), ("A", "C"), ("B", "C")]);
        let plan = plan(&graph, &Selection::packages(["A"]), 1).unwrap();
        assert_eq!(plan.order, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_unknown_package() {
        let graph = graph_from_edges(&[("A", "B")]);
        let err = plan(&graph, &Selection::packages(["nope"]), 0).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownPackage {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_cycle_is_reported() {
        let graph = graph_from_edges(&[("A", "B"), ("B", "A"), ("C", "A")]);
        let err = plan(&graph, &Selection::All, 0).unwrap_err();
        assert!(matches!(err, PlanError::Graph(GraphError::Cyclic { .. })));

        // a selection avoiding the cycle still plans
        let ok = plan(&graph, &Selection::packages(["C"]), 0).unwrap();
        assert_eq!(ok.order, vec!["C"]);
    }

    #[test]
    fn test_buildable_skips_placeholders() {
        let mut graph = DependencyGraph::new();
        let app: Recipe = recipe("app", &["lib", "system-compiler"]);
        graph.add_recipe(app, false);
        graph.add_recipe(recipe("lib", &[]), false);

        let plan = plan(&graph, &Selection::All, 0).unwrap();
        assert_eq!(plan.order, vec!["lib", "system-compiler", "app"]);
        assert_eq!(plan.buildable(), vec!["lib", "app"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_order_respects_every_edge(graph in dag()) {
            let plan = plan(&graph, &Selection::All, 0).unwrap();
            prop_assert_eq!(plan.order.len(), graph.len());
            let position = |name: &str| plan.order.iter().position(|n| n == name).unwrap();
            for (dependent, dependency) in plan.subgraph.edges() {
                prop_assert!(position(dependency) < position(dependent));
            }
        }

        #[test]
        fn test_order_is_deterministic(graph in dag()) {
            let first = plan(&graph, &Selection::All, 0).unwrap().order;
            let second = plan(&graph.clone(), &Selection::All, 0).unwrap().order;
            prop_assert_eq!(first, second);
        }
    }
}
