//! Dependency graph
//!
//! Adjacency-list graph over packages. An edge `a -> b` means `a` declares `b`
//! as a build dependency. Nodes and neighbours are kept in lexical order so
//! every traversal is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::core::recipe::Recipe;
use crate::error::GraphError;

type Adjacency = BTreeMap<String, BTreeSet<String>>;

static NO_NEIGHBOURS: BTreeSet<String> = BTreeSet::new();

/// A package in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    /// Package name (unique within a graph)
    pub name: String,

    /// Recipe metadata; `None` for placeholder dependencies with no local recipe
    pub recipe: Option<Recipe>,

    /// Needs rebuilding
    pub dirty: bool,
}

impl PackageNode {
    /// Create a placeholder node with no recipe
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recipe: None,
            dirty: false,
        }
    }

    /// Whether a recipe was read for this node
    pub fn has_metadata(&self) -> bool {
        self.recipe.is_some()
    }

    /// Declared build dependencies (empty for placeholders)
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.recipe
            .iter()
            .flat_map(|r| r.dependencies.keys().map(String::as_str))
    }

    /// Whether this package declares `name` as a build dependency
    pub fn declares(&self, name: &str) -> bool {
        self.recipe
            .as_ref()
            .is_some_and(|r| r.dependencies.contains_key(name))
    }

    /// Recipe directory, if any
    pub fn recipe_path(&self) -> Option<&Path> {
        self.recipe.as_ref().map(|r| r.path.as_path())
    }
}

/// Dependency graph for packages
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, PackageNode>,
    /// package -> its dependencies
    successors: Adjacency,
    /// package -> its dependents
    predecessors: Adjacency,
}

/// Which end of the edges comes first in a topological order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    DependenciesFirst,
    DependentsFirst,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a recipe-backed package and an edge to each declared dependency
    ///
    /// Dependencies without a node get a placeholder. If a recipe already
    /// existed under this name its edges are replaced and it is returned.
    pub fn add_recipe(&mut self, recipe: Recipe, dirty: bool) -> Option<Recipe> {
        let name = recipe.name.clone();
        let deps: Vec<String> = recipe.dependencies.keys().cloned().collect();

        let previous = self.nodes.get_mut(&name).and_then(|n| n.recipe.take());
        if previous.is_some() {
            self.clear_edges_from(&name);
        }

        self.ensure_node(&name);
        if let Some(node) = self.nodes.get_mut(&name) {
            node.recipe = Some(recipe);
            node.dirty = dirty;
        }

        for dep in deps {
            self.add_edge(&name, &dep);
        }
        previous
    }

    /// Add a placeholder node if `name` is unknown
    pub fn ensure_node(&mut self, name: &str) {
        if !self.nodes.contains_key(name) {
            self.nodes
                .insert(name.to_string(), PackageNode::placeholder(name));
            self.successors.insert(name.to_string(), BTreeSet::new());
            self.predecessors.insert(name.to_string(), BTreeSet::new());
        }
    }

    /// Add an edge `from -> to` ("from depends on to")
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.ensure_node(from);
        self.ensure_node(to);
        if let Some(set) = self.successors.get_mut(from) {
            set.insert(to.to_string());
        }
        if let Some(set) = self.predecessors.get_mut(to) {
            set.insert(from.to_string());
        }
    }

    fn clear_edges_from(&mut self, name: &str) {
        let targets = self.successors.get_mut(name).map(std::mem::take);
        for target in targets.into_iter().flatten() {
            if let Some(set) = self.predecessors.get_mut(&target) {
                set.remove(name);
            }
        }
    }

    /// Look up a node
    pub fn node(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// Look up a node for mutation
    pub fn node_mut(&mut self, name: &str) -> Option<&mut PackageNode> {
        self.nodes.get_mut(name)
    }

    /// Whether the graph has a node called `name`
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names in lexical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Nodes in lexical order
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    /// All edges as `(dependent, dependency)` pairs
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.successors
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.as_str(), to.as_str())))
    }

    /// Direct dependencies of `name`
    pub fn successors(&self, name: &str) -> impl Iterator<Item = &str> {
        self.successors
            .get(name)
            .unwrap_or(&NO_NEIGHBOURS)
            .iter()
            .map(String::as_str)
    }

    /// Direct dependents of `name`
    pub fn predecessors(&self, name: &str) -> impl Iterator<Item = &str> {
        self.predecessors
            .get(name)
            .unwrap_or(&NO_NEIGHBOURS)
            .iter()
            .map(String::as_str)
    }

    /// Induced sub-graph over `names`
    ///
    /// Node data is copied; names not in the graph are ignored.
    pub fn subgraph(&self, names: &BTreeSet<String>) -> Self {
        let mut sub = Self::new();
        for name in names {
            if let Some(node) = self.nodes.get(name) {
                sub.nodes.insert(name.clone(), node.clone());
                sub.successors.insert(name.clone(), BTreeSet::new());
                sub.predecessors.insert(name.clone(), BTreeSet::new());
            }
        }
        for (from, to) in self.edges() {
            if sub.contains(from) && sub.contains(to) {
                sub.add_edge(from, to);
            }
        }
        sub
    }

    /// Build order: every package after all of its dependencies
    ///
    /// Among packages that are ready at the same time the lexically smallest
    /// name comes first.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        self.kahn(Direction::DependenciesFirst)
    }

    /// Every package before all of its dependencies, lexical tie-break
    pub fn dependents_first_order(&self) -> Result<Vec<String>, GraphError> {
        self.kahn(Direction::DependentsFirst)
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        self.topological_order().is_err()
    }

    fn kahn(&self, direction: Direction) -> Result<Vec<String>, GraphError> {
        let (blockers, unblocks) = match direction {
            Direction::DependenciesFirst => (&self.successors, &self.predecessors),
            Direction::DependentsFirst => (&self.predecessors, &self.successors),
        };

        let mut pending: BTreeMap<&str, usize> = blockers
            .iter()
            .map(|(name, set)| (name.as_str(), set.len()))
            .collect();
        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            for next in unblocks.get(name).unwrap_or(&NO_NEIGHBOURS) {
                if let Some(count) = pending.get_mut(next.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(next.as_str());
                    }
                }
            }
        }

        if order.len() == self.nodes.len() {
            return Ok(order);
        }

        let mut cycle = find_cycle(&pending, blockers);
        if direction == Direction::DependentsFirst {
            cycle.reverse();
        }
        Err(GraphError::Cyclic { cycle })
    }

    /// Transitive dependencies of `root`, excluding `root`
    ///
    /// Iterative depth-first walk over lexically sorted dependencies; each
    /// package is listed once, at its first visit.
    pub fn dependency_closure(&self, root: &str) -> Result<Vec<String>, GraphError> {
        let mut closure = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut on_stack: BTreeSet<&str> = BTreeSet::new();
        let mut stack = vec![(root, self.successor_set(root).iter())];
        visited.insert(root);
        on_stack.insert(root);

        loop {
            let Some((node, children)) = stack.last_mut() else {
                break;
            };
            let node: &str = *node;
            let Some(child) = children.next() else {
                on_stack.remove(node);
                stack.pop();
                continue;
            };
            let child = child.as_str();

            if on_stack.contains(child) {
                let start = stack.iter().position(|(n, _)| *n == child).unwrap_or(0);
                let mut cycle: Vec<String> =
                    stack[start..].iter().map(|(n, _)| (*n).to_string()).collect();
                cycle.push(child.to_string());
                return Err(GraphError::Cyclic { cycle });
            }

            if visited.insert(child) {
                closure.push(child.to_string());
                on_stack.insert(child);
                stack.push((child, self.successor_set(child).iter()));
            }
        }

        Ok(closure)
    }

    fn successor_set(&self, name: &str) -> &BTreeSet<String> {
        self.successors.get(name).unwrap_or(&NO_NEIGHBOURS)
    }
}

/// Follow unresolved blockers from the first stuck node until one repeats
///
/// Every stuck node has at least one stuck blocker, so the walk must close a
/// loop.
fn find_cycle(pending: &BTreeMap<&str, usize>, blockers: &Adjacency) -> Vec<String> {
    let stuck = |name: &str| pending.get(name).is_some_and(|c| *c > 0);

    let Some(start) = pending.iter().find(|(_, c)| **c > 0).map(|(n, _)| *n) else {
        return Vec::new();
    };

    let mut path: Vec<&str> = vec![start];
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    let mut current = start;
    loop {
        seen.insert(current, path.len() - 1);
        let next = blockers
            .get(current)
            .and_then(|set| set.iter().map(String::as_str).find(|b| stuck(b)));
        let Some(next) = next else {
            return path.iter().map(|s| (*s).to_string()).collect();
        };
        if let Some(&idx) = seen.get(next) {
            let mut cycle: Vec<String> = path[idx..].iter().map(|s| (*s).to_string()).collect();
            cycle.push(next.to_string());
            return cycle;
        }
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{graph_from_edges, recipe};

    #[test]
    fn test_simple_dependency_order() {
        let graph = graph_from_edges(&[("app", "lib")]);

        let order = graph.topological_order().unwrap();
        let lib_pos = order.iter().position(|x| x == "lib").unwrap();
        let app_pos = order.iter().position(|x| x == "app").unwrap();

        assert!(lib_pos < app_pos, "lib should be built before app");
    }

    #[test]
    fn test_chain_build_order() {
        let graph = graph_from_edges(&[("A", "B"), ("B", "C")]);
        assert_eq!(graph.topological_order().unwrap(), vec!["C", "B", "A"]);
        assert_eq!(graph.dependents_first_order().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_lexical_tie_break() {
        let graph = graph_from_edges(&[("z", "b"), ("y", "a"), ("x", "a")]);
        assert_eq!(
            graph.topological_order().unwrap(),
            vec!["a", "b", "x", "y", "z"]
        );
        assert_eq!(
            graph.dependents_first_order().unwrap(),
            vec!["x", "y", "a", "z", "b"]
        );
    }

    #[test]
    fn test_circular_dependency_detection() {
        let graph = graph_from_edges(&[("a", "b"), ("b", "c"), ("c", "a")]);

        assert!(graph.has_cycle());
        let GraphError::Cyclic { cycle } = graph.topological_order().unwrap_err();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
        assert!(graph.dependents_first_order().is_err());
    }

    #[test]
    fn test_cycle_reported_for_downstream_nodes() {
        // app depends on a cycle; the cycle itself is reported, not app
        let graph = graph_from_edges(&[("app", "a"), ("a", "b"), ("b", "a")]);
        let GraphError::Cyclic { cycle } = graph.topological_order().unwrap_err();
        assert!(!cycle.contains(&"app".to_string()));
        assert_eq!(cycle, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let graph = graph_from_edges(&[("a", "a")]);
        let GraphError::Cyclic { cycle } = graph.topological_order().unwrap_err();
        assert_eq!(cycle, vec!["a", "a"]);
    }

    #[test]
    fn test_placeholders_created_for_unknown_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.add_recipe(recipe("app", &["libc"]), true);

        assert_eq!(graph.len(), 2);
        assert!(graph.node("app").unwrap().has_metadata());
        let libc = graph.node("libc").unwrap();
        assert!(!libc.has_metadata());
        assert!(!libc.dirty);
        assert_eq!(graph.predecessors("libc").collect::<Vec<_>>(), vec!["app"]);
    }

    #[test]
    fn test_recipe_replaces_placeholder_and_old_edges() {
        let mut graph = DependencyGraph::new();
        graph.add_recipe(recipe("app", &["lib"]), false);
        assert!(graph.add_recipe(recipe("lib", &[]), false).is_none());
        assert!(graph.node("lib").unwrap().has_metadata());

        let previous = graph.add_recipe(recipe("app", &["other"]), false);
        assert!(previous.is_some());
        assert_eq!(graph.successors("app").collect::<Vec<_>>(), vec!["other"]);
        assert_eq!(graph.predecessors("lib").count(), 0);
    }

    #[test]
    fn test_subgraph_is_induced() {
        let graph = graph_from_edges(&[("a", "b"), ("b", "c"), ("a", "c")]);
        let names: BTreeSet<String> = ["a", "c"].iter().map(|s| (*s).to_string()).collect();
        let sub = graph.subgraph(&names);

        assert_eq!(sub.len(), 2);
        assert_eq!(sub.edges().collect::<Vec<_>>(), vec![("a", "c")]);
        assert!(sub.node("a").unwrap().has_metadata());
    }

    #[test]
    fn test_dependency_closure_preorder() {
        let graph = graph_from_edges(&[("a", "c"), ("a", "b"), ("b", "d"), ("c", "d")]);
        assert_eq!(graph.dependency_closure("a").unwrap(), vec!["b", "d", "c"]);
        assert!(graph.dependency_closure("d").unwrap().is_empty());
        assert!(graph.dependency_closure("missing").unwrap().is_empty());
    }

    #[test]
    fn test_dependency_closure_detects_cycle() {
        let graph = graph_from_edges(&[("root", "a"), ("a", "b"), ("b", "a")]);
        let GraphError::Cyclic { cycle } = graph.dependency_closure("root").unwrap_err();
        assert_eq!(cycle, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_declares_uses_recipe_dependencies() {
        let graph = graph_from_edges(&[("a", "b")]);
        assert!(graph.node("a").unwrap().declares("b"));
        assert!(!graph.node("b").unwrap().declares("a"));
        assert_eq!(graph.node("a").unwrap().dependencies().collect::<Vec<_>>(), vec!["b"]);
    }
}
