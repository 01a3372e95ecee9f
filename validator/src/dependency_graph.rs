//! Dependency graph for component start-up ordering
//!
//! Components that declare `depends_on` names are linked to the components
//! those names resolve to. The graph is then ordered (dependencies first) and
//! searched for circuits, which make a start-up order impossible.

use crate::model::DeploymentUnit;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Separator between a module id and a component name in a qualified link
pub const MODULE_SEPARATOR: char = '#';

/// A component addressed by its module and its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentRef {
    pub module_id: String,
    pub name: String,
}

impl ComponentRef {
    pub fn new(module_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    /// The same component name was registered twice for one module
    #[error("component `{name}` is already linked in module `{module_id}`")]
    DuplicateLink { module_id: String, name: String },
}

/// Name -> component index built fresh for each resolution
#[derive(Debug, Default)]
pub struct LinkTable {
    module_links: IndexMap<(String, String), ComponentRef>,
    global_links: IndexMap<String, ComponentRef>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component in its module scope and in the global scope.
    ///
    /// The global scope keeps the first component registered under a name.
    pub fn add(&mut self, module_id: &str, name: &str) -> Result<ComponentRef, ResolverError> {
        let key = (module_id.to_string(), name.to_string());
        if self.module_links.contains_key(&key) {
            return Err(ResolverError::DuplicateLink {
                module_id: module_id.to_string(),
                name: name.to_string(),
            });
        }

        let component = ComponentRef::new(module_id, name);
        self.module_links.insert(key, component.clone());
        self.global_links
            .entry(name.to_string())
            .or_insert_with(|| component.clone());
        Ok(component)
    }

    /// Resolve `link` as seen from `module_id`.
    ///
    /// `module-id#Name` looks only in the named module. A plain name is
    /// looked up in the module first, then globally.
    pub fn resolve(&self, module_id: &str, link: &str) -> Option<&ComponentRef> {
        if let Some((module, name)) = link.split_once(MODULE_SEPARATOR) {
            return self
                .module_links
                .get(&(module.to_string(), name.to_string()));
        }

        self.module_links
            .get(&(module_id.to_string(), link.to_string()))
            .or_else(|| self.global_links.get(link))
    }

    pub fn len(&self) -> usize {
        self.module_links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.module_links.is_empty()
    }
}

/// Directed graph where an edge `a -> b` means `a` depends on `b`
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: IndexSet<ComponentRef>,
    edges: IndexMap<ComponentRef, IndexSet<ComponentRef>>,
    reverse_edges: IndexMap<ComponentRef, IndexSet<ComponentRef>>,
}

/// Result of dependency analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyAnalysis {
    /// Every node, dependencies first. Nodes caught in a circuit come last,
    /// in registration order.
    pub order: Vec<ComponentRef>,

    /// Distinct circuits in discovery order
    pub circuits: Vec<CircularDependency>,
}

/// A circuit of components, closed: `[A, B, A]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularDependency {
    pub cycle: Vec<ComponentRef>,
}

impl CircularDependency {
    /// The component the circuit was entered through
    pub fn first(&self) -> &ComponentRef {
        &self.cycle[0]
    }

    /// `A -> B -> A`
    pub fn chain(&self) -> String {
        self.cycle
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Members without the closing repetition, rotated so the smallest
    /// member comes first
    fn canonical(&self) -> Vec<ComponentRef> {
        let members = &self.cycle[..self.cycle.len() - 1];
        let start = members
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(i, _)| i)
            .unwrap_or(0);
        members[start..]
            .iter()
            .chain(&members[..start])
            .cloned()
            .collect()
    }
}

impl fmt::Display for CircularDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected: {}", self.chain())
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: ComponentRef) {
        self.nodes.insert(node);
    }

    /// `from` depends on `to`. Both ends are registered as nodes.
    pub fn add_edge(&mut self, from: &ComponentRef, to: &ComponentRef) {
        self.add_node(from.clone());
        self.add_node(to.clone());

        self.edges
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
        self.reverse_edges
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn direct_dependencies(&self, node: &ComponentRef) -> Vec<&ComponentRef> {
        self.edges
            .get(node)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    /// Detect circuits and compute a start-up order
    pub fn analyze(&self) -> DependencyAnalysis {
        DependencyAnalysis {
            order: self.topological_sort(),
            circuits: self.find_circuits(),
        }
    }

    /// Every elementary circuit, each reported once.
    ///
    /// A search is started from every node in registration order and only
    /// walks nodes registered after the start, so each circuit is found from
    /// its earliest registered member. The walk keeps an explicit stack.
    fn find_circuits(&self) -> Vec<CircularDependency> {
        let successors: Vec<Vec<usize>> = self
            .nodes
            .iter()
            .map(|node| {
                self.edges
                    .get(node)
                    .map(|targets| {
                        targets
                            .iter()
                            .filter_map(|t| self.nodes.get_index_of(t))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();

        let mut circuits = Vec::new();
        let mut seen_circuits = HashSet::new();
        let mut on_path = vec![false; self.nodes.len()];

        for start in 0..self.nodes.len() {
            // path[i] is a node, next_edge[i] the next successor of it to try
            let mut path = vec![start];
            let mut next_edge = vec![0];
            on_path[start] = true;

            while let Some(&node) = path.last() {
                let depth = path.len() - 1;
                let Some(&next) = successors[node].get(next_edge[depth]) else {
                    on_path[node] = false;
                    path.pop();
                    next_edge.pop();
                    continue;
                };
                next_edge[depth] += 1;

                if next == start {
                    let cycle: Vec<ComponentRef> = path
                        .iter()
                        .chain(std::iter::once(&start))
                        .filter_map(|&i| self.nodes.get_index(i).cloned())
                        .collect();
                    let circuit = CircularDependency { cycle };
                    if seen_circuits.insert(circuit.canonical()) {
                        circuits.push(circuit);
                    }
                } else if next > start && !on_path[next] {
                    on_path[next] = true;
                    path.push(next);
                    next_edge.push(0);
                }
            }
        }

        circuits
    }

    /// Kahn's algorithm over dependency counts, ties broken by registration
    /// order
    fn topological_sort(&self) -> Vec<ComponentRef> {
        let mut remaining: IndexMap<&ComponentRef, usize> = self
            .nodes
            .iter()
            .map(|n| (n, self.edges.get(n).map_or(0, IndexSet::len)))
            .collect();

        let mut queue: VecDeque<&ComponentRef> = remaining
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(node, _)| *node)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut placed = HashSet::new();

        while let Some(node) = queue.pop_front() {
            order.push(node.clone());
            placed.insert(node);

            if let Some(dependents) = self.reverse_edges.get(node) {
                for dependent in dependents {
                    if let Some(count) = remaining.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            for node in &self.nodes {
                if !placed.contains(node) {
                    order.push(node.clone());
                }
            }
        }

        order
    }
}

/// A `depends_on` name that resolved to nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLink {
    pub from: ComponentRef,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub order: Vec<ComponentRef>,
    pub unresolved: Vec<UnresolvedLink>,
    pub circuits: Vec<CircularDependency>,
}

/// Collects, links and orders singleton `depends_on` declarations
pub struct DependsOnResolver;

impl DependsOnResolver {
    pub fn resolve(unit: &DeploymentUnit) -> Result<Resolution, ResolverError> {
        let mut links = LinkTable::new();
        for module in &unit.modules {
            for component in &module.components {
                links.add(&module.id, &component.name)?;
            }
        }
        log::debug!("collected {} component links for {}", links.len(), unit.id);

        let mut graph = DependencyGraph::new();
        let mut unresolved = Vec::new();

        for module in &unit.modules {
            for component in module.components.iter().filter(|c| c.kind.is_singleton()) {
                let from = ComponentRef::new(&module.id, &component.name);
                graph.add_node(from.clone());

                for name in &component.depends_on {
                    match links.resolve(&module.id, name) {
                        Some(to) => graph.add_edge(&from, to),
                        None => unresolved.push(UnresolvedLink {
                            from: from.clone(),
                            name: name.clone(),
                        }),
                    }
                }
            }
        }

        let analysis = graph.analyze();
        log::debug!(
            "depends-on graph for {}: {} nodes, {} unresolved, {} circuits",
            unit.id,
            graph.len(),
            unresolved.len(),
            analysis.circuits.len()
        );

        Ok(Resolution {
            order: analysis.order,
            unresolved,
            circuits: analysis.circuits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Module, ModuleClassLoader, ModuleKind};

    fn node(name: &str) -> ComponentRef {
        ComponentRef::new("m", name)
    }

    fn module(id: &str, components: Vec<Component>) -> Module {
        components.into_iter().fold(
            Module::new(id, ModuleKind::Ejb, ModuleClassLoader::default()),
            Module::with_component,
        )
    }

    fn names(order: &[ComponentRef]) -> Vec<&str> {
        order.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_simple_dependency_order() {
        // A depends on B, B depends on C
        let mut graph = DependencyGraph::new();
        graph.add_edge(&node("A"), &node("B"));
        graph.add_edge(&node("B"), &node("C"));

        let analysis = graph.analyze();

        assert!(analysis.circuits.is_empty());
        assert_eq!(names(&analysis.order), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_independent_nodes_keep_registration_order() {
        let mut graph = DependencyGraph::new();
        for name in ["Z", "A", "M"] {
            graph.add_node(node(name));
        }

        let analysis = graph.analyze();

        assert!(analysis.circuits.is_empty());
        assert_eq!(names(&analysis.order), vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(&node("A"), &node("B"));
        graph.add_edge(&node("B"), &node("C"));
        graph.add_edge(&node("C"), &node("A"));

        let analysis = graph.analyze();

        assert_eq!(analysis.circuits.len(), 1);
        assert_eq!(analysis.circuits[0].chain(), "A -> B -> C -> A");
        assert_eq!(analysis.circuits[0].first().name, "A");
        assert_eq!(analysis.order.len(), 3);
    }

    #[test]
    fn test_distinct_circuits_reported_once_each() {
        // Two circuits sharing A: A <-> B and A <-> C
        let mut graph = DependencyGraph::new();
        graph.add_edge(&node("A"), &node("B"));
        graph.add_edge(&node("B"), &node("A"));
        graph.add_edge(&node("A"), &node("C"));
        graph.add_edge(&node("C"), &node("A"));

        let analysis = graph.analyze();

        let chains: Vec<_> = analysis.circuits.iter().map(|c| c.chain()).collect();
        assert_eq!(chains, vec!["A -> B -> A", "A -> C -> A"]);
    }

    #[test]
    fn test_circuits_through_a_finished_node() {
        // A -> B -> C -> A, plus the shortcut A -> C closing A -> C -> A
        let mut graph = DependencyGraph::new();
        graph.add_edge(&node("A"), &node("B"));
        graph.add_edge(&node("B"), &node("C"));
        graph.add_edge(&node("C"), &node("A"));
        graph.add_edge(&node("A"), &node("C"));

        let analysis = graph.analyze();

        let chains: Vec<_> = analysis.circuits.iter().map(|c| c.chain()).collect();
        assert_eq!(chains, vec!["A -> B -> C -> A", "A -> C -> A"]);
    }

    #[test]
    fn test_long_chain_without_circuit() {
        let mut graph = DependencyGraph::new();
        for i in 1..20_000 {
            graph.add_edge(&node(&format!("N{}", i)), &node(&format!("N{}", i - 1)));
        }

        let analysis = graph.analyze();

        assert!(analysis.circuits.is_empty());
        assert_eq!(analysis.order.len(), 20_000);
        assert_eq!(analysis.order[0].name, "N0");
    }

    #[test]
    fn test_self_dependency_is_a_circuit() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(&node("A"), &node("A"));

        let analysis = graph.analyze();

        assert_eq!(analysis.circuits.len(), 1);
        assert_eq!(analysis.circuits[0].chain(), "A -> A");
    }

    #[test]
    fn test_link_table_prefers_module_scope() {
        let mut links = LinkTable::new();
        links.add("a.jar", "Shared").unwrap();
        links.add("b.jar", "Shared").unwrap();
        links.add("b.jar", "OnlyB").unwrap();

        assert_eq!(links.resolve("b.jar", "Shared").unwrap().module_id, "b.jar");
        assert_eq!(links.resolve("c.jar", "Shared").unwrap().module_id, "a.jar");
        assert_eq!(links.resolve("a.jar", "OnlyB").unwrap().module_id, "b.jar");
        assert_eq!(links.resolve("a.jar", "b.jar#Shared").unwrap().module_id, "b.jar");
        assert!(links.resolve("a.jar", "a.jar#OnlyB").is_none());
        assert!(links.resolve("a.jar", "Nope").is_none());
    }

    #[test]
    fn test_duplicate_link_is_an_error() {
        let mut links = LinkTable::new();
        links.add("a.jar", "Foo").unwrap();

        assert_eq!(
            links.add("a.jar", "Foo"),
            Err(ResolverError::DuplicateLink {
                module_id: "a.jar".to_string(),
                name: "Foo".to_string()
            })
        );
    }

    #[test]
    fn test_resolver_reports_each_unresolved_edge() {
        let unit = DeploymentUnit::new("app").with_module(module(
            "a.jar",
            vec![Component::singleton("Foo", "com.acme.Foo")
                .depends_on("Bar")
                .depends_on("Baz")
                .depends_on("Qux")],
        ));

        let resolution = DependsOnResolver::resolve(&unit).unwrap();

        let missing: Vec<_> = resolution.unresolved.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(missing, vec!["Bar", "Baz", "Qux"]);
        assert!(resolution.unresolved.iter().all(|u| u.from.name == "Foo"));
        assert!(resolution.circuits.is_empty());
    }

    #[test]
    fn test_resolver_links_across_modules() {
        let unit = DeploymentUnit::new("app")
            .with_module(module(
                "a.jar",
                vec![Component::singleton("Foo", "com.acme.Foo").depends_on("Bar")],
            ))
            .with_module(module("b.jar", vec![Component::singleton("Bar", "com.acme.Bar")]));

        let resolution = DependsOnResolver::resolve(&unit).unwrap();

        assert!(resolution.unresolved.is_empty());
        assert_eq!(names(&resolution.order), vec!["Bar", "Foo"]);
    }

    #[test]
    fn test_resolver_ignores_non_singleton_declarations() {
        let unit = DeploymentUnit::new("app").with_module(module(
            "a.jar",
            vec![Component::stateless("Foo", "com.acme.Foo").depends_on("Bar")],
        ));

        let resolution = DependsOnResolver::resolve(&unit).unwrap();

        assert!(resolution.unresolved.is_empty());
        assert!(resolution.order.is_empty());
    }

    #[test]
    fn test_resolver_rejects_duplicate_names_in_module() {
        let unit = DeploymentUnit::new("app").with_module(module(
            "a.jar",
            vec![
                Component::singleton("Foo", "com.acme.Foo"),
                Component::singleton("Foo", "com.acme.Foo2"),
            ],
        ));

        assert!(matches!(
            DependsOnResolver::resolve(&unit),
            Err(ResolverError::DuplicateLink { .. })
        ));
    }
}
