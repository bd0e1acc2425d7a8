//! Dependency graph management using `petgraph`.
//!
//! Builds a directed acyclic graph from declared resources and their
//! explicit and implicit dependencies, and resolves a topological
//! ordering for provisioning.

use std::collections::HashMap;

use mbdeploy_common::error::{Result, StackError};
use mbdeploy_common::types::ResourceRef;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::descriptor::ResourceDescriptor;

/// How one resource came to depend on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Declared through `depends_on`.
    Explicit,
    /// Implied by reading the dependency's resolved attributes.
    Implicit,
}

/// A dependency graph of resources.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: petgraph::Graph<ResourceRef, EdgeKind>,
    nodes: HashMap<ResourceRef, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Builds the graph of a set of descriptors.
    ///
    /// # Errors
    ///
    /// Returns an error if a descriptor is declared twice or depends on
    /// a resource that is not part of the set.
    pub fn from_descriptors(descriptors: &[ResourceDescriptor]) -> Result<Self> {
        let mut graph = Self::new();
        for d in descriptors {
            let reference = d.reference();
            if graph.nodes.contains_key(&reference) {
                return Err(StackError::Graph {
                    message: format!("resource declared twice: {reference}"),
                });
            }
            let _ = graph.add_resource(reference);
        }
        for d in descriptors {
            let dependent = d.reference();
            for dep in &d.depends_on {
                graph.add_dependency(&dependent, dep, EdgeKind::Explicit)?;
            }
            for dep in d.inputs_from.difference(&d.depends_on) {
                graph.add_dependency(&dependent, dep, EdgeKind::Implicit)?;
            }
        }
        Ok(graph)
    }

    /// Adds a resource node, returning the existing node if already present.
    pub fn add_resource(&mut self, reference: ResourceRef) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&reference) {
            return idx;
        }
        let idx = self.graph.add_node(reference.clone());
        let _ = self.nodes.insert(reference, idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    ///
    /// # Errors
    ///
    /// Returns an error if either resource is unknown.
    pub fn add_dependency(
        &mut self,
        dependent: &ResourceRef,
        dependency: &ResourceRef,
        kind: EdgeKind,
    ) -> Result<()> {
        let from = self.index(dependency)?;
        let to = self.index(dependent)?;
        let _ = self.graph.update_edge(from, to, kind);
        Ok(())
    }

    /// Returns a topological ordering of resources for provisioning.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<ResourceRef>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(_cycle) => Err(StackError::Graph {
                message: "cyclic dependency detected in resource graph".into(),
            }),
        }
    }

    /// Returns whether `dependent` depends on `dependency`, directly or transitively.
    #[must_use]
    pub fn depends_on(&self, dependent: &ResourceRef, dependency: &ResourceRef) -> bool {
        match (self.nodes.get(dependency), self.nodes.get(dependent)) {
            (Some(&from), Some(&to)) if from != to => {
                petgraph::algo::has_path_connecting(&self.graph, from, to, None)
            }
            _ => false,
        }
    }

    /// Returns the direct dependencies of a resource and how they were declared.
    #[must_use]
    pub fn direct_dependencies(&self, reference: &ResourceRef) -> Vec<(ResourceRef, EdgeKind)> {
        let Some(&idx) = self.nodes.get(reference) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, petgraph::Direction::Incoming)
            .filter_map(|edge| {
                self.graph
                    .node_weight(edge.source())
                    .map(|r| (r.clone(), *edge.weight()))
            })
            .collect()
    }

    /// Returns the number of resources in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns whether the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn index(&self, reference: &ResourceRef) -> Result<NodeIndex> {
        self.nodes
            .get(reference)
            .copied()
            .ok_or_else(|| StackError::Graph {
                message: format!("unknown resource: {reference}"),
            })
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
