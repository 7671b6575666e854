//! Build configs that feed each other
//!
//! Build config B depends on build config C when C consumes an image B
//! produces. Images are compared by class: the output node itself plus every
//! image it resolves to, and every other view resolving to one of those
//! images. Cycles in the derived build-to-build graph are found with
//! Tarjan's strongly connected components.

use std::collections::{HashMap, HashSet};

use imagegraph_core::{Marker, MarkerKey};
use imagegraph_graph::{EdgeKind, Graph, NodeId, NodeKind};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

/// Build-to-build dependency graph derived from outputs and inputs
#[derive(Debug, Default)]
pub struct BuildDependencies {
    /// Node weights are build config ids of the source graph
    graph: DiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
}

impl BuildDependencies {
    /// Derive producer -> consumer edges between build configs
    pub fn from_graph(source: &Graph) -> Self {
        let mut deps = Self::default();
        let build_configs = source.nodes_of_kind(NodeKind::BuildConfig);

        for &bc in &build_configs {
            let index = deps.graph.add_node(bc);
            deps.index.insert(bc, index);
        }

        for &producer in &build_configs {
            for output in source.successors(producer, EdgeKind::BuildOutput) {
                for image in image_class(source, output) {
                    for consumer in source.predecessors(image, EdgeKind::BuildInput) {
                        deps.add_dependency(producer, consumer);
                    }
                }
            }
        }

        debug!(
            build_configs = deps.graph.node_count(),
            dependencies = deps.graph.edge_count(),
            "derived build dependencies"
        );
        deps
    }

    fn add_dependency(&mut self, producer: NodeId, consumer: NodeId) {
        let (Some(&from), Some(&to)) = (self.index.get(&producer), self.index.get(&consumer)) else {
            return;
        };
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Build configs that consume the output of `producer`
    pub fn consumers_of(&self, producer: NodeId) -> Vec<NodeId> {
        let Some(&index) = self.index.get(&producer) else {
            return Vec::new();
        };
        let mut consumers: Vec<NodeId> = self.graph.neighbors(index).map(|n| self.graph[n]).collect();
        consumers.sort();
        consumers
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Groups of build configs that transitively depend on themselves
    ///
    /// Each group is sorted by discovery order and groups are ordered by
    /// their first member.
    pub fn cycles(&self) -> Vec<Vec<NodeId>> {
        let mut groups: Vec<Vec<NodeId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&n| self.graph.contains_edge(n, n))
            })
            .map(|component| {
                let mut members: Vec<NodeId> = component.into_iter().map(|n| self.graph[n]).collect();
                members.sort();
                members
            })
            .collect();
        groups.sort_by_key(|group| group.first().copied());
        groups
    }
}

/// The output node, the images it resolves to and the views resolving to those images
fn image_class(graph: &Graph, output: NodeId) -> Vec<NodeId> {
    let mut seen = HashSet::from([output]);
    let mut class = vec![output];

    for image in graph.successors(output, EdgeKind::ResolvesTo) {
        if seen.insert(image) {
            class.push(image);
        }
        for alias in graph.predecessors(image, EdgeKind::ResolvesTo) {
            if seen.insert(alias) {
                class.push(alias);
            }
        }
    }

    class
}

/// Groups of build configs that participate in a build cycle
pub fn circular_build_groups(graph: &Graph) -> Vec<Vec<NodeId>> {
    BuildDependencies::from_graph(graph).cycles()
}

/// One marker per build config participating in a cycle, in discovery order
pub fn find_circular_builds(graph: &Graph) -> Vec<Marker> {
    let groups = circular_build_groups(graph);
    let membership: HashMap<NodeId, usize> = groups
        .iter()
        .enumerate()
        .flat_map(|(group, members)| members.iter().map(move |&bc| (bc, group)))
        .collect();

    let mut markers = Vec::new();
    for bc in graph.nodes_of_kind(NodeKind::BuildConfig) {
        let Some(&group) = membership.get(&bc) else {
            continue;
        };
        let Some(anchor) = graph.name_of(graph.top_level_container(bc)) else {
            continue;
        };
        let label = graph.node(bc).map(|node| node.identity()).unwrap_or_default();
        let others: Vec<NodeId> = groups[group].iter().copied().filter(|&other| other != bc).collect();

        let message = if others.is_empty() {
            format!("build config {label} consumes the image it produces")
        } else {
            let peers: Vec<String> = others
                .iter()
                .filter_map(|&other| graph.node(other).map(|node| node.identity()))
                .collect();
            format!(
                "build config {label} is part of a circular build dependency with {}",
                peers.join(", ")
            )
        };

        let mut marker = Marker::error(MarkerKey::CircularBuildErr, anchor)
            .with_message(message)
            .with_suggestion("Change an input or output so these build configs no longer feed each other");
        for other in others {
            if let Some(name) = graph.name_of(other) {
                marker = marker.with_related(name);
            }
        }
        markers.push(marker);
    }

    markers
}
