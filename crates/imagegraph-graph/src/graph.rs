//! Typed node/edge graph
//!
//! Nodes are addressed by their unique name; edges carry an [`EdgeKind`].
//! Nodes and edges are never removed, so petgraph indices stay stable and
//! edge indices follow insertion order.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::trace;

use crate::node::{Node, NodeKind};

/// Node identifier within one graph
pub type NodeId = NodeIndex;

/// Edge kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Build config -> image it consumes
    BuildInput,

    /// Build config -> image it pushes
    BuildOutput,

    /// Tag/digest view -> its image stream, or image stream -> an image it tracks
    ImageStreamRef,

    /// Tag -> image its newest history entry points at
    ResolvesTo,

    /// Owner -> owned node
    Contains,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildInput => "BuildInput",
            Self::BuildOutput => "BuildOutput",
            Self::ImageStreamRef => "ImageStreamRef",
            Self::ResolvesTo => "ResolvesTo",
            Self::Contains => "Contains",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed typed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// Graph of build configs, image streams and images
#[derive(Debug, Clone, Default)]
pub struct Graph {
    graph: DiGraph<Node, EdgeKind>,

    /// Unique name -> node
    by_name: HashMap<String, NodeId>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or return the existing node with the same unique name
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let name = node.unique_name();
        if let Some(&existing) = self.by_name.get(&name) {
            return existing;
        }

        let id = self.graph.add_node(node);
        trace!(node = %name, "added node");
        self.by_name.insert(name, id);
        id
    }

    /// Look up a node by unique name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Node payload
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(id)
    }

    /// Unique name of a node
    pub fn name_of(&self, id: NodeId) -> Option<String> {
        self.node(id).map(Node::unique_name)
    }

    /// Insert a directed edge
    ///
    /// Returns `Ok(false)` when an identical `(from, to, kind)` edge already
    /// exists; the graph never holds duplicate edges.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> Result<bool, GraphError> {
        for id in [from, to] {
            if self.graph.node_weight(id).is_none() {
                return Err(GraphError::MissingNode(format!("#{}", id.index())));
            }
        }

        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|edge| *edge.weight() == kind);
        if exists {
            return Ok(false);
        }

        self.graph.add_edge(from, to, kind);
        Ok(true)
    }

    /// Insert a directed edge between two nodes given by unique name
    pub fn add_edge_by_name(&mut self, from: &str, to: &str, kind: EdgeKind) -> Result<bool, GraphError> {
        let from_id = self.find(from).ok_or_else(|| GraphError::MissingNode(from.to_string()))?;
        let to_id = self.find(to).ok_or_else(|| GraphError::MissingNode(to.to_string()))?;
        self.add_edge(from_id, to_id, kind)
    }

    /// Outgoing edges of `id` in insertion order, optionally of one kind
    pub fn out_edges(&self, id: NodeId, kind: Option<EdgeKind>) -> Vec<Edge> {
        self.edges(id, Direction::Outgoing, kind)
    }

    /// Incoming edges of `id` in insertion order, optionally of one kind
    pub fn in_edges(&self, id: NodeId, kind: Option<EdgeKind>) -> Vec<Edge> {
        self.edges(id, Direction::Incoming, kind)
    }

    fn edges(&self, id: NodeId, direction: Direction, kind: Option<EdgeKind>) -> Vec<Edge> {
        if self.graph.node_weight(id).is_none() {
            return Vec::new();
        }

        // petgraph walks adjacency lists newest first
        let mut edges: Vec<(EdgeIndex, Edge)> = self
            .graph
            .edges_directed(id, direction)
            .filter(|edge| kind.map_or(true, |k| *edge.weight() == k))
            .map(|edge| {
                (
                    edge.id(),
                    Edge {
                        from: edge.source(),
                        to: edge.target(),
                        kind: *edge.weight(),
                    },
                )
            })
            .collect();
        edges.sort_by_key(|(index, _)| *index);
        edges.into_iter().map(|(_, edge)| edge).collect()
    }

    /// Targets of outgoing edges of one kind, in insertion order
    pub fn successors(&self, id: NodeId, kind: EdgeKind) -> Vec<NodeId> {
        self.out_edges(id, Some(kind)).into_iter().map(|edge| edge.to).collect()
    }

    /// Sources of incoming edges of one kind, in insertion order
    pub fn predecessors(&self, id: NodeId, kind: EdgeKind) -> Vec<NodeId> {
        self.in_edges(id, Some(kind)).into_iter().map(|edge| edge.from).collect()
    }

    /// Walk `Contains` edges upward to the outermost owner of `id`
    ///
    /// Returns `id` itself when nothing owns it. Stops at the first node seen
    /// twice, so malformed ownership loops terminate.
    pub fn top_level_container(&self, id: NodeId) -> NodeId {
        let mut current = id;
        let mut visited = HashSet::from([id]);

        while let Some(owner) = self.predecessors(current, EdgeKind::Contains).first().copied() {
            if !visited.insert(owner) {
                break;
            }
            current = owner;
        }

        current
    }

    /// All node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Node ids of one kind, in insertion order
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&id| self.graph[id].kind() == kind)
            .collect()
    }

    /// All edges in insertion order
    pub fn all_edges(&self) -> Vec<Edge> {
        self.graph
            .edge_references()
            .map(|edge| Edge {
                from: edge.source(),
                to: edge.target(),
                kind: *edge.weight(),
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.node_ids() {
            writeln!(f, "{}", self.graph[id])?;
            for edge in self.out_edges(id, None) {
                writeln!(f, "  -{}-> {}", edge.kind, self.graph[edge.to])?;
            }
        }
        Ok(())
    }
}

/// Structural graph errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    MissingNode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ImageNode;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_node_is_idempotent() {
        let mut graph = Graph::new();
        let first = graph.add_node(Node::image_stream_tag("ns", "app", "latest"));
        let second = graph.add_node(Node::image_stream_tag("ns", "app", "latest"));

        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.find("ImageStreamTag|ns/app:latest"), Some(first));
        assert_eq!(graph.find("ImageStreamTag|ns/app:other"), None);
    }

    #[test]
    fn add_edge_rejects_missing_endpoints() {
        let mut graph = Graph::new();
        let tag = graph.add_node(Node::image_stream_tag("ns", "app", "latest"));

        let err = graph
            .add_edge_by_name("ImageStreamTag|ns/app:latest", "ImageStream|ns/app", EdgeKind::ImageStreamRef)
            .unwrap_err();
        assert_eq!(err, GraphError::MissingNode("ImageStream|ns/app".to_string()));

        assert!(graph.add_edge(tag, NodeIndex::new(7), EdgeKind::ImageStreamRef).is_err());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn duplicate_edges_are_dropped() {
        let mut graph = Graph::new();
        let tag = graph.add_node(Node::image_stream_tag("ns", "app", "latest"));
        let image = graph.add_node(Node::image(ImageNode::named("sha256:abc")));

        assert_eq!(graph.add_edge(tag, image, EdgeKind::ResolvesTo), Ok(true));
        assert_eq!(graph.add_edge(tag, image, EdgeKind::ResolvesTo), Ok(false));
        assert_eq!(graph.add_edge(tag, image, EdgeKind::ImageStreamRef), Ok(true));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn edges_come_back_in_insertion_order() {
        let mut graph = Graph::new();
        let hub = graph.add_node(Node::image_stream_tag("ns", "hub", "latest"));
        let targets: Vec<NodeId> = (0..4)
            .map(|i| graph.add_node(Node::image(ImageNode::named(format!("img-{i}")))))
            .collect();

        for &target in &targets {
            graph.add_edge(hub, target, EdgeKind::ResolvesTo).unwrap();
        }
        graph.add_edge(hub, targets[0], EdgeKind::Contains).unwrap();

        assert_eq!(graph.successors(hub, EdgeKind::ResolvesTo), targets);
        assert_eq!(graph.out_edges(hub, None).len(), 5);
        assert_eq!(graph.out_edges(hub, Some(EdgeKind::Contains)).len(), 1);
        assert_eq!(graph.predecessors(targets[2], EdgeKind::ResolvesTo), vec![hub]);
    }

    #[test]
    fn top_level_container_walks_ownership() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::image(ImageNode::named("a")));
        let b = graph.add_node(Node::image(ImageNode::named("b")));
        let c = graph.add_node(Node::image(ImageNode::named("c")));
        graph.add_edge(a, b, EdgeKind::Contains).unwrap();
        graph.add_edge(b, c, EdgeKind::Contains).unwrap();

        assert_eq!(graph.top_level_container(c), a);
        assert_eq!(graph.top_level_container(a), a);
    }

    #[test]
    fn top_level_container_survives_ownership_loops() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::image(ImageNode::named("a")));
        let b = graph.add_node(Node::image(ImageNode::named("b")));
        graph.add_edge(a, b, EdgeKind::Contains).unwrap();
        graph.add_edge(b, a, EdgeKind::Contains).unwrap();

        assert_eq!(graph.top_level_container(b), a);
    }

    #[test]
    fn lookups_on_unknown_ids_are_empty() {
        let graph = Graph::new();
        let ghost = NodeIndex::new(3);
        assert!(graph.node(ghost).is_none());
        assert!(graph.out_edges(ghost, None).is_empty());
        assert_eq!(graph.top_level_container(ghost), ghost);
    }
}
