//! Inventory to graph construction
//!
//! Adds one node per inventory object plus the tag views each image stream
//! declares. Only ownership (`Contains`) edges are added here; semantic edges
//! come from the projectors in the engine crate.

use tracing::debug;

use crate::graph::{EdgeKind, Graph, GraphError};
use crate::inventory::Inventory;
use crate::node::{ImageNode, Node};

/// Build a graph holding every object of the inventory
pub fn build_graph(inventory: &Inventory) -> Graph {
    let mut graph = Graph::new();

    for build_config in &inventory.build_configs {
        graph.add_node(Node::build_config(build_config.clone()));
    }

    for image_stream in &inventory.image_streams {
        let stream_id = graph.add_node(Node::image_stream(image_stream.clone()));
        let namespace = &image_stream.metadata.namespace;
        let name = &image_stream.metadata.name;

        let declared = image_stream.spec.tags.iter().map(|tag| tag.name.as_str());
        let recorded = image_stream.status.tags.keys().map(String::as_str);

        for tag in declared.chain(recorded) {
            let tag_id = graph.add_node(Node::image_stream_tag(namespace, name, tag));
            if let Err(GraphError::MissingNode(node)) = graph.add_edge(stream_id, tag_id, EdgeKind::Contains) {
                debug!(%node, "skipped ownership edge");
            }
        }
    }

    for image in &inventory.images {
        graph.add_node(Node::image(ImageNode::from_image(image)));
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built graph from inventory"
    );

    graph
}
