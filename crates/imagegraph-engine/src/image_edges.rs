//! Image stream reference edge projection
//!
//! Runs after the build projector so the tag and digest views that build
//! configs mention are already nodes. Three passes:
//!
//! 1. every status tag of a stream becomes a tag node pointing at the stream,
//!    and at the image its newest history entry names
//! 2. every tag/digest view whose stream exists points at that stream
//! 3. every stream points at the managed images pushed into its repository

use std::collections::HashMap;

use imagegraph_graph::{
    unique_name, DockerImageReference, EdgeKind, Graph, ImageNode, Node, NodeId, NodeKind,
};
use tracing::debug;

use crate::projection::Projection;

/// Add every image stream reference edge the graph supports
pub fn add_all_image_stream_ref_edges(graph: &mut Graph) -> Projection {
    let mut projection = Projection::default();

    let streams = graph.nodes_of_kind(NodeKind::ImageStream);
    for &stream in &streams {
        add_status_tag_edges(graph, stream, &mut projection);
    }

    for kind in [NodeKind::ImageStreamTag, NodeKind::ImageStreamImage] {
        for view in graph.nodes_of_kind(kind) {
            add_view_edges(graph, view, &mut projection);
        }
    }

    let repositories = managed_images_by_repository(graph);
    for &stream in &streams {
        let Some((namespace, name)) = graph.node(stream).and_then(Node::image_stream_identity) else {
            continue;
        };
        let key = (namespace.to_string(), name.to_string());
        for &image in repositories.get(&key).into_iter().flatten() {
            projection.record(graph.add_edge(stream, image, EdgeKind::ImageStreamRef));
        }
    }

    debug!(
        edges_added = projection.edges_added,
        streams = streams.len(),
        "projected image stream reference edges"
    );
    projection
}

fn add_status_tag_edges(graph: &mut Graph, stream: NodeId, projection: &mut Projection) {
    let Some(Node::ImageStream(node)) = graph.node(stream) else {
        return;
    };
    let namespace = node.namespace().to_string();
    let name = node.name().to_string();

    let tags: Vec<(String, Option<String>)> = node
        .image_stream
        .status
        .tags
        .iter()
        .map(|(tag, history)| {
            let newest = history
                .items
                .first()
                .map(|event| event.image.clone())
                .filter(|image| !image.is_empty());
            (tag.clone(), newest)
        })
        .collect();

    for (tag, newest) in tags {
        let tag_node = graph.add_node(Node::image_stream_tag(&namespace, &name, &tag));
        projection.record(graph.add_edge(tag_node, stream, EdgeKind::ImageStreamRef));

        if let Some(image) = newest {
            let image_node = graph.add_node(Node::image(ImageNode::named(image)));
            projection.record(graph.add_edge(tag_node, image_node, EdgeKind::ResolvesTo));
        }
    }
}

fn add_view_edges(graph: &mut Graph, view: NodeId, projection: &mut Projection) {
    let Some(node) = graph.node(view) else {
        return;
    };
    let Some((namespace, name)) = node.image_stream_identity() else {
        return;
    };
    let stream_name = unique_name(NodeKind::ImageStream, &format!("{namespace}/{name}"));

    // A digest view names an image directly
    let image = match node {
        Node::ImageStreamImage(isi) => graph.find(&unique_name(NodeKind::Image, &isi.digest)),
        _ => None,
    };

    let Some(stream) = graph.find(&stream_name) else {
        debug!(view = %node, "no image stream for view");
        return;
    };
    projection.record(graph.add_edge(view, stream, EdgeKind::ImageStreamRef));

    if let Some(image) = image {
        projection.record(graph.add_edge(view, image, EdgeKind::ResolvesTo));
    }
}

/// Managed image nodes keyed by the `(namespace, name)` repository of their pull spec
fn managed_images_by_repository(graph: &Graph) -> HashMap<(String, String), Vec<NodeId>> {
    let mut repositories: HashMap<(String, String), Vec<NodeId>> = HashMap::new();

    for id in graph.nodes_of_kind(NodeKind::Image) {
        let Some(Node::Image(image)) = graph.node(id) else {
            continue;
        };
        if !image.managed {
            continue;
        }
        match DockerImageReference::parse(&image.docker_image_reference) {
            Ok(reference) => repositories
                .entry((reference.namespace, reference.name))
                .or_default()
                .push(id),
            Err(err) => debug!(image = %image.name, error = %err, "managed image has no usable pull spec"),
        }
    }

    repositories
}
