//! Build input/output edge projection
//!
//! Resolves every declared input and the output of each build config to an
//! image node and links them with `BuildInput` / `BuildOutput` edges. Target
//! nodes are created on demand. References that cannot be resolved are
//! reported and skipped; they never stop projection of other build configs.

use imagegraph_graph::{
    DockerImageReference, EdgeKind, Graph, Node, NodeId, NodeKind, ObjectReference, ReferenceError,
};
use tracing::{debug, warn};

use crate::projection::{Projection, ReferenceSlot, UnresolvedReference};

/// Why a reference could not be mapped to a node
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unsupported reference kind {0:?}")]
    UnsupportedKind(String),

    #[error("{kind} name {name:?} is malformed")]
    MalformedName { kind: String, name: String },

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Map a build reference to the image node it names
///
/// `default_namespace` applies when the reference carries none.
pub fn resolve_image_reference(
    reference: &ObjectReference,
    default_namespace: &str,
) -> Result<Node, ResolveError> {
    let namespace = reference
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(default_namespace);
    let malformed = || ResolveError::MalformedName {
        kind: reference.kind.clone(),
        name: reference.name.clone(),
    };

    match reference.kind.as_str() {
        "ImageStreamTag" => {
            if reference.name.contains('@') {
                return Err(malformed());
            }
            let (stream, tag) = match reference.name.split_once(':') {
                Some((stream, tag)) => (stream, tag),
                None => (reference.name.as_str(), imagegraph_graph::reference::DEFAULT_TAG),
            };
            if stream.is_empty() || tag.is_empty() || tag.contains(':') {
                return Err(malformed());
            }
            Ok(Node::image_stream_tag(namespace, stream, tag))
        }
        "ImageStreamImage" => {
            let Some((stream, id)) = reference.name.split_once('@') else {
                return Err(malformed());
            };
            if stream.is_empty() || id.is_empty() {
                return Err(malformed());
            }
            Ok(Node::image_stream_image(namespace, stream, id))
        }
        "DockerImage" => {
            let parsed = DockerImageReference::parse(&reference.name)?;
            Ok(Node::docker_image(parsed.with_docker_client_defaults()))
        }
        other => Err(ResolveError::UnsupportedKind(other.to_string())),
    }
}

/// Add input and output edges for every build config in the graph
pub fn add_all_input_output_edges(graph: &mut Graph) -> Projection {
    let mut projection = Projection::default();
    for build_config in graph.nodes_of_kind(NodeKind::BuildConfig) {
        projection.merge(add_input_output_edges(graph, build_config));
    }
    debug!(
        edges_added = projection.edges_added,
        unresolved = projection.unresolved.len(),
        "projected build input/output edges"
    );
    projection
}

/// Add input and output edges for one build config
///
/// Does nothing when `build_config` is not a build config node.
pub fn add_input_output_edges(graph: &mut Graph, build_config: NodeId) -> Projection {
    let mut projection = Projection::default();

    let Some(Node::BuildConfig(bc)) = graph.node(build_config) else {
        return projection;
    };
    let namespace = bc.namespace().to_string();
    let bc_name = graph.node(build_config).map(Node::unique_name).unwrap_or_default();
    let inputs: Vec<ObjectReference> = bc.inputs().into_iter().cloned().collect();
    let output = bc.output().cloned();

    for (index, input) in inputs.iter().enumerate() {
        let slot = ReferenceSlot::Input(index);
        match resolve_image_reference(input, &namespace) {
            Ok(node) => {
                let target = graph.add_node(node);
                projection.record(graph.add_edge(build_config, target, EdgeKind::BuildInput));
            }
            Err(err) => projection.unresolved.push(unresolved(&bc_name, slot, input, &err)),
        }
    }

    let Some(output) = output else {
        debug!(build_config = %bc_name, "build config declares no output");
        return projection;
    };

    let resolved = resolve_image_reference(&output, &namespace).and_then(|node| match node.kind() {
        NodeKind::ImageStreamTag | NodeKind::DockerImage => Ok(node),
        _ => Err(ResolveError::UnsupportedKind(output.kind.clone())),
    });
    match resolved {
        Ok(node) => {
            let target = graph.add_node(node);
            projection.record(graph.add_edge(build_config, target, EdgeKind::BuildOutput));
        }
        Err(err) => projection
            .unresolved
            .push(unresolved(&bc_name, ReferenceSlot::Output, &output, &err)),
    }

    projection
}

fn unresolved(
    build_config: &str,
    slot: ReferenceSlot,
    reference: &ObjectReference,
    err: &ResolveError,
) -> UnresolvedReference {
    warn!(
        build_config,
        %slot,
        kind = %reference.kind,
        name = %reference.name,
        error = %err,
        "skipping unresolvable image reference"
    );
    UnresolvedReference {
        build_config: build_config.to_string(),
        slot,
        kind: reference.kind.clone(),
        name: reference.name.clone(),
        reason: err.to_string(),
    }
}
