//! Registry view of an image stream
//!
//! Answers the registry's "which manifests live in this repository" question
//! from the projected graph rather than from the inventory directly.

use imagegraph_graph::{unique_name, Digest, EdgeKind, Graph, Node, NodeId, NodeKind};
use tracing::warn;

/// Repository lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository not found: {0}")]
    Unknown(String),
}

/// The repository backed by image stream `namespace/name`
#[derive(Debug, Clone)]
pub struct ImageRepository<'g> {
    graph: &'g Graph,
    namespace: String,
    name: String,
}

impl<'g> ImageRepository<'g> {
    pub fn new(graph: &'g Graph, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            graph,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `namespace/name`
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    fn stream(&self) -> Result<NodeId, RepositoryError> {
        self.graph
            .find(&unique_name(NodeKind::ImageStream, &self.path()))
            .ok_or_else(|| RepositoryError::Unknown(self.path()))
    }

    /// Digests of the managed images pushed into this repository
    ///
    /// Images whose name is not a valid digest are logged and skipped. An
    /// existing stream with no images yields an empty list.
    pub fn enumerate(&self) -> Result<Vec<Digest>, RepositoryError> {
        let stream = self.stream()?;
        let mut digests = Vec::new();

        for id in self.graph.successors(stream, EdgeKind::ImageStreamRef) {
            let Some(Node::Image(image)) = self.graph.node(id) else {
                continue;
            };
            match Digest::parse(&image.name) {
                Ok(digest) => digests.push(digest),
                Err(err) => warn!(
                    repository = %self.path(),
                    image = %image.name,
                    error = %err,
                    "skipping image with invalid digest name"
                ),
            }
        }

        Ok(digests)
    }

    /// Tag names recorded in the stream status, empty for an unknown stream
    pub fn tags(&self) -> Vec<String> {
        let node = self.stream().ok().and_then(|id| self.graph.node(id));
        match node {
            Some(Node::ImageStream(stream)) => stream.image_stream.status.tags.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}
