//! Graph node variants
//!
//! Every node wraps one domain object and exposes a unique name of the form
//! `<Kind>|<identity>`. Two nodes with the same unique name are the same node.

use crate::inventory::{BuildConfig, Image, ImageStream, ObjectReference};
use crate::reference::DockerImageReference;
use std::fmt;

/// Node kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    BuildConfig,
    ImageStream,
    ImageStreamTag,
    ImageStreamImage,
    DockerImage,
    Image,
}

impl NodeKind {
    /// Kind prefix used in unique names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildConfig => "BuildConfig",
            Self::ImageStream => "ImageStream",
            Self::ImageStreamTag => "ImageStreamTag",
            Self::ImageStreamImage => "ImageStreamImage",
            Self::DockerImage => "DockerImage",
            Self::Image => "Image",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build `<Kind>|<identity>`
pub fn unique_name(kind: NodeKind, identity: &str) -> String {
    format!("{}|{}", kind.as_str(), identity)
}

/// A build configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfigNode {
    pub build_config: BuildConfig,
}

impl BuildConfigNode {
    pub fn namespace(&self) -> &str {
        &self.build_config.metadata.namespace
    }

    pub fn name(&self) -> &str {
        &self.build_config.metadata.name
    }

    /// Declared inputs, strategy base image first
    pub fn inputs(&self) -> Vec<&ObjectReference> {
        self.build_config.inputs()
    }

    /// Declared output, if any
    pub fn output(&self) -> Option<&ObjectReference> {
        self.build_config.output()
    }
}

/// An image stream
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStreamNode {
    pub image_stream: ImageStream,
}

impl ImageStreamNode {
    pub fn namespace(&self) -> &str {
        &self.image_stream.metadata.namespace
    }

    pub fn name(&self) -> &str {
        &self.image_stream.metadata.name
    }

    /// Externally reachable repository, `None` when the registry was never configured
    pub fn public_repository(&self) -> Option<&str> {
        self.image_stream
            .status
            .docker_image_repository
            .as_deref()
            .map(str::trim)
            .filter(|repo| !repo.is_empty())
    }
}

/// One tag of an image stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStreamTagNode {
    pub namespace: String,
    pub stream: String,
    pub tag: String,
}

/// One digest of an image stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStreamImageNode {
    pub namespace: String,
    pub stream: String,
    pub digest: String,
}

/// An image outside the managed registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerImageNode {
    pub reference: DockerImageReference,
}

/// A cluster image object, the identity tags and streams resolve to
#[derive(Debug, Clone, PartialEq)]
pub struct ImageNode {
    /// Image name, usually a digest
    pub name: String,

    /// Pull spec, empty when only known by name
    pub docker_image_reference: String,

    /// Pushed through the managed registry
    pub managed: bool,
}

impl ImageNode {
    /// Node for an image object from the inventory
    pub fn from_image(image: &Image) -> Self {
        Self {
            name: image.metadata.name.clone(),
            docker_image_reference: image.docker_image_reference.clone(),
            managed: image.is_managed(),
        }
    }

    /// Placeholder for an image only known by name (e.g. from tag history)
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docker_image_reference: String::new(),
            managed: false,
        }
    }
}

/// A graph node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    BuildConfig(BuildConfigNode),
    ImageStream(ImageStreamNode),
    ImageStreamTag(ImageStreamTagNode),
    ImageStreamImage(ImageStreamImageNode),
    DockerImage(DockerImageNode),
    Image(ImageNode),
}

impl Node {
    pub fn build_config(build_config: BuildConfig) -> Self {
        Self::BuildConfig(BuildConfigNode { build_config })
    }

    pub fn image_stream(image_stream: ImageStream) -> Self {
        Self::ImageStream(ImageStreamNode { image_stream })
    }

    pub fn image_stream_tag(
        namespace: impl Into<String>,
        stream: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self::ImageStreamTag(ImageStreamTagNode {
            namespace: namespace.into(),
            stream: stream.into(),
            tag: tag.into(),
        })
    }

    pub fn image_stream_image(
        namespace: impl Into<String>,
        stream: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self::ImageStreamImage(ImageStreamImageNode {
            namespace: namespace.into(),
            stream: stream.into(),
            digest: digest.into(),
        })
    }

    pub fn docker_image(reference: DockerImageReference) -> Self {
        Self::DockerImage(DockerImageNode { reference })
    }

    pub fn image(image: ImageNode) -> Self {
        Self::Image(image)
    }

    /// Kind discriminator
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::BuildConfig(_) => NodeKind::BuildConfig,
            Self::ImageStream(_) => NodeKind::ImageStream,
            Self::ImageStreamTag(_) => NodeKind::ImageStreamTag,
            Self::ImageStreamImage(_) => NodeKind::ImageStreamImage,
            Self::DockerImage(_) => NodeKind::DockerImage,
            Self::Image(_) => NodeKind::Image,
        }
    }

    /// Identity within the kind, without the kind prefix
    pub fn identity(&self) -> String {
        match self {
            Self::BuildConfig(bc) => format!("{}/{}", bc.namespace(), bc.name()),
            Self::ImageStream(is) => format!("{}/{}", is.namespace(), is.name()),
            Self::ImageStreamTag(ist) => format!("{}/{}:{}", ist.namespace, ist.stream, ist.tag),
            Self::ImageStreamImage(isi) => format!("{}/{}@{}", isi.namespace, isi.stream, isi.digest),
            Self::DockerImage(image) => image.reference.to_string(),
            Self::Image(image) => image.name.clone(),
        }
    }

    /// Globally unique name, `<Kind>|<identity>`
    pub fn unique_name(&self) -> String {
        unique_name(self.kind(), &self.identity())
    }

    /// `namespace/name` of the image stream this node belongs to or is
    pub fn image_stream_identity(&self) -> Option<(&str, &str)> {
        match self {
            Self::ImageStream(is) => Some((is.namespace(), is.name())),
            Self::ImageStreamTag(ist) => Some((ist.namespace.as_str(), ist.stream.as_str())),
            Self::ImageStreamImage(isi) => Some((isi.namespace.as_str(), isi.stream.as_str())),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_name())
    }
}
