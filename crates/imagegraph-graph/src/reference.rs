//! Docker image pull specs and content digests
//!
//! A pull spec has the shape `[registry/][namespace/]name[:tag][@digest]`.
//! The first path component is treated as a registry host when it contains a
//! `.` or a `:`, or is exactly `localhost`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Namespace implied when a registry-qualified spec has a single path component
pub const DEFAULT_NAMESPACE: &str = "library";

/// Tag implied when a reference names none
pub const DEFAULT_TAG: &str = "latest";

/// Registry implied when a pull spec names none
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// A parsed image pull spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DockerImageReference {
    /// Registry host (with optional port), empty when the spec names none
    pub registry: String,

    /// Repository namespace, empty for bare single-component names
    pub namespace: String,

    /// Repository name
    pub name: String,

    /// Tag, empty when absent
    pub tag: String,

    /// Content digest (`algorithm:hex`), empty when absent
    pub id: String,
}

impl DockerImageReference {
    /// Parse a pull spec
    pub fn parse(spec: &str) -> Result<Self, ReferenceError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if spec.chars().any(char::is_whitespace) {
            return Err(ReferenceError::InvalidFormat(spec.to_string()));
        }

        let (repository, tag, id) = split_repository_tag(spec);
        let parts: Vec<&str> = repository.split('/').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(ReferenceError::InvalidFormat(spec.to_string()));
        }

        let mut reference = DockerImageReference {
            tag: tag.to_string(),
            id: id.to_string(),
            ..Default::default()
        };

        match parts.as_slice() {
            [name] => {
                reference.name = (*name).to_string();
            }
            [first, name] if is_registry_name(first) => {
                reference.registry = (*first).to_string();
                reference.namespace = DEFAULT_NAMESPACE.to_string();
                reference.name = (*name).to_string();
            }
            [namespace, name] => {
                reference.namespace = (*namespace).to_string();
                reference.name = (*name).to_string();
            }
            [registry, namespace, name] => {
                reference.registry = (*registry).to_string();
                reference.namespace = (*namespace).to_string();
                reference.name = (*name).to_string();
            }
            _ => return Err(ReferenceError::InvalidFormat(spec.to_string())),
        }

        Ok(reference)
    }

    /// Fill in the registry, namespace and tag a docker client would assume
    ///
    /// The tag is only defaulted when no digest pins the image.
    pub fn with_docker_client_defaults(mut self) -> Self {
        if self.registry.is_empty() {
            self.registry = DEFAULT_REGISTRY.to_string();
        }
        if self.namespace.is_empty() {
            self.namespace = DEFAULT_NAMESPACE.to_string();
        }
        if self.tag.is_empty() && self.id.is_empty() {
            self.tag = DEFAULT_TAG.to_string();
        }
        self
    }

    /// `namespace/name` when a namespace is present, otherwise `name`
    pub fn repository_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    /// Whether this reference points into the repository `namespace/name`
    pub fn is_in_repository(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}

impl fmt::Display for DockerImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.registry.is_empty() {
            write!(f, "{}/", self.registry)?;
        }
        write!(f, "{}", self.repository_name())?;
        if !self.tag.is_empty() {
            write!(f, ":{}", self.tag)?;
        }
        if !self.id.is_empty() {
            write!(f, "@{}", self.id)?;
        }
        Ok(())
    }
}

/// Split `repo[:tag][@id]` into its three parts
fn split_repository_tag(spec: &str) -> (&str, &str, &str) {
    let (rest, id) = spec.rsplit_once('@').unwrap_or((spec, ""));

    match rest.rfind(':') {
        // A colon before the last slash belongs to a registry port
        Some(colon) if !rest[colon..].contains('/') => (&rest[..colon], &rest[colon + 1..], id),
        _ => (rest, "", id),
    }
}

fn is_registry_name(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

/// A content-addressable image identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest {
    /// Hash algorithm (`sha256`, `sha384` or `sha512`)
    pub algorithm: String,

    /// Lowercase hex encoded hash
    pub hex: String,
}

impl Digest {
    /// Parse `algorithm:hex`
    pub fn parse(value: &str) -> Result<Self, ReferenceError> {
        static DIGEST_RE: OnceLock<Regex> = OnceLock::new();
        let re = DIGEST_RE.get_or_init(|| {
            Regex::new(r"^(sha256|sha384|sha512):([a-f0-9]+)$").expect("digest pattern is valid")
        });

        let captures = re
            .captures(value)
            .ok_or_else(|| ReferenceError::InvalidDigest(value.to_string()))?;
        let algorithm = &captures[1];
        let hex = &captures[2];

        let expected_len = match algorithm {
            "sha256" => 64,
            "sha384" => 96,
            _ => 128,
        };
        if hex.len() != expected_len {
            return Err(ReferenceError::InvalidDigest(value.to_string()));
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Errors from parsing pull specs and digests
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("empty image reference")]
    Empty,

    #[error("invalid image reference {0:?}")]
    InvalidFormat(String),

    #[error("invalid digest {0:?}")]
    InvalidDigest(String),
}
