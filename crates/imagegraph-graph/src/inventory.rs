//! Cluster inventory snapshots
//!
//! Parses a point-in-time export of build configs, image streams and images.
//! Object shapes follow the cluster API (camelCase, `metadata` blocks); only
//! the fields the analysis needs are modelled, everything else is ignored.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Annotation set on images pushed through the cluster's managed registry
pub const MANAGED_ANNOTATION: &str = "openshift.io/image.managed";

/// A snapshot of the objects the graph is built from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    /// Build configurations
    #[serde(default)]
    pub build_configs: Vec<BuildConfig>,

    /// Image streams
    #[serde(default)]
    pub image_streams: Vec<ImageStream>,

    /// Images known to the cluster
    #[serde(default)]
    pub images: Vec<Image>,
}

impl Inventory {
    /// Load an inventory from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: &Path) -> Result<Self, InventoryError> {
        Self::from_file_with_digest(path).map(|(inventory, _)| inventory)
    }

    /// Load an inventory along with the `content_digest` of the bytes parsed
    ///
    /// The file is read once, so the digest always describes what was loaded.
    pub fn from_file_with_digest(path: &Path) -> Result<(Self, String), InventoryError> {
        let raw = std::fs::read(path)
            .map_err(|e| InventoryError::IoError(path.display().to_string(), e.to_string()))?;
        let contents = std::str::from_utf8(&raw)
            .map_err(|e| InventoryError::ParseError(format!("{}: {e}", path.display())))?;

        let inventory = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(contents)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(contents)?,
            _ => return Err(InventoryError::UnsupportedFormat(path.display().to_string())),
        };
        Ok((inventory, Self::content_digest(&raw)))
    }

    /// Parse an inventory from JSON
    pub fn from_json_str(json: &str) -> Result<Self, InventoryError> {
        serde_json::from_str(json)
            .map_err(|e| InventoryError::ParseError(e.to_string()))
    }

    /// Parse an inventory from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self, InventoryError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| InventoryError::ParseError(e.to_string()))
    }

    /// Fingerprint of a raw inventory file, `sha256:<hex>`
    pub fn content_digest(raw: &[u8]) -> String {
        format!("sha256:{}", hex::encode(Sha256::digest(raw)))
    }

    /// Find an image stream by namespace and name
    pub fn get_image_stream(&self, namespace: &str, name: &str) -> Option<&ImageStream> {
        self.image_streams
            .iter()
            .find(|stream| stream.metadata.namespace == namespace && stream.metadata.name == name)
    }

    /// Find a build config by namespace and name
    pub fn get_build_config(&self, namespace: &str, name: &str) -> Option<&BuildConfig> {
        self.build_configs
            .iter()
            .find(|bc| bc.metadata.namespace == namespace && bc.metadata.name == name)
    }
}

/// Object metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Namespace, empty for cluster-scoped objects
    #[serde(default)]
    pub namespace: String,

    /// Object name
    pub name: String,

    /// Annotations
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl ObjectMeta {
    /// Metadata for a namespaced object
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            annotations: HashMap::new(),
        }
    }
}

/// A typed pointer to another object, as used by build inputs and outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// `ImageStreamTag`, `ImageStreamImage` or `DockerImage`
    pub kind: String,

    /// `stream:tag`, `stream@digest` or a pull spec, depending on `kind`
    pub name: String,

    /// Namespace, defaults to the referring object's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectReference {
    /// Reference of the given kind
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    /// Set an explicit namespace
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// A build configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: BuildConfigSpec,
}

impl BuildConfig {
    /// All declared input images: the strategy base image first, then image sources
    pub fn inputs(&self) -> Vec<&ObjectReference> {
        let mut inputs = Vec::new();
        if let Some(from) = &self.spec.strategy.from {
            inputs.push(from);
        }
        inputs.extend(self.spec.source.images.iter().map(|image| &image.from));
        inputs
    }

    /// The declared output image, if any
    pub fn output(&self) -> Option<&ObjectReference> {
        self.spec.output.to.as_ref()
    }
}

/// Build configuration spec
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfigSpec {
    #[serde(default)]
    pub strategy: BuildStrategy,

    #[serde(default)]
    pub source: BuildSource,

    #[serde(default)]
    pub output: BuildOutput,
}

/// Build strategy (only the base image matters here)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStrategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ObjectReference>,
}

/// Build source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSource {
    /// Images whose contents are copied into the build
    #[serde(default)]
    pub images: Vec<ImageSource>,
}

/// An image used as a build source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub from: ObjectReference,
}

/// Build output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildOutput {
    /// Push target; output is optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<ObjectReference>,
}

/// An image stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStream {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: ImageStreamSpec,

    #[serde(default)]
    pub status: ImageStreamStatus,
}

/// Image stream spec
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageStreamSpec {
    /// Declared tags
    #[serde(default)]
    pub tags: Vec<TagReference>,
}

/// A declared tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagReference {
    pub name: String,
}

/// Image stream status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
    /// Address the stream can be pulled from; unset until the cluster
    /// registry is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image_repository: Option<String>,

    /// Tag history, keyed by tag name
    #[serde(default)]
    pub tags: BTreeMap<String, TagEventList>,
}

/// History of one tag, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagEventList {
    #[serde(default)]
    pub items: Vec<TagEvent>,
}

/// One point in a tag's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEvent {
    /// Image name (usually a digest)
    pub image: String,

    /// Pull spec at the time of tagging
    #[serde(default)]
    pub docker_image_reference: String,
}

/// An image object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub metadata: ObjectMeta,

    /// Pull spec of the image
    #[serde(default)]
    pub docker_image_reference: String,
}

impl Image {
    /// Whether the image was pushed through the managed registry
    pub fn is_managed(&self) -> bool {
        self.metadata
            .annotations
            .get(MANAGED_ANNOTATION)
            .is_some_and(|value| value == "true")
    }
}

/// Inventory loading errors
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Failed to read inventory file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse inventory: {0}")]
    ParseError(String),

    #[error("Unsupported inventory format (expected .json, .yaml or .yml): {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INVENTORY_YAML: &str = r#"
buildConfigs:
  - metadata:
      namespace: ns
      name: app
    spec:
      strategy:
        from:
          kind: ImageStreamTag
          name: ruby:2.0
          namespace: openshift
      source:
        images:
          - from:
              kind: DockerImage
              name: docker.io/library/busybox
      output:
        to:
          kind: ImageStreamTag
          name: app:latest
  - metadata:
      namespace: ns
      name: no-output
imageStreams:
  - metadata:
      namespace: ns
      name: app
    spec:
      tags:
        - name: latest
    status:
      dockerImageRepository: 172.30.1.1:5000/ns/app
      tags:
        latest:
          items:
            - image: sha256:aaaa
              dockerImageReference: 172.30.1.1:5000/ns/app@sha256:aaaa
images:
  - metadata:
      name: sha256:aaaa
      annotations:
        openshift.io/image.managed: "true"
    dockerImageReference: 172.30.1.1:5000/ns/app@sha256:aaaa
"#;

    #[test]
    fn parse_yaml_inventory() {
        let inventory = Inventory::from_yaml_str(INVENTORY_YAML).unwrap();

        assert_eq!(inventory.build_configs.len(), 2);
        assert_eq!(inventory.image_streams.len(), 1);
        assert_eq!(inventory.images.len(), 1);

        let app = inventory.get_build_config("ns", "app").unwrap();
        let inputs = app.inputs();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].kind, "ImageStreamTag");
        assert_eq!(inputs[0].namespace.as_deref(), Some("openshift"));
        assert_eq!(inputs[1].name, "docker.io/library/busybox");
        assert_eq!(app.output().map(|o| o.name.as_str()), Some("app:latest"));

        let bare = inventory.get_build_config("ns", "no-output").unwrap();
        assert!(bare.inputs().is_empty());
        assert!(bare.output().is_none());

        let stream = inventory.get_image_stream("ns", "app").unwrap();
        assert_eq!(
            stream.status.docker_image_repository.as_deref(),
            Some("172.30.1.1:5000/ns/app")
        );
        assert_eq!(stream.status.tags["latest"].items[0].image, "sha256:aaaa");

        assert!(inventory.images[0].is_managed());
    }

    #[test]
    fn json_and_yaml_agree() {
        let from_yaml = Inventory::from_yaml_str(INVENTORY_YAML).unwrap();
        let json = serde_json::to_string(&from_yaml).unwrap();
        let from_json = Inventory::from_json_str(&json).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn empty_inventory() {
        let inventory = Inventory::from_json_str("{}").unwrap();
        assert_eq!(inventory, Inventory::default());
    }

    #[test]
    fn parse_error() {
        let err = Inventory::from_json_str("{\"buildConfigs\": 3}").unwrap_err();
        assert!(matches!(err, InventoryError::ParseError(_)));
    }

    #[test]
    fn unsupported_extension() {
        let path = std::env::temp_dir().join("imagegraph-inventory-test.txt");
        std::fs::write(&path, "{}").unwrap();
        let err = Inventory::from_file(&path).unwrap_err();
        assert!(matches!(err, InventoryError::UnsupportedFormat(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn digest_matches_loaded_bytes() {
        let path = std::env::temp_dir().join(format!("imagegraph-inventory-{}.yaml", std::process::id()));
        std::fs::write(&path, INVENTORY_YAML).unwrap();
        let (inventory, digest) = Inventory::from_file_with_digest(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(inventory, Inventory::from_yaml_str(INVENTORY_YAML).unwrap());
        assert_eq!(digest, Inventory::content_digest(INVENTORY_YAML.as_bytes()));
    }

    #[test]
    fn managed_annotation_must_be_true() {
        let mut image = Image {
            metadata: ObjectMeta::new("", "sha256:bbbb"),
            docker_image_reference: String::new(),
        };
        assert!(!image.is_managed());

        image.metadata.annotations.insert(MANAGED_ANNOTATION.to_string(), "false".to_string());
        assert!(!image.is_managed());
    }

    #[test]
    fn content_digest_is_stable() {
        assert_eq!(
            Inventory::content_digest(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
