//! Marker keys and diagnostic records
//!
//! IMPORTANT: Marker keys are stable.
//! NEVER rename or remove keys - tooling matches on them.
//! Add new keys with new names only.

use serde::{Deserialize, Serialize};

/// Marker key registry
///
/// These keys are STABLE. The serialized form is the variant name.
/// Do NOT rename or remove keys - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKey {
    /// A build pushes to an image stream tag but the cluster registry address
    /// was never configured for that stream
    MissingRequiredRegistryErr,

    /// A build pushes to an image stream tag whose image stream does not exist
    MissingImageStreamErr,

    /// A build config is part of an output/input cycle with other build configs
    CircularBuildErr,
}

impl MarkerKey {
    /// All registered keys, in registration order
    pub const ALL: [MarkerKey; 3] = [
        Self::MissingRequiredRegistryErr,
        Self::MissingImageStreamErr,
        Self::CircularBuildErr,
    ];

    /// Get the marker key as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequiredRegistryErr => "MissingRequiredRegistryErr",
            Self::MissingImageStreamErr => "MissingImageStreamErr",
            Self::CircularBuildErr => "CircularBuildErr",
        }
    }

    /// Look up a key by its stable string identifier
    pub fn from_key_str(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Marker severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warning,

    /// Error - the build graph is broken
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A structural problem found in the build graph
///
/// `node` and `related_nodes` hold graph unique names
/// (e.g. `BuildConfig|ns/app`), so a marker stays meaningful after the graph
/// it was computed from is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Stable marker key
    pub key: MarkerKey,

    /// Severity level
    pub severity: Severity,

    /// Node the problem is anchored to
    pub node: String,

    /// Nodes giving context, most relevant first
    #[serde(default)]
    pub related_nodes: Vec<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Suggested remediation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Marker {
    /// Create an error marker anchored at `node`
    pub fn error(key: MarkerKey, node: impl Into<String>) -> Self {
        Self::new(key, Severity::Error, node)
    }

    /// Create a marker with minimal fields
    pub fn new(key: MarkerKey, severity: Severity, node: impl Into<String>) -> Self {
        Self {
            key,
            severity,
            node: node.into(),
            related_nodes: Vec::new(),
            message: None,
            suggestion: None,
        }
    }

    /// Append a related node
    pub fn with_related(mut self, node: impl Into<String>) -> Self {
        self.related_nodes.push(node.into());
        self
    }

    /// Set the human-readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the suggested remediation
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.key, self.node)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}
