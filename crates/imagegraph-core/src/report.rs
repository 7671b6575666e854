//! `report.json` layout, versioned
//!
//! Consumers match on `version.major`; only additive changes keep it.

use serde::{Deserialize, Serialize};
use crate::marker::{Marker, MarkerKey, Severity};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of markers
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of warnings
    pub warnings: usize,

    /// Number of info markers
    pub info: usize,

    /// Number of build configs analyzed
    pub build_configs_checked: usize,
}

/// Analysis report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// RFC 3339 creation time
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// All markers, in detector run order
    pub markers: Vec<Marker>,

    /// Free-form context such as the inventory digest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Report {
    /// Empty report stamped with the current time
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            markers: Vec::new(),
            metadata: None,
        }
    }

    /// Create a report from markers
    pub fn from_markers(markers: Vec<Marker>) -> Self {
        let mut report = Self::new();
        for marker in markers {
            report.add_marker(marker);
        }
        report
    }

    /// Record how many build configs were analyzed
    pub fn with_build_configs_checked(mut self, count: usize) -> Self {
        self.summary.build_configs_checked = count;
        self
    }

    /// Attach free-form metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Add a marker to the report
    pub fn add_marker(&mut self, marker: Marker) {
        match marker.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warning => self.summary.warnings += 1,
            Severity::Info => self.summary.info += 1,
        }

        self.summary.total += 1;
        self.markers.push(marker);
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Markers of one key, in report order
    pub fn markers_with_key(&self, key: MarkerKey) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(move |marker| marker.key == key)
    }

    /// Pretty-printed `report.json` contents
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let mut json = self.to_json().map_err(std::io::Error::other)?;
        json.push('\n');
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}
