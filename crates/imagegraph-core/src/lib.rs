//! imagegraph core
//!
//! Core domain model with stable, versioned types.
//! Never rename marker keys - they are part of the public API.

pub mod marker;
pub mod report;
pub mod config;

pub use marker::{Marker, MarkerKey, Severity};
pub use report::{Report, ReportSummary, ReportVersion};
pub use config::{Config, ConfigError, DetectorConfig, SeverityThreshold, AllowlistRules};
