//! Configuration schema (imagegraph.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use crate::marker::{MarkerKey, Severity};

/// Severity overrides for specific marker keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of marker key to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a marker key, or default
    pub fn get_severity(&self, key: MarkerKey, default: Severity) -> Severity {
        self.overrides
            .get(key.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a key
    pub fn set_override(&mut self, key: MarkerKey, severity: Severity) {
        self.overrides.insert(key.as_str().to_string(), severity);
    }

    /// Override keys that do not name a registered marker key
    pub fn unknown_keys(&self) -> Vec<&str> {
        let mut unknown: Vec<&str> = self
            .overrides
            .keys()
            .map(String::as_str)
            .filter(|key| MarkerKey::from_key_str(key).is_none())
            .collect();
        unknown.sort_unstable();
        unknown
    }
}

/// Which detectors run during analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Flag build configs whose output cannot be pushed
    #[serde(default = "default_true")]
    pub unpushable: bool,

    /// Flag build configs that take part in a build cycle
    #[serde(default = "default_true")]
    pub circular: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            unpushable: true,
            circular: true,
        }
    }
}

/// Allowlist rules for specific build configs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowlistRules {
    /// Never report markers for these build configs (`namespace/name` glob patterns)
    #[serde(default)]
    pub skip_build_configs: Vec<String>,
}

impl AllowlistRules {
    /// Whether markers for `build_config` (`namespace/name`) are suppressed
    pub fn is_build_config_skipped(&self, build_config: &str) -> bool {
        self.skip_build_configs
            .iter()
            .any(|pattern| glob_match(pattern, build_config))
    }
}

/// Contents of `imagegraph.toml`
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub severity: SeverityThreshold,

    #[serde(default)]
    pub detectors: DetectorConfig,

    #[serde(default)]
    pub allowlist: AllowlistRules,
}

impl Config {
    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse config from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml)?)
    }

    /// Write the config back out as TOML
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(self)?;
        std::fs::write(path, rendered).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Match `text` against a pattern where each `*` stands for any run of characters
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut segments = pattern.split('*');
    let Some(first) = segments.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let middle: Vec<&str> = segments.collect();
    let Some((last, inner)) = middle.split_last() else {
        // No wildcard at all
        return rest.is_empty();
    };

    for segment in inner {
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Config loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.detectors.unpushable);
        assert!(config.detectors.circular);
        assert!(config.allowlist.skip_build_configs.is_empty());
    }

    #[test]
    fn severity_override() {
        let mut threshold = SeverityThreshold::default();
        threshold.set_override(MarkerKey::CircularBuildErr, Severity::Warning);

        assert_eq!(
            threshold.get_severity(MarkerKey::CircularBuildErr, Severity::Error),
            Severity::Warning
        );
        assert_eq!(
            threshold.get_severity(MarkerKey::MissingImageStreamErr, Severity::Error),
            Severity::Error
        );
    }

    #[test]
    fn parse_full_config() {
        let config = Config::from_toml(
            r#"
            [severity.overrides]
            MissingRequiredRegistryErr = "warning"
            NotAKey = "info"

            [detectors]
            circular = false

            [allowlist]
            skip_build_configs = ["sandbox/*"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.severity.get_severity(MarkerKey::MissingRequiredRegistryErr, Severity::Error),
            Severity::Warning
        );
        assert_eq!(config.severity.unknown_keys(), vec!["NotAKey"]);
        assert!(config.detectors.unpushable);
        assert!(!config.detectors.circular);
        assert!(config.allowlist.is_build_config_skipped("sandbox/app"));
        assert!(!config.allowlist.is_build_config_skipped("prod/app"));
    }

    #[test]
    fn invalid_severity_is_parse_error() {
        let err = Config::from_toml("[severity.overrides]\nCircularBuildErr = \"fatal\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut config = Config::default();
        config.allowlist.skip_build_configs = vec!["ns/app".to_string()];
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.allowlist, parsed.allowlist);
        assert_eq!(config.detectors, parsed.detectors);
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("imagegraph-config-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.detectors.unpushable = false;
        config.severity.set_override(MarkerKey::MissingImageStreamErr, Severity::Info);

        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = Config::from_file(Path::new("/nonexistent/imagegraph.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/imagegraph.toml"));
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("ns/*", "ns/app"));
        assert!(glob_match("*/app", "ns/app"));
        assert!(glob_match("*/app-*", "ns/app-v2"));
        assert!(glob_match("ns/app", "ns/app"));
        assert!(!glob_match("ns/app", "ns/app2"));
        assert!(!glob_match("ns/*", "other/app"));
        assert!(!glob_match("ab*ba", "aba"));
    }
}
