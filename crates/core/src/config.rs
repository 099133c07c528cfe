//! TOML-based configuration for prconflict.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a usable configuration for a project checked out in the
//! current directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::project::MANIFEST_FILE_NAME;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Working tree, manifest and baseline settings.
    #[serde(default)]
    pub project: ProjectConfig,

    /// Metadata builder settings.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Component classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Conflict color settings.
    #[serde(default)]
    pub colors: ColorConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Location of the working tree and the revisions used to populate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Local clone whose working tree is checked out per change.
    #[serde(default = "default_repo_path")]
    pub repo_path: PathBuf,

    /// Project manifest, relative to `repo_path` unless absolute.
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Revision restored after the open changes are processed.
    #[serde(default = "default_baseline_ref")]
    pub baseline_ref: String,

    /// Remote that pull request heads are fetched from.
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}
fn default_manifest() -> PathBuf {
    PathBuf::from(MANIFEST_FILE_NAME)
}
fn default_baseline_ref() -> String {
    "main".into()
}
fn default_remote() -> String {
    "origin".into()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            repo_path: default_repo_path(),
            manifest: default_manifest(),
            baseline_ref: default_baseline_ref(),
            remote: default_remote(),
        }
    }
}

impl ProjectConfig {
    /// Manifest path resolved against the working tree.
    pub fn manifest_path(&self) -> PathBuf {
        if self.manifest.is_absolute() {
            self.manifest.clone()
        } else {
            self.repo_path.join(&self.manifest)
        }
    }

    /// File name of the manifest, used to skip it during classification.
    pub fn manifest_file_name(&self) -> String {
        self.manifest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| MANIFEST_FILE_NAME.to_string())
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Metadata builder settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Glob patterns for paths that are never classified.
    #[serde(default)]
    pub skip_patterns: Vec<String>,

    /// Also classify deleted files into the `deleted` bucket.
    #[serde(default)]
    pub include_deleted: bool,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Rule-based classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Fail classification for files missing from the working tree.
    #[serde(default = "default_true")]
    pub require_existing: bool,

    /// Extra rules, tried before the built-in ones.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            require_existing: true,
            rules: Vec::new(),
        }
    }
}

/// A classifier rule as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Component type reported for matching paths.
    #[serde(rename = "type")]
    pub component_type: String,

    #[serde(default)]
    pub suffix: Option<String>,

    #[serde(default)]
    pub bundle_dir: Option<String>,

    #[serde(default)]
    pub parent_dir: Option<String>,

    #[serde(default)]
    pub child_dir: Option<String>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Conflict color settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorConfig {
    /// Replaces the built-in palette when set.
    #[serde(default)]
    pub palette: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging settings. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append logs to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.baseline_ref.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "project.baseline_ref".into(),
                detail: "baseline ref must not be empty".into(),
            });
        }
        if self.project.remote.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "project.remote".into(),
                detail: "remote must not be empty".into(),
            });
        }
        if self.project.manifest.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "project.manifest".into(),
                detail: "manifest path must not be empty".into(),
            });
        }
        if let Some(palette) = &self.colors.palette {
            if palette.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "colors.palette".into(),
                    detail: "palette must contain at least one color".into(),
                });
            }
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        for rule in &self.classifier.rules {
            crate::classify::ClassifierRule::try_from(rule)?;
        }
        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r##"
[project]
repo_path = "/srv/checkouts/crm"
manifest = "sfdx-project.json"
baseline_ref = "develop"
remote = "upstream"

[metadata]
skip_patterns = ["**/jsconfig.json", "scripts/**"]
include_deleted = true

[classifier]
require_existing = false

[[classifier.rules]]
type = "ExternalServiceRegistration"
suffix = ".externalServiceRegistration-meta.xml"

[colors]
palette = ["#ff0000", "#00ff00"]

[logging]
level = "debug"
log_file = "/var/log/prconflict.log"
"##
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.project.baseline_ref, "develop");
        assert_eq!(config.project.remote, "upstream");
        assert_eq!(
            config.project.manifest_path(),
            PathBuf::from("/srv/checkouts/crm/sfdx-project.json")
        );
        assert!(config.metadata.include_deleted);
        assert_eq!(config.metadata.skip_patterns.len(), 2);
        assert!(!config.classifier.require_existing);
        assert_eq!(config.classifier.rules[0].component_type, "ExternalServiceRegistration");
        assert_eq!(config.colors.palette.as_ref().map(Vec::len), Some(2));
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.project.repo_path, PathBuf::from("."));
        assert_eq!(config.project.baseline_ref, "main");
        assert_eq!(config.project.remote, "origin");
        assert_eq!(config.project.manifest_file_name(), MANIFEST_FILE_NAME);
        assert!(config.classifier.require_existing);
        assert!(!config.metadata.include_deleted);
        assert!(config.colors.palette.is_none());
        assert_eq!(config.logging.level, "info");
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prconflict.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_and_validate(&path).expect("load failed");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/prconflict.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_empty_palette() {
        let mut config = AppConfig::default();
        config.colors.palette = Some(Vec::new());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "colors.palette"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "logging.level"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_rule() {
        let mut config = AppConfig::default();
        config.classifier.rules.push(RuleConfig {
            component_type: "Thing".into(),
            suffix: None,
            bundle_dir: None,
            parent_dir: None,
            child_dir: None,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "classifier.rules"
        ));
    }
}
