//! Error types for the prconflict core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.
//!
//! Only [`ReportError`] and [`ConfigError`] / [`ProjectError`] are fatal to a
//! run. Classification and materialization errors are recovered per file and
//! per change by the aggregation driver.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Project manifest errors
// ---------------------------------------------------------------------------

/// Errors loading the project manifest that defines package directories.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The manifest file does not exist.
    #[error("project manifest not found: {0}")]
    ManifestNotFound(String),

    /// The manifest is not valid JSON or has the wrong shape.
    #[error("failed to parse project manifest '{path}': {detail}")]
    ParseError { path: String, detail: String },

    /// Generic I/O wrapper.
    #[error("project manifest I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Classification errors
// ---------------------------------------------------------------------------

/// A single file path could not be mapped to components.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// No classifier rule recognizes the path.
    #[error("no component type recognized for '{0}'")]
    Unrecognized(String),

    /// The path does not exist in the materialized working tree.
    #[error("file '{path}' not found in working tree '{root}'")]
    NotFound { path: String, root: String },

    /// A rule matched but no component name could be derived.
    #[error("cannot derive component name from '{0}'")]
    InvalidName(String),
}

// ---------------------------------------------------------------------------
// Materialization errors
// ---------------------------------------------------------------------------

/// Errors making a revision's file tree available on disk.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The working tree path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A ref (branch, tag, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// The change identifier cannot be used inside a refspec.
    #[error("change id '{0}' is not a valid pull request number")]
    InvalidChangeId(String),

    /// The change head could not be fetched from the remote.
    #[error("fetch of change {change} failed: {detail}")]
    FetchFailed { change: String, detail: String },

    /// Generic I/O wrapper.
    #[error("materialize I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from the conflict detection subsystem.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// A color allocator needs at least one color to hand out.
    #[error("color palette must contain at least one color")]
    EmptyPalette,
}

// ---------------------------------------------------------------------------
// Report errors
// ---------------------------------------------------------------------------

/// Errors reading or writing the pull-request report document.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The input report does not exist.
    #[error("report not found: {0}")]
    NotFound(String),

    /// The input report is not valid JSON or has the wrong shape.
    #[error("failed to parse report '{path}': {detail}")]
    ParseError { path: String, detail: String },

    /// The annotated report could not be serialized.
    #[error("failed to serialize report: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// The temp file could not be moved over the destination.
    #[error("failed to persist report to '{path}': {detail}")]
    PersistFailed { path: String, detail: String },

    /// Generic I/O wrapper.
    #[error("report I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ClassifyError::Unrecognized("force-app/README.md".into());
        assert_eq!(
            err.to_string(),
            "no component type recognized for 'force-app/README.md'"
        );

        let err = MaterializeError::FetchFailed {
            change: "42".into(),
            detail: "unexpected http status code: 404".into(),
        };
        assert!(err.to_string().contains("change 42"));

        let err = ConfigError::InvalidValue {
            field: "colors.palette".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("colors.palette"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let err: CoreError = ConflictError::EmptyPalette.into();
        assert!(matches!(err, CoreError::Conflict(_)));

        let err: CoreError = ReportError::NotFound("prs.json".into()).into();
        assert!(matches!(err, CoreError::Report(_)));
        assert_eq!(err.to_string(), "report not found: prs.json");
    }
}
