//! prconflict core library.
//!
//! Annotates a pull-request report with the components each change touches,
//! grouped by package and file status, and cross-references components that
//! more than one change adds or modifies.

pub mod aggregator;
pub mod classify;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod git;
pub mod metadata;
pub mod models;
pub mod project;
pub mod report;

// Re-exports for convenience.
pub use aggregator::{Aggregator, RunSummary};
pub use classify::{ComponentClassifier, RuleClassifier};
pub use config::AppConfig;
pub use conflict::{ColorAllocator, ConflictDetector};
pub use errors::CoreError;
pub use git::{GitMaterializer, Materializer, NoopMaterializer};
pub use metadata::MetadataBuilder;
pub use models::{ChangeId, PrReport};
pub use project::PackageResolver;
