//! Per-change metadata: package -> status -> deduplicated components.
//!
//! Files are classified one at a time. A file that cannot be classified is
//! logged and left out; it never fails the change.

use tracing::{debug, warn};

use crate::classify::ComponentClassifier;
use crate::config::MetadataConfig;
use crate::models::{ChangeFiles, Component, FileStatus, PackageMetadata};
use crate::project::{normalize_path, PackageResolver, MANIFEST_FILE_NAME};

// ---------------------------------------------------------------------------
// Skip policy
// ---------------------------------------------------------------------------

/// Paths that are never classified: the project manifest and configured globs.
#[derive(Debug, Clone)]
pub struct SkipPolicy {
    manifest_name: String,
    patterns: Vec<String>,
}

impl SkipPolicy {
    pub fn new(manifest_name: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            manifest_name: manifest_name.into(),
            patterns,
        }
    }

    /// `true` if `path` must not be classified.
    pub fn skips(&self, path: &str) -> bool {
        let normalized = normalize_path(path);
        if normalized.contains(self.manifest_name.as_str()) {
            return true;
        }
        self.patterns
            .iter()
            .any(|p| glob_match::glob_match(&p.replace('\\', "/"), &normalized))
    }
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self::new(MANIFEST_FILE_NAME, Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Build statistics
// ---------------------------------------------------------------------------

/// What happened to the files of one change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Files the classifier accepted.
    pub classified: usize,
    /// Files excluded by the skip policy.
    pub skipped: Vec<String>,
    /// Files the classifier rejected.
    pub failed: Vec<String>,
}

impl BuildStats {
    pub fn merge(&mut self, other: BuildStats) {
        self.classified += other.classified;
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Turns a change's file lists into [`PackageMetadata`].
pub struct MetadataBuilder<'a, C: ?Sized> {
    resolver: &'a PackageResolver,
    classifier: &'a C,
    skip: SkipPolicy,
    include_deleted: bool,
}

impl<'a, C: ComponentClassifier + ?Sized> MetadataBuilder<'a, C> {
    pub fn new(resolver: &'a PackageResolver, classifier: &'a C) -> Self {
        Self {
            resolver,
            classifier,
            skip: SkipPolicy::default(),
            include_deleted: false,
        }
    }

    pub fn with_skip_policy(mut self, skip: SkipPolicy) -> Self {
        self.skip = skip;
        self
    }

    /// Also classify deleted files into the `deleted` bucket.
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Builder configured from the `[metadata]` section.
    pub fn from_config(
        resolver: &'a PackageResolver,
        classifier: &'a C,
        config: &MetadataConfig,
        manifest_name: &str,
    ) -> Self {
        Self::new(resolver, classifier)
            .with_skip_policy(SkipPolicy::new(manifest_name, config.skip_patterns.clone()))
            .include_deleted(config.include_deleted)
    }

    /// Statuses whose files are classified.
    fn statuses(&self) -> &'static [FileStatus] {
        if self.include_deleted {
            &[FileStatus::Added, FileStatus::Modified, FileStatus::Deleted]
        } else {
            &FileStatus::COMPARED
        }
    }

    /// Build the metadata of one change.
    pub fn build(&self, files: &ChangeFiles) -> (PackageMetadata, BuildStats) {
        let mut metadata = PackageMetadata::new();
        let mut stats = BuildStats::default();
        for &status in self.statuses() {
            for path in files.paths(status) {
                self.add_file(path, status, &mut metadata, &mut stats);
            }
        }
        (metadata, stats)
    }

    fn add_file(
        &self,
        path: &str,
        status: FileStatus,
        metadata: &mut PackageMetadata,
        stats: &mut BuildStats,
    ) {
        if self.skip.skips(path) {
            debug!(path, "skipping file by policy");
            stats.skipped.push(path.to_string());
            return;
        }

        let classified = match status {
            FileStatus::Deleted => self.classifier.classify_deleted(path),
            FileStatus::Added | FileStatus::Modified => self.classifier.classify(path),
        };
        let components = match classified {
            Ok(components) => components,
            Err(e) => {
                warn!(path, status = %status, error = %e, "failed to classify file, skipping");
                stats.failed.push(path.to_string());
                return;
            }
        };
        stats.classified += 1;

        for descriptor in components {
            let package = self.resolver.resolve(path);
            let bucket = metadata
                .entry(package.to_string())
                .or_default()
                .bucket_mut(status);
            if bucket
                .iter()
                .any(|c| c.is(&descriptor.name, &descriptor.component_type))
            {
                continue;
            }
            debug!(
                path,
                package,
                status = %status,
                name = %descriptor.name,
                component_type = %descriptor.component_type,
                "component recorded"
            );
            bucket.push(Component::new(descriptor.name, descriptor.component_type));
        }
    }
}
