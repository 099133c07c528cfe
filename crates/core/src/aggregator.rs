//! Aggregation driver: metadata for every change, then conflict detection.
//!
//! Open changes are processed first, each after checking out its head. The
//! baseline is then restored and closed changes are classified against it.
//! All tree-mutating steps run strictly one after another because there is
//! a single working tree.

use std::path::Path;

use tracing::{error, info, instrument, warn};

use crate::classify::ComponentClassifier;
use crate::conflict::{ColorAllocator, ConflictDetector, DetectionSummary};
use crate::errors::ReportError;
use crate::git::Materializer;
use crate::metadata::{BuildStats, MetadataBuilder};
use crate::models::{Change, ChangeId, ChangeStatus, PrReport};
use crate::report;

/// Counters and gaps of one run, for operators auditing the output.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub open_changes: usize,
    pub closed_changes: usize,
    /// Open changes whose head could not be checked out (empty metadata).
    pub checkout_failures: Vec<ChangeId>,
    /// Whether the baseline checkout succeeded.
    pub baseline_restored: bool,
    /// Changes without a file list from the collector.
    pub missing_files: Vec<ChangeId>,
    /// File outcomes summed over all changes.
    pub files: BuildStats,
    pub detection: DetectionSummary,
}

/// Runs the augmentation pipeline over a [`PrReport`].
pub struct Aggregator<'a, M, C: ?Sized> {
    materializer: &'a M,
    builder: MetadataBuilder<'a, C>,
}

impl<'a, M, C> Aggregator<'a, M, C>
where
    M: Materializer,
    C: ComponentClassifier + ?Sized,
{
    pub fn new(materializer: &'a M, builder: MetadataBuilder<'a, C>) -> Self {
        Self {
            materializer,
            builder,
        }
    }

    /// Annotate every change in `report` with metadata and conflicts.
    ///
    /// Never fails: checkout and classification problems are logged and
    /// recorded in the returned summary.
    #[instrument(skip_all, fields(open = report.open_prs.len(), closed = report.closed_prs.len()))]
    pub async fn run(&self, report: &mut PrReport, colors: &mut ColorAllocator) -> RunSummary {
        let mut summary = RunSummary::default();

        for (id, change) in report.open_prs.iter_mut() {
            summary.open_changes += 1;
            if let Err(e) = self.materializer.checkout_change(id).await {
                error!(change = %id, error = %e, "failed to check out change, leaving metadata empty");
                change.metadata.clear();
                summary.checkout_failures.push(id.clone());
                continue;
            }
            self.build_change(id, ChangeStatus::Open, change, &mut summary);
        }

        match self.materializer.checkout_baseline().await {
            Ok(()) => summary.baseline_restored = true,
            Err(e) => error!(error = %e, "failed to restore baseline, closed changes use the current tree"),
        }

        for (id, change) in report.closed_prs.iter_mut() {
            summary.closed_changes += 1;
            self.build_change(id, ChangeStatus::Closed, change, &mut summary);
        }

        summary.detection = ConflictDetector::detect(report.combined_mut(), colors);

        info!(
            open = summary.open_changes,
            closed = summary.closed_changes,
            checkout_failures = summary.checkout_failures.len(),
            classification_failures = summary.files.failed.len(),
            conflict_refs = summary.detection.conflict_refs,
            "augmentation complete"
        );
        summary
    }

    /// Load `input`, annotate it and write it to `output`.
    ///
    /// Only reading and writing the report can fail.
    pub async fn run_file(
        &self,
        input: &Path,
        output: &Path,
        colors: &mut ColorAllocator,
    ) -> Result<RunSummary, ReportError> {
        let mut prs = report::load(input)?;
        let summary = self.run(&mut prs, colors).await;
        report::save(&prs, output)?;
        Ok(summary)
    }

    fn build_change(
        &self,
        id: &ChangeId,
        status: ChangeStatus,
        change: &mut Change,
        summary: &mut RunSummary,
    ) {
        let Some(files) = &change.files else {
            warn!(change = %id, status = %status, "change has no file list, leaving metadata empty");
            change.metadata.clear();
            summary.missing_files.push(id.clone());
            return;
        };

        let (metadata, stats) = self.builder.build(files);
        info!(
            change = %id,
            status = %status,
            packages = metadata.len(),
            classified = stats.classified,
            failed = stats.failed.len(),
            "metadata built"
        );
        change.metadata = metadata;
        summary.files.merge(stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    use crate::classify::ComponentDescriptor;
    use crate::errors::{ClassifyError, MaterializeError};
    use crate::models::{ChangeFiles, FileStatus};
    use crate::project::{PackageDirectory, PackageResolver};

    /// Records calls; fails checkout for the listed changes.
    #[derive(Default)]
    struct RecordingMaterializer {
        failing: HashSet<ChangeId>,
        calls: RefCell<Vec<String>>,
    }

    impl Materializer for RecordingMaterializer {
        async fn checkout_change(&self, change: &ChangeId) -> Result<(), MaterializeError> {
            self.calls.borrow_mut().push(format!("change:{change}"));
            if self.failing.contains(change) {
                return Err(MaterializeError::RefNotFound(change.to_string()));
            }
            Ok(())
        }

        async fn checkout_baseline(&self) -> Result<(), MaterializeError> {
            self.calls.borrow_mut().push("baseline".into());
            Ok(())
        }
    }

    /// `<dir>/<Name>.cls` -> ApexClass `Name`; anything else fails.
    struct ClassClassifier;

    impl ComponentClassifier for ClassClassifier {
        fn classify(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
            path.rsplit('/')
                .next()
                .and_then(|f| f.strip_suffix(".cls"))
                .map(|name| vec![ComponentDescriptor::new(name, "ApexClass")])
                .ok_or_else(|| ClassifyError::Unrecognized(path.to_string()))
        }
    }

    fn modified(paths: &[&str]) -> Change {
        Change::with_files(ChangeFiles {
            modified: paths.iter().map(|p| p.to_string()).collect(),
            ..ChangeFiles::default()
        })
    }

    fn resolver() -> PackageResolver {
        PackageResolver::new(vec![PackageDirectory {
            path: "src/core".into(),
            package: Some("core".into()),
        }])
    }

    #[tokio::test]
    async fn test_run_orders_checkouts_and_detects() {
        let mut report = PrReport::default();
        report.open_prs.insert("2".into(), modified(&["src/core/Foo.cls"]));
        report.open_prs.insert("1".into(), modified(&["src/core/Foo.cls", "src/core/notes.txt"]));
        report.closed_prs.insert("9".into(), modified(&["src/core/Foo.cls"]));

        let materializer = RecordingMaterializer::default();
        let resolver = resolver();
        let builder = MetadataBuilder::new(&resolver, &ClassClassifier);
        let aggregator = Aggregator::new(&materializer, builder);
        let summary = aggregator.run(&mut report, &mut ColorAllocator::default()).await;

        assert_eq!(
            *materializer.calls.borrow(),
            vec!["change:1", "change:2", "baseline"]
        );
        assert_eq!(summary.open_changes, 2);
        assert_eq!(summary.closed_changes, 1);
        assert!(summary.baseline_restored);
        assert_eq!(summary.files.failed, vec!["src/core/notes.txt".to_string()]);
        assert_eq!(summary.detection.conflict_refs, 6);

        let foo = &report.open_prs[&ChangeId::from("1")].metadata["core"].modified[0];
        let refs: Vec<&str> = foo.conflicts.iter().map(|r| r.change_id.as_str()).collect();
        assert_eq!(refs, vec!["2", "9"]);
    }

    #[tokio::test]
    async fn test_checkout_failure_leaves_change_empty() {
        let mut report = PrReport::default();
        report.open_prs.insert("1".into(), modified(&["src/core/Foo.cls"]));
        report.open_prs.insert("2".into(), modified(&["src/core/Foo.cls"]));

        let materializer = RecordingMaterializer {
            failing: HashSet::from([ChangeId::from("2")]),
            ..Default::default()
        };
        let resolver = resolver();
        let aggregator = Aggregator::new(&materializer, MetadataBuilder::new(&resolver, &ClassClassifier));
        let summary = aggregator.run(&mut report, &mut ColorAllocator::default()).await;

        assert_eq!(summary.checkout_failures, vec![ChangeId::from("2")]);
        assert!(report.open_prs[&ChangeId::from("2")].metadata.is_empty());
        let one = &report.open_prs[&ChangeId::from("1")].metadata["core"];
        assert!(one.bucket(FileStatus::Modified)[0].conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_list_is_tolerated() {
        let mut report = PrReport::default();
        report.closed_prs.insert("4".into(), Change::default());

        let materializer = RecordingMaterializer::default();
        let resolver = resolver();
        let aggregator = Aggregator::new(&materializer, MetadataBuilder::new(&resolver, &ClassClassifier));
        let summary = aggregator.run(&mut report, &mut ColorAllocator::default()).await;

        assert_eq!(summary.missing_files, vec![ChangeId::from("4")]);
        assert!(report.closed_prs[&ChangeId::from("4")].metadata.is_empty());
    }
}
