//! Domain model types for the pull-request report.
//!
//! The report is produced by an external collector and annotated in place:
//! every change gains a `metadata` map of package -> status bucket ->
//! components, and components touched by more than one change carry
//! `conflicts` back-references. Fields this crate does not understand are
//! carried through untouched.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

// ---------------------------------------------------------------------------
// Change identifier
// ---------------------------------------------------------------------------

/// Identifier of a change (pull request number, as a JSON object key).
///
/// Ordering is numeric for numeric identifiers, which sort before any
/// non-numeric identifier; the rest compare lexically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

impl ChangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value, if the identifier is a plain pull request number.
    pub fn number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for ChangeId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ChangeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for ChangeId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Whether a change is still open or was closed within the retention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Open,
    Closed,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// The bucket a changed file (and its components) falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
}

impl FileStatus {
    /// Buckets whose components take part in conflict detection.
    pub const COMPARED: [FileStatus; 2] = [FileStatus::Added, FileStatus::Modified];
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Files and components
// ---------------------------------------------------------------------------

/// Changed file paths of one change, partitioned by status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeFiles {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub deleted: Vec<String>,
}

impl ChangeFiles {
    pub fn paths(&self, status: FileStatus) -> &[String] {
        match status {
            FileStatus::Added => &self.added,
            FileStatus::Modified => &self.modified,
            FileStatus::Deleted => &self.deleted,
        }
    }
}

/// Back-reference from a component occurrence to another change touching a
/// component with the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRef {
    #[serde(rename = "changeId", alias = "prNumber")]
    pub change_id: ChangeId,
    pub color: String,
}

/// A named, typed structural unit touched by a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub conflicts: Vec<ConflictRef>,
}

impl Component {
    pub fn new(name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
            conflicts: Vec::new(),
        }
    }

    /// Whether this occurrence has the identity `(name, type)`.
    pub fn is(&self, name: &str, component_type: &str) -> bool {
        self.name == name && self.component_type == component_type
    }
}

/// Components of one package, split by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageBuckets {
    #[serde(default)]
    pub added: Vec<Component>,
    #[serde(default)]
    pub modified: Vec<Component>,
    #[serde(default)]
    pub deleted: Vec<Component>,
}

impl PackageBuckets {
    pub fn bucket(&self, status: FileStatus) -> &[Component] {
        match status {
            FileStatus::Added => &self.added,
            FileStatus::Modified => &self.modified,
            FileStatus::Deleted => &self.deleted,
        }
    }

    pub fn bucket_mut(&mut self, status: FileStatus) -> &mut Vec<Component> {
        match status {
            FileStatus::Added => &mut self.added,
            FileStatus::Modified => &mut self.modified,
            FileStatus::Deleted => &mut self.deleted,
        }
    }

    /// Components that take part in conflict detection.
    pub fn compared(&self) -> impl Iterator<Item = &Component> {
        self.added.iter().chain(self.modified.iter())
    }
}

/// Package name -> status buckets for one change.
pub type PackageMetadata = BTreeMap<String, PackageBuckets>;

// ---------------------------------------------------------------------------
// Change and report
// ---------------------------------------------------------------------------

/// One pull request as written by the collector, plus its metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Change {
    /// Collector fields this crate does not interpret (title, author, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Absent when the collector could not list the files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<ChangeFiles>,

    #[serde(default)]
    pub metadata: PackageMetadata,
}

impl Change {
    pub fn with_files(files: ChangeFiles) -> Self {
        Self {
            files: Some(files),
            ..Self::default()
        }
    }

    /// Number of component occurrences with at least one conflict.
    pub fn conflicting_components(&self) -> usize {
        self.metadata
            .values()
            .flat_map(|b| b.compared())
            .filter(|c| !c.conflicts.is_empty())
            .count()
    }
}

/// The document exchanged with the collector and the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrReport {
    #[serde(rename = "openPrs", default)]
    pub open_prs: BTreeMap<ChangeId, Change>,

    #[serde(rename = "closedPrs", default)]
    pub closed_prs: BTreeMap<ChangeId, Change>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PrReport {
    /// All changes for conflict detection, ordered by identifier.
    ///
    /// An identifier present in both maps resolves to the closed entry.
    pub fn combined_mut(&mut self) -> Vec<(&ChangeId, &mut Change)> {
        let mut combined: BTreeMap<&ChangeId, &mut Change> = BTreeMap::new();
        for (id, change) in self.open_prs.iter_mut() {
            combined.insert(id, change);
        }
        for (id, change) in self.closed_prs.iter_mut() {
            if combined.insert(id, change).is_some() {
                warn!(change = %id, "change is both open and closed, using closed entry");
            }
        }
        combined.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.open_prs.len() + self.closed_prs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_prs.is_empty() && self.closed_prs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_id_ordering() {
        let mut ids: Vec<ChangeId> = ["10", "9", "abc", "100", "2"]
            .iter()
            .map(|s| ChangeId::from(*s))
            .collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(sorted, vec!["2", "9", "10", "100", "abc"]);
    }

    #[test]
    fn test_change_id_leading_zero_is_distinct() {
        let a = ChangeId::from("7");
        let b = ChangeId::from("07");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_report_preserves_collector_fields() {
        let json = r#"{
            "openPrs": {
                "12": {
                    "issueTitle": "Add invoice trigger",
                    "labels": [{"key": "core"}],
                    "files": {"added": ["force-app/main/default/triggers/Invoice.trigger"], "modified": [], "deleted": []}
                }
            },
            "closedPrs": {},
            "generatedBy": "collector"
        }"#;
        let report: PrReport = serde_json::from_str(json).unwrap();
        let change = &report.open_prs[&ChangeId::from("12")];
        assert_eq!(change.extra["issueTitle"], "Add invoice trigger");
        assert!(change.metadata.is_empty());
        assert_eq!(report.extra["generatedBy"], "collector");

        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["openPrs"]["12"]["labels"][0]["key"], "core");
        assert_eq!(out["generatedBy"], "collector");
        assert!(out["openPrs"]["12"]["metadata"].is_object());
    }

    #[test]
    fn test_missing_files_stays_absent() {
        let report: PrReport =
            serde_json::from_str(r#"{"openPrs": {"3": {"branch": "x"}}, "closedPrs": {}}"#).unwrap();
        let change = &report.open_prs[&ChangeId::from("3")];
        assert!(change.files.is_none());
        let out = serde_json::to_value(change).unwrap();
        assert!(out.get("files").is_none());
    }

    #[test]
    fn test_conflict_ref_accepts_legacy_key() {
        let r: ConflictRef = serde_json::from_str(r##"{"prNumber": "5", "color": "#e6194B"}"##).unwrap();
        assert_eq!(r.change_id, ChangeId::from("5"));
        let out = serde_json::to_value(&r).unwrap();
        assert_eq!(out["changeId"], "5");
    }

    #[test]
    fn test_combined_prefers_closed_entry() {
        let mut report = PrReport::default();
        let mut open = Change::default();
        open.extra.insert("state".into(), Value::from("open"));
        let mut closed = Change::default();
        closed.extra.insert("state".into(), Value::from("closed"));
        report.open_prs.insert(ChangeId::from("4"), open);
        report.closed_prs.insert(ChangeId::from("4"), closed);
        report.open_prs.insert(ChangeId::from("1"), Change::default());

        let combined = report.combined_mut();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].0.as_str(), "1");
        assert_eq!(combined[1].1.extra["state"], "closed");
    }
}
