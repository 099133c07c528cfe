//! Conflict detection logic.
//!
//! Two changes conflict on a component when both add or modify a component
//! with the same `(name, type)` in the same package. Every ordered pair of
//! distinct changes is scanned, so each side of a conflict records its own
//! back-reference to the other.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use super::palette::{ColorAllocator, ComponentKey};
use crate::models::{Change, ChangeId, ConflictRef, FileStatus};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of one detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionSummary {
    /// Component occurrences with at least one conflict.
    pub conflicting_components: usize,
    /// Back-references recorded across all changes.
    pub conflict_refs: usize,
}

/// Package name -> `(type, name)` keys a change adds or modifies there.
type TouchedComponents = HashMap<String, HashSet<ComponentKey>>;

fn touched_components(change: &Change) -> TouchedComponents {
    change
        .metadata
        .iter()
        .map(|(package, buckets)| {
            let keys = buckets.compared().map(ComponentKey::of).collect();
            (package.clone(), keys)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Stateless conflict detector over a collection of annotated changes.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Annotate `conflicts` on every added/modified component in place.
    ///
    /// Changes are visited in identifier order, each against every other
    /// change in identifier order, so conflict lists and color assignment
    /// are deterministic. Existing `conflicts` are cleared first.
    pub fn detect(
        mut changes: Vec<(&ChangeId, &mut Change)>,
        colors: &mut ColorAllocator,
    ) -> DetectionSummary {
        changes.sort_by(|a, b| a.0.cmp(b.0));
        info!(changes = changes.len(), "detecting conflicts");

        let touched: Vec<(ChangeId, TouchedComponents)> = changes
            .iter()
            .map(|(id, change)| ((*id).clone(), touched_components(change)))
            .collect();

        let mut summary = DetectionSummary::default();

        for (current_id, current) in changes.iter_mut() {
            for buckets in current.metadata.values_mut() {
                for status in FileStatus::COMPARED {
                    for component in buckets.bucket_mut(status) {
                        component.conflicts.clear();
                    }
                }
            }

            for (other_id, other) in &touched {
                if other_id == *current_id {
                    continue;
                }
                for (package, buckets) in current.metadata.iter_mut() {
                    let Some(other_keys) = other.get(package) else {
                        continue;
                    };
                    for status in FileStatus::COMPARED {
                        for component in buckets.bucket_mut(status) {
                            let key = ComponentKey::of(component);
                            if !other_keys.contains(&key) {
                                continue;
                            }
                            let color = colors.color_for(&key);
                            debug!(
                                change = %current_id,
                                other = %other_id,
                                package = %package,
                                component_type = %key.component_type,
                                name = %key.name,
                                "conflict detected"
                            );
                            component.conflicts.push(ConflictRef {
                                change_id: other_id.clone(),
                                color,
                            });
                            summary.conflict_refs += 1;
                        }
                    }
                }
            }

            summary.conflicting_components += current.conflicting_components();
        }

        info!(
            conflicting_components = summary.conflicting_components,
            conflict_refs = summary.conflict_refs,
            "conflict detection complete"
        );
        summary
    }

    /// Convenience wrapper over a single map of changes.
    pub fn detect_map(
        changes: &mut BTreeMap<ChangeId, Change>,
        colors: &mut ColorAllocator,
    ) -> DetectionSummary {
        Self::detect(changes.iter_mut().collect(), colors)
    }
}
