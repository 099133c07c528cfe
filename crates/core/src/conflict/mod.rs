//! Cross-change conflict detection and conflict coloring.
//!
//! The conflict subsystem is responsible for:
//! 1. **Detection** -- finding components added or modified by more than one change.
//! 2. **Coloring** -- giving every conflicting component identity one stable color.

pub mod detector;
pub mod palette;

pub use detector::{ConflictDetector, DetectionSummary};
pub use palette::{ColorAllocator, ComponentKey, DEFAULT_PALETTE};
