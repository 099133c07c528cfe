//! Working-tree materialization for changes and the baseline revision.

pub mod materializer;

pub use materializer::{GitMaterializer, Materializer, NoopMaterializer};
