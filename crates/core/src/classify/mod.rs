//! Classification of file paths into named, typed components.
//!
//! The metadata builder only depends on the [`ComponentClassifier`] trait.
//! [`RuleClassifier`] is the implementation used by the CLI for
//! source-format project trees.

pub mod rules;

pub use rules::{ClassifierRule, RuleClassifier, RuleMatch};

use crate::errors::ClassifyError;

/// A component identity produced by a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentDescriptor {
    pub name: String,
    pub component_type: String,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
        }
    }
}

/// Maps one file path to the components it defines.
///
/// A path may define zero, one or several components. Failure is per path;
/// callers are expected to log it and move on.
pub trait ComponentClassifier {
    fn classify(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError>;

    /// Classify a path the change deletes. The file is gone from every
    /// checked-out tree, so implementations must not require it on disk.
    fn classify_deleted(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
        self.classify(path)
    }
}

impl<T: ComponentClassifier + ?Sized> ComponentClassifier for &T {
    fn classify(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
        (**self).classify(path)
    }

    fn classify_deleted(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
        (**self).classify_deleted(path)
    }
}

impl<T: ComponentClassifier + ?Sized> ComponentClassifier for Box<T> {
    fn classify(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
        (**self).classify(path)
    }

    fn classify_deleted(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
        (**self).classify_deleted(path)
    }
}
