//! Rule-based classifier for source-format project trees.
//!
//! Rules are tried in order and the first match wins:
//!
//! | Matcher | Example path | Component |
//! |---------|--------------|-----------|
//! | `Child` | `objects/Account/fields/Tier__c.field-meta.xml` | `Account.Tier__c` (CustomField) |
//! | `Bundle` | `lwc/invoiceList/invoiceList.js` | `invoiceList` (LightningComponentBundle) |
//! | `Suffix` | `classes/InvoiceService.cls` | `InvoiceService` (ApexClass) |
//!
//! With a working-tree root set, the file must exist under that root, so the
//! revision being classified has to be checked out first.

use std::path::{Path, PathBuf};

use tracing::trace;

use super::{ComponentClassifier, ComponentDescriptor};
use crate::config::{ClassifierConfig, RuleConfig};
use crate::errors::{ClassifyError, ConfigError};
use crate::project::normalize_path;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// How a rule recognizes a path and derives the component name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch {
    /// File name ends with the suffix; the name is the file name without it.
    Suffix(String),
    /// File lives inside `<dir>/<bundle>/`; the name is the bundle directory.
    Bundle(String),
    /// `<parent_dir>/<Parent>/<child_dir>/<Child><suffix>`; named `Parent.Child`.
    Child {
        parent_dir: String,
        child_dir: String,
        suffix: String,
    },
}

/// One classification rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRule {
    pub matcher: RuleMatch,
    pub component_type: String,
}

impl ClassifierRule {
    pub fn suffix(suffix: &str, component_type: &str) -> Self {
        Self {
            matcher: RuleMatch::Suffix(suffix.to_string()),
            component_type: component_type.to_string(),
        }
    }

    pub fn bundle(dir: &str, component_type: &str) -> Self {
        Self {
            matcher: RuleMatch::Bundle(dir.to_string()),
            component_type: component_type.to_string(),
        }
    }

    pub fn child(parent_dir: &str, child_dir: &str, suffix: &str, component_type: &str) -> Self {
        Self {
            matcher: RuleMatch::Child {
                parent_dir: parent_dir.to_string(),
                child_dir: child_dir.to_string(),
                suffix: suffix.to_string(),
            },
            component_type: component_type.to_string(),
        }
    }

    /// Component name for `segments`, or `None` if the rule does not apply.
    ///
    /// `Some("")` means the rule matched but left nothing to name.
    fn match_segments(&self, segments: &[&str]) -> Option<String> {
        let file_name = segments.last()?;
        match &self.matcher {
            RuleMatch::Suffix(suffix) => file_name.strip_suffix(suffix.as_str()).map(str::to_string),
            RuleMatch::Bundle(dir) => segments
                .iter()
                .position(|s| s == dir)
                .filter(|&i| i + 2 < segments.len())
                .map(|i| segments[i + 1].to_string()),
            RuleMatch::Child {
                parent_dir,
                child_dir,
                suffix,
            } => {
                let n = segments.len();
                if n < 4 || segments[n - 2] != child_dir || segments[n - 4] != parent_dir {
                    return None;
                }
                let child = file_name.strip_suffix(suffix.as_str())?;
                if child.is_empty() {
                    return Some(String::new());
                }
                Some(format!("{}.{}", segments[n - 3], child))
            }
        }
    }
}

impl TryFrom<&RuleConfig> for ClassifierRule {
    type Error = ConfigError;

    fn try_from(rule: &RuleConfig) -> Result<Self, Self::Error> {
        let invalid = |detail: &str| ConfigError::InvalidValue {
            field: "classifier.rules".into(),
            detail: format!("rule for type '{}': {}", rule.component_type, detail),
        };

        if rule.component_type.is_empty() {
            return Err(invalid("type must not be empty"));
        }

        match (&rule.suffix, &rule.bundle_dir, &rule.parent_dir, &rule.child_dir) {
            (Some(suffix), None, Some(parent), Some(child)) => {
                Ok(Self::child(parent, child, suffix, &rule.component_type))
            }
            (Some(suffix), None, None, None) if !suffix.is_empty() => {
                Ok(Self::suffix(suffix, &rule.component_type))
            }
            (None, Some(dir), None, None) if !dir.is_empty() => {
                Ok(Self::bundle(dir, &rule.component_type))
            }
            _ => Err(invalid(
                "set either `suffix`, `bundle_dir`, or `suffix` with `parent_dir` and `child_dir`",
            )),
        }
    }
}

/// Built-in rules for common source-format metadata types.
pub fn default_rules() -> Vec<ClassifierRule> {
    const CHILDREN: &[(&str, &str, &str)] = &[
        ("fields", ".field-meta.xml", "CustomField"),
        ("validationRules", ".validationRule-meta.xml", "ValidationRule"),
        ("recordTypes", ".recordType-meta.xml", "RecordType"),
        ("listViews", ".listView-meta.xml", "ListView"),
        ("compactLayouts", ".compactLayout-meta.xml", "CompactLayout"),
        ("webLinks", ".webLink-meta.xml", "WebLink"),
        ("fieldSets", ".fieldSet-meta.xml", "FieldSet"),
        ("businessProcesses", ".businessProcess-meta.xml", "BusinessProcess"),
    ];
    const BUNDLES: &[(&str, &str)] = &[
        ("lwc", "LightningComponentBundle"),
        ("aura", "AuraDefinitionBundle"),
    ];
    const SUFFIXES: &[(&str, &str)] = &[
        (".cls", "ApexClass"),
        (".cls-meta.xml", "ApexClass"),
        (".trigger", "ApexTrigger"),
        (".trigger-meta.xml", "ApexTrigger"),
        (".page", "ApexPage"),
        (".page-meta.xml", "ApexPage"),
        (".component", "ApexComponent"),
        (".component-meta.xml", "ApexComponent"),
        (".object-meta.xml", "CustomObject"),
        (".flow-meta.xml", "Flow"),
        (".layout-meta.xml", "Layout"),
        (".permissionset-meta.xml", "PermissionSet"),
        (".profile-meta.xml", "Profile"),
        (".labels-meta.xml", "CustomLabels"),
        (".tab-meta.xml", "CustomTab"),
        (".app-meta.xml", "CustomApplication"),
        (".flexipage-meta.xml", "FlexiPage"),
        (".resource", "StaticResource"),
        (".resource-meta.xml", "StaticResource"),
        (".md-meta.xml", "CustomMetadata"),
        (".customPermission-meta.xml", "CustomPermission"),
        (".globalValueSet-meta.xml", "GlobalValueSet"),
        (".remoteSite-meta.xml", "RemoteSiteSetting"),
        (".namedCredential-meta.xml", "NamedCredential"),
        (".queue-meta.xml", "Queue"),
        (".group-meta.xml", "Group"),
    ];

    let children = CHILDREN
        .iter()
        .map(|(dir, suffix, ty)| ClassifierRule::child("objects", dir, suffix, ty));
    let bundles = BUNDLES.iter().map(|(dir, ty)| ClassifierRule::bundle(dir, ty));
    let suffixes = SUFFIXES.iter().map(|(suffix, ty)| ClassifierRule::suffix(suffix, ty));
    children.chain(bundles).chain(suffixes).collect()
}

// ---------------------------------------------------------------------------
// RuleClassifier
// ---------------------------------------------------------------------------

/// Classifies paths with an ordered rule table.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: Vec<ClassifierRule>,
    /// Working tree the paths are relative to. `None` skips the existence check.
    root: Option<PathBuf>,
}

impl RuleClassifier {
    pub fn new(rules: Vec<ClassifierRule>, root: Option<PathBuf>) -> Self {
        Self { rules, root }
    }

    /// Built-in rules only, without an existence check.
    pub fn with_default_rules() -> Self {
        Self::new(default_rules(), None)
    }

    /// Configured rules first, then the built-in ones.
    pub fn from_config(config: &ClassifierConfig, repo_root: &Path) -> Result<Self, ConfigError> {
        let mut rules = config
            .rules
            .iter()
            .map(ClassifierRule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        rules.extend(default_rules());
        let root = config.require_existing.then(|| repo_root.to_path_buf());
        Ok(Self::new(rules, root))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// First matching rule for an already normalized path.
    fn match_rules(&self, normalized: String) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        for rule in &self.rules {
            if let Some(name) = rule.match_segments(&segments) {
                if name.is_empty() {
                    return Err(ClassifyError::InvalidName(normalized));
                }
                trace!(path = %normalized, name = %name, component_type = %rule.component_type, "classified");
                return Ok(vec![ComponentDescriptor::new(name, rule.component_type.clone())]);
            }
        }

        Err(ClassifyError::Unrecognized(normalized))
    }
}

impl ComponentClassifier for RuleClassifier {
    fn classify(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
        let normalized = normalize_path(path);

        if let Some(root) = &self.root {
            if !root.join(&normalized).is_file() {
                return Err(ClassifyError::NotFound {
                    path: normalized,
                    root: root.display().to_string(),
                });
            }
        }

        self.match_rules(normalized)
    }

    fn classify_deleted(&self, path: &str) -> Result<Vec<ComponentDescriptor>, ClassifyError> {
        self.match_rules(normalize_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_one(path: &str) -> ComponentDescriptor {
        let mut found = RuleClassifier::with_default_rules().classify(path).unwrap();
        assert_eq!(found.len(), 1, "expected one component for {path}");
        found.remove(0)
    }

    #[test]
    fn test_suffix_rules() {
        let c = classify_one("force-app/main/default/classes/InvoiceService.cls");
        assert_eq!(c, ComponentDescriptor::new("InvoiceService", "ApexClass"));

        let c = classify_one("force-app/main/default/classes/InvoiceService.cls-meta.xml");
        assert_eq!(c, ComponentDescriptor::new("InvoiceService", "ApexClass"));

        let c = classify_one("src/customMetadata/Routing.Default.md-meta.xml");
        assert_eq!(c, ComponentDescriptor::new("Routing.Default", "CustomMetadata"));
    }

    #[test]
    fn test_child_rule() {
        let c = classify_one("src/core/objects/Account/fields/Tier__c.field-meta.xml");
        assert_eq!(c, ComponentDescriptor::new("Account.Tier__c", "CustomField"));

        let c = classify_one("src/core/objects/Account/Account.object-meta.xml");
        assert_eq!(c, ComponentDescriptor::new("Account", "CustomObject"));
    }

    #[test]
    fn test_bundle_rule() {
        let c = classify_one("force-app\\main\\default\\lwc\\invoiceList\\invoiceList.html");
        assert_eq!(c, ComponentDescriptor::new("invoiceList", "LightningComponentBundle"));

        let c = classify_one("force-app/main/default/aura/Banner/BannerController.js");
        assert_eq!(c, ComponentDescriptor::new("Banner", "AuraDefinitionBundle"));
    }

    #[test]
    fn test_unrecognized_path() {
        let classifier = RuleClassifier::with_default_rules();
        assert!(matches!(
            classifier.classify("README.md"),
            Err(ClassifyError::Unrecognized(_))
        ));
        // A bare bundle directory is not a file inside a bundle.
        assert!(matches!(
            classifier.classify("lwc/invoiceList"),
            Err(ClassifyError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let classifier = RuleClassifier::with_default_rules();
        assert!(matches!(
            classifier.classify("classes/.cls"),
            Err(ClassifyError::InvalidName(_))
        ));
    }

    #[test]
    fn test_require_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let classes = tmp.path().join("src/classes");
        std::fs::create_dir_all(&classes).unwrap();
        std::fs::write(classes.join("Present.cls"), "public class Present {}").unwrap();

        let classifier = RuleClassifier::new(default_rules(), Some(tmp.path().to_path_buf()));
        assert_eq!(classifier.classify("src/classes/Present.cls").unwrap().len(), 1);
        assert!(matches!(
            classifier.classify("src/classes/Gone.cls"),
            Err(ClassifyError::NotFound { .. })
        ));
    }

    #[test]
    fn test_deleted_path_skips_existence_check() {
        let tmp = tempfile::tempdir().unwrap();
        let classifier = RuleClassifier::from_config(&ClassifierConfig::default(), tmp.path()).unwrap();

        assert!(matches!(
            classifier.classify("src/classes/Gone.cls"),
            Err(ClassifyError::NotFound { .. })
        ));
        let found = classifier.classify_deleted("src/classes/Gone.cls").unwrap();
        assert_eq!(found, vec![ComponentDescriptor::new("Gone", "ApexClass")]);
        assert!(matches!(
            classifier.classify_deleted("src/README.md"),
            Err(ClassifyError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_configured_rules_take_precedence() {
        let config = ClassifierConfig {
            require_existing: false,
            rules: vec![RuleConfig {
                component_type: "ApexTestSuite".into(),
                suffix: Some("Test.cls".into()),
                bundle_dir: None,
                parent_dir: None,
                child_dir: None,
            }],
        };
        let classifier = RuleClassifier::from_config(&config, Path::new(".")).unwrap();
        assert_eq!(classifier.rule_count(), default_rules().len() + 1);
        let found = classifier.classify("classes/InvoiceTest.cls").unwrap();
        assert_eq!(found[0], ComponentDescriptor::new("Invoice", "ApexTestSuite"));
    }

    #[test]
    fn test_invalid_rule_config() {
        let rule = RuleConfig {
            component_type: "Thing".into(),
            suffix: None,
            bundle_dir: None,
            parent_dir: Some("objects".into()),
            child_dir: None,
        };
        assert!(matches!(
            ClassifierRule::try_from(&rule),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
