//! Package resolution from the project manifest.
//!
//! The manifest (`sfdx-project.json`) lists package directories in priority
//! order. A file belongs to the first directory whose root path occurs in the
//! file's normalized path; anything else belongs to [`UNKNOWN_PACKAGE`].

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::ProjectError;

/// Package name reported for paths outside every package directory.
pub const UNKNOWN_PACKAGE: &str = "Unknown Package";

/// File name of the project manifest. Never a component itself.
pub const MANIFEST_FILE_NAME: &str = "sfdx-project.json";

/// One entry of the manifest's `packageDirectories` array.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageDirectory {
    pub path: String,
    #[serde(default)]
    pub package: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectManifest {
    #[serde(rename = "packageDirectories")]
    package_directories: Vec<PackageDirectory>,
}

/// Maps file paths to the package that owns them.
#[derive(Debug, Clone, Default)]
pub struct PackageResolver {
    /// Directories with their root path already normalized.
    directories: Vec<PackageDirectory>,
}

impl PackageResolver {
    /// Build a resolver from directories in priority order.
    pub fn new(directories: Vec<PackageDirectory>) -> Self {
        let directories = directories
            .into_iter()
            .map(|d| PackageDirectory {
                path: normalize_path(&d.path),
                package: d.package,
            })
            .collect();
        Self { directories }
    }

    /// Load the package table from a project manifest on disk.
    pub fn from_manifest<P: AsRef<Path>>(path: P) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading project manifest");

        if !path.exists() {
            return Err(ProjectError::ManifestNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let manifest: ProjectManifest =
            serde_json::from_str(&contents).map_err(|e| ProjectError::ParseError {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;

        debug!(
            count = manifest.package_directories.len(),
            "package directories loaded"
        );
        Ok(Self::new(manifest.package_directories))
    }

    /// Name of the package owning `file_path`.
    pub fn resolve(&self, file_path: &str) -> &str {
        let normalized = normalize_path(file_path);
        self.directories
            .iter()
            .find(|d| normalized.contains(d.path.as_str()))
            .and_then(|d| d.package.as_deref())
            .unwrap_or(UNKNOWN_PACKAGE)
    }

    pub fn directories(&self) -> &[PackageDirectory] {
        &self.directories
    }
}

/// Lexically normalize a relative or absolute path with `/` separators.
///
/// Backslashes become slashes, empty and `.` segments are dropped and `..`
/// folds into its parent where one exists. A trailing separator is kept.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    if unified.is_empty() {
        return ".".to_string();
    }
    let absolute = unified.starts_with('/');
    let trailing = unified.ends_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }

    let mut out = parts.join("/");
    if absolute {
        out.insert(0, '/');
    } else if out.is_empty() {
        out.push('.');
    }
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(path: &str, package: Option<&str>) -> PackageDirectory {
        PackageDirectory {
            path: path.to_string(),
            package: package.map(str::to_string),
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("force-app\\main\\default"), "force-app/main/default");
        assert_eq!(normalize_path("./src//core/../core/x.cls"), "src/core/x.cls");
        assert_eq!(normalize_path("src/core/"), "src/core/");
        assert_eq!(normalize_path("../shared/a"), "../shared/a");
        assert_eq!(normalize_path("/a/../../b"), "/b");
        assert_eq!(normalize_path(""), ".");
        assert_eq!(normalize_path("./"), "./");
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let resolver = PackageResolver::new(vec![
            dir("src/core", Some("core")),
            dir("src/core-ext", Some("core-ext")),
        ]);
        // Substring match: `src/core` is found inside `src/core-ext/...` too.
        assert_eq!(resolver.resolve("src/core-ext/classes/A.cls"), "core");
        assert_eq!(resolver.resolve("src/core/classes/A.cls"), "core");
    }

    #[test]
    fn test_resolve_unknown_package() {
        let resolver = PackageResolver::new(vec![dir("src/core", Some("core"))]);
        assert_eq!(resolver.resolve("scripts/deploy.sh"), UNKNOWN_PACKAGE);
        assert_eq!(PackageResolver::default().resolve("anything"), UNKNOWN_PACKAGE);
    }

    #[test]
    fn test_resolve_is_separator_independent() {
        let resolver = PackageResolver::new(vec![dir("src\\sales\\", Some("sales"))]);
        assert_eq!(resolver.resolve("src\\sales\\classes\\Quote.cls"), "sales");
        assert_eq!(resolver.resolve("./src/sales/classes/Quote.cls"), "sales");
    }

    #[test]
    fn test_unnamed_directory_resolves_to_sentinel() {
        let resolver = PackageResolver::new(vec![
            dir("unpackaged", None),
            dir("unpackaged/extra", Some("extra")),
        ]);
        assert_eq!(resolver.resolve("unpackaged/extra/A.cls"), UNKNOWN_PACKAGE);
    }

    #[test]
    fn test_from_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(MANIFEST_FILE_NAME);
        std::fs::write(
            &path,
            r#"{
                "packageDirectories": [
                    {"path": "src/core", "package": "core", "versionNumber": "1.0.0.NEXT"},
                    {"path": "src/sales", "package": "sales", "default": true}
                ],
                "sourceApiVersion": "60.0"
            }"#,
        )
        .unwrap();

        let resolver = PackageResolver::from_manifest(&path).unwrap();
        assert_eq!(resolver.directories().len(), 2);
        assert_eq!(resolver.resolve("src/sales/main/default/classes/Quote.cls"), "sales");
    }

    #[test]
    fn test_manifest_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.json");
        assert!(matches!(
            PackageResolver::from_manifest(&missing),
            Err(ProjectError::ManifestNotFound(_))
        ));

        let bad = tmp.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&bad, r#"{"packages": []}"#).unwrap();
        assert!(matches!(
            PackageResolver::from_manifest(&bad),
            Err(ProjectError::ParseError { .. })
        ));
    }
}
