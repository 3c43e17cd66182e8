//! Format-preserving manifest version rewriting.
//!
//! Rewrites go through `toml_edit` so comments, ordering and formatting of
//! the user's manifests survive a release.

use crate::error::{ExecutionError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use toml_edit::{DocumentMut, Item, TableLike, Value};

const DEPENDENCY_TABLES: [&str; 3] = ["dependencies", "dev-dependencies", "build-dependencies"];

/// What to do with the `package.metadata.scm.tag` entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScmTagUpdate {
    /// Leave the entry as it is
    #[default]
    Keep,
    /// Set the entry to this tag
    Set(String),
    /// Remove the entry
    Remove,
}

/// Changes to apply to a single manifest
#[derive(Debug, Clone, Default)]
pub struct ManifestRewrite {
    /// New `package.version`; inherited versions are left alone
    pub package_version: Option<String>,
    /// New `workspace.package.version`
    pub workspace_version: Option<String>,
    /// New versions for dependencies, keyed by package name
    pub dependency_versions: BTreeMap<String, String>,
    /// SCM tag bookkeeping
    pub scm_tag: ScmTagUpdate,
}

impl ManifestRewrite {
    /// Whether applying this rewrite would change anything
    pub fn is_empty(&self) -> bool {
        self.package_version.is_none()
            && self.workspace_version.is_none()
            && self.dependency_versions.is_empty()
            && self.scm_tag == ScmTagUpdate::Keep
    }
}

/// Reads and rewrites manifest content
pub trait ManifestTransformer: Send + Sync {
    /// Apply `rewrite` to the manifest text read from `path`
    fn transform(&self, path: &Path, content: &str, rewrite: &ManifestRewrite) -> Result<String>;

    /// SCM tag recorded in the manifest, if any
    fn scm_tag(&self, path: &Path, content: &str) -> Result<Option<String>>;
}

/// [`ManifestTransformer`] for `Cargo.toml` files
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoManifestTransformer;

impl CargoManifestTransformer {
    /// Create a transformer
    pub fn new() -> Self {
        Self
    }

    fn parse(path: &Path, content: &str) -> Result<DocumentMut> {
        content.parse::<DocumentMut>().map_err(|e| {
            ExecutionError::Manifest {
                path: path.to_path_buf(),
                reason: format!("Failed to parse TOML: {}", e),
            }
            .into()
        })
    }
}

impl ManifestTransformer for CargoManifestTransformer {
    fn transform(&self, path: &Path, content: &str, rewrite: &ManifestRewrite) -> Result<String> {
        let mut doc = Self::parse(path, content)?;

        if let Some(version) = &rewrite.package_version
            && let Some(package) = doc.get_mut("package").and_then(Item::as_table_like_mut)
        {
            set_plain_version(package, version);
        }

        if let Some(version) = &rewrite.workspace_version
            && let Some(package) = doc
                .get_mut("workspace")
                .and_then(Item::as_table_like_mut)
                .and_then(|w| w.get_mut("package"))
                .and_then(Item::as_table_like_mut)
        {
            set_plain_version(package, version);
        }

        if !rewrite.dependency_versions.is_empty() {
            let mut updated = 0;
            for table in DEPENDENCY_TABLES {
                if let Some(deps) = doc.get_mut(table).and_then(Item::as_table_like_mut) {
                    updated += update_dependencies(deps, &rewrite.dependency_versions);
                }
            }
            if let Some(targets) = doc.get_mut("target").and_then(Item::as_table_like_mut) {
                for (_, target) in targets.iter_mut() {
                    let Some(target) = target.as_table_like_mut() else {
                        continue;
                    };
                    for table in DEPENDENCY_TABLES {
                        if let Some(deps) = target.get_mut(table).and_then(Item::as_table_like_mut) {
                            updated += update_dependencies(deps, &rewrite.dependency_versions);
                        }
                    }
                }
            }
            if let Some(deps) = doc
                .get_mut("workspace")
                .and_then(Item::as_table_like_mut)
                .and_then(|w| w.get_mut("dependencies"))
                .and_then(Item::as_table_like_mut)
            {
                updated += update_dependencies(deps, &rewrite.dependency_versions);
            }
            log::debug!("Updated {} dependency version(s) in {}", updated, path.display());
        }

        match &rewrite.scm_tag {
            ScmTagUpdate::Keep => {}
            ScmTagUpdate::Set(tag) => {
                if let Some(package) = doc.get_mut("package").and_then(Item::as_table_mut) {
                    let metadata = package
                        .entry("metadata")
                        .or_insert_with(implicit_table)
                        .as_table_mut();
                    if let Some(scm) = metadata.map(|m| m.entry("scm").or_insert_with(toml_edit::table)) {
                        scm["tag"] = toml_edit::value(tag.as_str());
                    }
                }
            }
            ScmTagUpdate::Remove => {
                if let Some(scm) = doc
                    .get_mut("package")
                    .and_then(Item::as_table_like_mut)
                    .and_then(|p| p.get_mut("metadata"))
                    .and_then(Item::as_table_like_mut)
                    .and_then(|m| m.get_mut("scm"))
                    .and_then(Item::as_table_like_mut)
                {
                    scm.remove("tag");
                }
            }
        }

        Ok(doc.to_string())
    }

    fn scm_tag(&self, path: &Path, content: &str) -> Result<Option<String>> {
        let doc = Self::parse(path, content)?;
        Ok(doc
            .get("package")
            .and_then(|p| p.get("metadata"))
            .and_then(|m| m.get("scm"))
            .and_then(|s| s.get("tag"))
            .and_then(Item::as_str)
            .map(str::to_string))
    }
}

fn implicit_table() -> Item {
    let mut table = toml_edit::Table::new();
    table.set_implicit(true);
    Item::Table(table)
}

/// Replace a string `version` entry, keeping its decoration
///
/// `version.workspace = true` is left untouched.
fn set_plain_version(table: &mut dyn TableLike, version: &str) -> bool {
    match table.get_mut("version").and_then(Item::as_value_mut) {
        Some(value) if value.is_str() => {
            replace_value(value, version);
            true
        }
        _ => false,
    }
}

fn replace_value(value: &mut Value, new: &str) {
    let decor = value.decor().clone();
    *value = Value::from(new);
    *value.decor_mut() = decor;
}

/// Rewrite versions of the listed packages in one dependency table
///
/// Dependencies without a version (path-only, `workspace = true`) are skipped.
fn update_dependencies(deps: &mut dyn TableLike, versions: &BTreeMap<String, String>) -> usize {
    let mut updated = 0;
    for (alias, item) in deps.iter_mut() {
        if let Some(value) = item.as_value_mut()
            && value.is_str()
        {
            if let Some(version) = versions.get(alias.get()) {
                replace_value(value, version);
                updated += 1;
            }
            continue;
        }

        let Some(spec) = item.as_table_like_mut() else {
            continue;
        };
        let name = spec
            .get("package")
            .and_then(Item::as_str)
            .unwrap_or(alias.get())
            .to_string();
        if let Some(version) = versions.get(&name)
            && set_plain_version(spec, version)
        {
            updated += 1;
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(content: &str, rewrite: &ManifestRewrite) -> String {
        CargoManifestTransformer::new()
            .transform(Path::new("Cargo.toml"), content, rewrite)
            .unwrap()
    }

    fn versions(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn rewrites_package_and_dependencies_preserving_comments() {
        let content = r#"[package]
name = "app"
version = "1.0.0-SNAPSHOT" # managed by release

[dependencies]
core = { path = "../core", version = "1.0.0-SNAPSHOT" }
util = "1.0.0-SNAPSHOT"
renamed = { package = "helpers", path = "../helpers", version = "1.0.0-SNAPSHOT" }
serde = "1"
local = { path = "../local" }

[target.'cfg(unix)'.dev-dependencies]
core = { path = "../core", version = "1.0.0-SNAPSHOT" }
"#;
        let out = rewrite(
            content,
            &ManifestRewrite {
                package_version: Some("1.0.0".to_string()),
                dependency_versions: versions(&[
                    ("core", "1.0.0"),
                    ("util", "1.0.0"),
                    ("helpers", "1.0.0"),
                    ("local", "1.0.0"),
                ]),
                ..Default::default()
            },
        );

        assert!(out.contains(r#"version = "1.0.0" # managed by release"#));
        assert!(out.contains(r#"core = { path = "../core", version = "1.0.0" }"#));
        assert!(out.contains(r#"util = "1.0.0""#));
        assert!(out.contains(r#"renamed = { package = "helpers", path = "../helpers", version = "1.0.0" }"#));
        assert!(out.contains(r#"serde = "1""#));
        assert!(out.contains(r#"local = { path = "../local" }"#));
        assert!(!out.contains("SNAPSHOT"));
    }

    #[test]
    fn inherited_versions_are_left_alone() {
        let content = r#"[workspace]
members = ["a"]

[workspace.package]
version = "0.3.0-SNAPSHOT"

[workspace.dependencies]
a = { path = "a", version = "0.3.0-SNAPSHOT" }

[package]
name = "root"
version.workspace = true
"#;
        let out = rewrite(
            content,
            &ManifestRewrite {
                package_version: Some("0.3.0".to_string()),
                workspace_version: Some("0.3.0".to_string()),
                dependency_versions: versions(&[("a", "0.3.0")]),
                ..Default::default()
            },
        );

        assert!(out.contains("version.workspace = true"));
        assert!(out.contains(r#"a = { path = "a", version = "0.3.0" }"#));
        assert!(!out.contains("SNAPSHOT"));
    }

    #[test]
    fn scm_tag_is_set_read_and_removed() {
        let transformer = CargoManifestTransformer::new();
        let path = Path::new("Cargo.toml");
        let content = "[package]\nname = \"app\"\nversion = \"1.0.0\"\n";

        assert_eq!(transformer.scm_tag(path, content).unwrap(), None);

        let tagged = rewrite(
            content,
            &ManifestRewrite {
                scm_tag: ScmTagUpdate::Set("app-1.0.0".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(transformer.scm_tag(path, &tagged).unwrap().as_deref(), Some("app-1.0.0"));

        let untagged = rewrite(
            &tagged,
            &ManifestRewrite {
                scm_tag: ScmTagUpdate::Remove,
                ..Default::default()
            },
        );
        assert_eq!(transformer.scm_tag(path, &untagged).unwrap(), None);
    }

    #[test]
    fn invalid_toml_is_a_manifest_error() {
        let err = CargoManifestTransformer::new()
            .transform(Path::new("broken/Cargo.toml"), "[package", &ManifestRewrite::default())
            .unwrap_err();
        assert!(err.to_string().contains("broken/Cargo.toml"));
    }

    #[test]
    fn empty_rewrite_detection() {
        assert!(ManifestRewrite::default().is_empty());
        assert!(!ManifestRewrite {
            scm_tag: ScmTagUpdate::Remove,
            ..Default::default()
        }
        .is_empty());
    }
}
