//! Reactor discovery from Cargo manifests.

use super::{ModuleKey, ProjectDependency, ReleaseProject};
use crate::error::{ExecutionError, ReleaseError, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Group used for dependencies resolved from the default registry
const DEFAULT_REGISTRY_GROUP: &str = "crates-io";

const DEPENDENCY_TABLES: [&str; 3] = ["dependencies", "dev-dependencies", "build-dependencies"];

/// Load the reactor project set rooted at `working_dir`
///
/// Handles single-package manifests, workspaces with a root package, and
/// virtual workspaces. Member patterns may use globs (`crates/*`).
pub fn load_reactor(working_dir: &Path) -> Result<Vec<ReleaseProject>> {
    let root_manifest = working_dir.join("Cargo.toml");
    let root = read_manifest(&root_manifest)?;

    let group = release_group(&root, working_dir);
    let workspace = root.get("workspace");
    let workspace_version = workspace
        .and_then(|w| w.get("package"))
        .and_then(|p| p.get("version"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let workspace_dependencies = workspace
        .and_then(|w| w.get("dependencies"))
        .and_then(|d| d.as_table())
        .cloned()
        .unwrap_or_default();

    let mut manifests: Vec<(PathBuf, toml::Value)> = Vec::new();
    if root.get("package").is_some() {
        manifests.push((root_manifest.clone(), root.clone()));
    }
    if let Some(workspace) = workspace {
        for member_dir in expand_members(working_dir, workspace)? {
            let manifest_path = member_dir.join("Cargo.toml");
            if manifest_path == root_manifest {
                continue;
            }
            let parsed = read_manifest(&manifest_path)?;
            manifests.push((manifest_path, parsed));
        }
    }

    let member_names: HashSet<String> = manifests
        .iter()
        .filter_map(|(_, m)| package_name(m))
        .collect();

    let mut projects = Vec::with_capacity(manifests.len());
    for (manifest_path, manifest) in &manifests {
        let Some(name) = package_name(manifest) else {
            continue;
        };
        let package = manifest.get("package");
        let (version, inherits_version) = match package.and_then(|p| p.get("version")) {
            Some(toml::Value::String(v)) => (v.clone(), false),
            Some(toml::Value::Table(t)) if t.get("workspace").and_then(|w| w.as_bool()) == Some(true) => {
                let inherited = workspace_version.clone().ok_or_else(|| manifest_error(
                    manifest_path,
                    "version is inherited but [workspace.package] has no version",
                ))?;
                (inherited, true)
            }
            _ => ("0.0.0".to_string(), false),
        };

        let mut project = ReleaseProject::new(ModuleKey::new(group.clone(), name), version, manifest_path.clone());
        project.is_root = *manifest_path == root_manifest;
        project.inherits_version = inherits_version;
        project.repository = package
            .and_then(|p| p.get("repository"))
            .and_then(|r| match r {
                toml::Value::String(url) => Some(url.clone()),
                _ => workspace
                    .and_then(|w| w.get("package"))
                    .and_then(|p| p.get("repository"))
                    .and_then(|u| u.as_str())
                    .map(str::to_string),
            });
        project.dependencies = collect_dependencies(manifest, &group, &member_names, &workspace_dependencies);
        projects.push(project);
    }

    log::debug!("Loaded {} reactor project(s) from {}", projects.len(), working_dir.display());
    Ok(projects)
}

fn read_manifest(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ReleaseError::io(format!("Failed to read {}", path.display()), e))?;
    toml::from_str(&content).map_err(|e| manifest_error(path, &e.to_string()))
}

fn manifest_error(path: &Path, reason: &str) -> ReleaseError {
    ExecutionError::Manifest {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
    .into()
}

fn package_name(manifest: &toml::Value) -> Option<String> {
    manifest
        .get("package")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string)
}

/// Group for reactor modules: `metadata.release.group`, else the directory name
fn release_group(root: &toml::Value, working_dir: &Path) -> String {
    ["workspace", "package"]
        .iter()
        .find_map(|section| {
            root.get(*section)
                .and_then(|s| s.get("metadata"))
                .and_then(|m| m.get("release"))
                .and_then(|r| r.get("group"))
                .and_then(|g| g.as_str())
                .map(str::to_string)
        })
        .or_else(|| {
            working_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "workspace".to_string())
}

fn expand_members(working_dir: &Path, workspace: &toml::Value) -> Result<Vec<PathBuf>> {
    let patterns = string_array(workspace.get("members"));
    let excluded: HashSet<PathBuf> = string_array(workspace.get("exclude"))
        .iter()
        .map(|e| working_dir.join(e))
        .collect();

    let mut members = Vec::new();
    for pattern in patterns {
        let full_pattern = working_dir.join(&pattern);
        if pattern.contains(['*', '?', '[']) {
            let pattern_str = full_pattern.to_string_lossy();
            let entries = glob::glob(&pattern_str)
                .map_err(|e| manifest_error(&working_dir.join("Cargo.toml"), &format!("Invalid glob pattern '{}': {}", pattern, e)))?;
            for entry in entries.flatten() {
                if entry.join("Cargo.toml").exists() {
                    members.push(entry);
                }
            }
        } else {
            members.push(full_pattern);
        }
    }

    members.retain(|m| !excluded.contains(m));
    members.sort();
    members.dedup();
    Ok(members)
}

fn string_array(value: Option<&toml::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|e| e.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn collect_dependencies(
    manifest: &toml::Value,
    group: &str,
    members: &HashSet<String>,
    workspace_dependencies: &toml::map::Map<String, toml::Value>,
) -> Vec<ProjectDependency> {
    let mut tables: Vec<&toml::map::Map<String, toml::Value>> = DEPENDENCY_TABLES
        .iter()
        .filter_map(|t| manifest.get(*t).and_then(|d| d.as_table()))
        .collect();
    if let Some(targets) = manifest.get("target").and_then(|t| t.as_table()) {
        for target in targets.values() {
            tables.extend(DEPENDENCY_TABLES.iter().filter_map(|t| target.get(*t).and_then(|d| d.as_table())));
        }
    }

    let mut dependencies: BTreeMap<ModuleKey, Option<String>> = BTreeMap::new();
    for table in tables {
        for (alias, spec) in table {
            let spec = match spec.get("workspace").and_then(|w| w.as_bool()) {
                Some(true) => workspace_dependencies.get(alias).unwrap_or(spec),
                _ => spec,
            };
            let name = spec
                .get("package")
                .and_then(|p| p.as_str())
                .unwrap_or(alias)
                .to_string();
            let dep_group = if members.contains(&name) {
                group.to_string()
            } else {
                spec.get("registry")
                    .and_then(|r| r.as_str())
                    .unwrap_or(DEFAULT_REGISTRY_GROUP)
                    .to_string()
            };
            let version = match spec {
                toml::Value::String(v) => Some(v.clone()),
                other => other.get("version").and_then(|v| v.as_str()).map(str::to_string),
            };
            dependencies.entry(ModuleKey::new(dep_group, name)).or_insert(version);
        }
    }

    dependencies
        .into_iter()
        .map(|(key, version)| ProjectDependency { key, version })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_single_package() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("Cargo.toml"),
            r#"
[package]
name = "solo"
version = "1.0-SNAPSHOT"

[package.metadata.release]
group = "acme"

[dependencies]
serde = "1"
"#,
        );

        let projects = load_reactor(dir.path()).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].key, ModuleKey::new("acme", "solo"));
        assert!(projects[0].is_root);
        assert_eq!(
            projects[0].dependencies,
            vec![ProjectDependency {
                key: ModuleKey::new("crates-io", "serde"),
                version: Some("1".to_string()),
            }]
        );
    }

    #[test]
    fn loads_virtual_workspace_with_inherited_versions() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("Cargo.toml"),
            r#"
[workspace]
members = ["crates/*"]

[workspace.package]
version = "2.0.0-SNAPSHOT"

[workspace.metadata.release]
group = "acme"
"#,
        );
        write(
            &dir.path().join("crates/core/Cargo.toml"),
            r#"
[package]
name = "core"
version.workspace = true
"#,
        );
        write(
            &dir.path().join("crates/cli/Cargo.toml"),
            r#"
[package]
name = "cli"
version = "0.3.0-SNAPSHOT"

[dependencies]
core = { path = "../core", version = "2.0.0-SNAPSHOT" }
"#,
        );

        let projects = load_reactor(dir.path()).unwrap();
        let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cli", "core"]);

        let core = &projects[1];
        assert!(core.inherits_version);
        assert_eq!(core.version, "2.0.0-SNAPSHOT");

        let cli = &projects[0];
        assert_eq!(cli.dependencies[0].key, ModuleKey::new("acme", "core"));
    }
}
