//! Reactor project model.
//!
//! A release operates over a set of modules (the "reactor"). Each module is
//! identified by a version-independent [`ModuleKey`]; the version maps held by
//! the release descriptor are keyed by it.

mod analyzer;

pub use analyzer::load_reactor;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Version-independent identity of a module (group + artifact)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleKey {
    /// Group the module belongs to
    pub group: String,
    /// Artifact name
    pub artifact: String,
}

impl ModuleKey {
    /// Create a module key
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

impl FromStr for ModuleKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((group, artifact)) if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(group, artifact))
            }
            _ => Err(format!("Invalid module key '{}', expected group:artifact", s)),
        }
    }
}

/// Dependency declared by a reactor project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDependency {
    /// Dependency identity
    pub key: ModuleKey,
    /// Declared version, if any (path-only dependencies have none)
    pub version: Option<String>,
}

/// A module taking part in the release
#[derive(Debug, Clone)]
pub struct ReleaseProject {
    /// Module identity
    pub key: ModuleKey,
    /// Human-readable name
    pub name: String,
    /// Current version as found in the manifest
    pub version: String,
    /// Path to the module's manifest
    pub manifest_path: PathBuf,
    /// Declared dependencies
    pub dependencies: Vec<ProjectDependency>,
    /// Whether this is the top-level module of the reactor
    pub is_root: bool,
    /// Whether the version is inherited from the workspace manifest
    pub inherits_version: bool,
    /// `package.repository`, used when no SCM URL is configured
    pub repository: Option<String>,
}

impl ReleaseProject {
    /// Create a project with no dependencies
    pub fn new(key: ModuleKey, version: impl Into<String>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            name: key.artifact.clone(),
            key,
            version: version.into(),
            manifest_path: manifest_path.into(),
            dependencies: Vec::new(),
            is_root: false,
            inherits_version: false,
            repository: None,
        }
    }

    /// Mark this project as the reactor root
    pub fn root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// Add a dependency
    pub fn with_dependency(mut self, key: ModuleKey, version: Option<&str>) -> Self {
        self.dependencies.push(ProjectDependency {
            key,
            version: version.map(str::to_string),
        });
        self
    }

    /// Directory holding the manifest
    pub fn base_dir(&self) -> &Path {
        self.manifest_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Root project of the reactor: the one flagged root, else the first
pub fn root_project(projects: &[ReleaseProject]) -> Option<&ReleaseProject> {
    projects.iter().find(|p| p.is_root).or_else(|| projects.first())
}

/// Every manifest a release touches: each project's, plus the workspace
/// manifest in `working_dir` when it is not itself a project manifest.
pub fn release_manifests(working_dir: &Path, projects: &[ReleaseProject]) -> Vec<PathBuf> {
    let mut manifests: Vec<PathBuf> = projects.iter().map(|p| p.manifest_path.clone()).collect();
    let workspace_manifest = working_dir.join("Cargo.toml");
    if workspace_manifest.exists() && !manifests.contains(&workspace_manifest) {
        manifests.insert(0, workspace_manifest);
    }
    manifests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_key_round_trips_through_display() {
        let key = ModuleKey::new("kodegen", "core");
        assert_eq!(key.to_string(), "kodegen:core");
        assert_eq!("kodegen:core".parse::<ModuleKey>(), Ok(key));
        assert!("no-colon".parse::<ModuleKey>().is_err());
        assert!(":core".parse::<ModuleKey>().is_err());
    }

    #[test]
    fn root_project_prefers_flagged_root() {
        let a = ReleaseProject::new(ModuleKey::new("g", "a"), "1.0", "/w/a/Cargo.toml");
        let b = ReleaseProject::new(ModuleKey::new("g", "b"), "1.0", "/w/Cargo.toml").root();
        let projects = vec![a, b];
        assert_eq!(root_project(&projects).map(|p| p.name.as_str()), Some("b"));
        assert!(root_project(&[]).is_none());
    }
}
