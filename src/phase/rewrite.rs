//! Manifest rewriting for release, development and branch versions.

use super::{PhaseContext, ReleasePhase, remove_if_exists, suffixed, write_atomic};
use crate::descriptor::{ReleaseDescriptor, ScmInfo};
use crate::error::{FailureError, ReleaseError, Result};
use crate::result::ReleaseResult;
use crate::version::{ManifestRewrite, ManifestTransformer, ScmTagUpdate};
use crate::workspace::{ModuleKey, ReleaseProject, release_manifests};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Suffix of the standalone release manifest written when
/// [`ReleaseDescriptor::generate_release_manifests`] is set
pub const RELEASE_MANIFEST_SUFFIX: &str = ".release";

/// Which versions a [`RewriteManifestsPhase`] writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Release versions, recording the tag
    Release,
    /// Development versions, restoring the original tag
    Development,
    /// Branch versions
    Branch,
    /// Development versions only (update-versions goal)
    Versions,
}

impl RewriteMode {
    /// Suffix of the shadow file written when simulating
    pub fn shadow_suffix(self) -> &'static str {
        match self {
            RewriteMode::Release => ".tag",
            RewriteMode::Development | RewriteMode::Versions => ".next",
            RewriteMode::Branch => ".branch",
        }
    }

    fn map_name(self) -> &'static str {
        match self {
            RewriteMode::Release | RewriteMode::Branch => "release",
            RewriteMode::Development | RewriteMode::Versions => "development",
        }
    }

    fn versions(self, descriptor: &ReleaseDescriptor) -> &BTreeMap<ModuleKey, String> {
        match self {
            RewriteMode::Release | RewriteMode::Branch => &descriptor.release_versions,
            RewriteMode::Development | RewriteMode::Versions => &descriptor.development_versions,
        }
    }
}

/// Rewrites every reactor manifest to the mapped versions
///
/// All projects must have a mapped version before any file is written.
/// Simulation writes `Cargo.toml.tag`, `.next` or `.branch` next to each
/// manifest instead of the manifest itself.
///
/// With `generate_release_manifests`, the release rewrite also leaves a
/// `Cargo.toml.release` copy of each released manifest. The copies are not
/// committed, and the development rewrite removes them.
pub struct RewriteManifestsPhase {
    mode: RewriteMode,
    manifests: Arc<dyn ManifestTransformer>,
}

impl RewriteManifestsPhase {
    /// Create the phase
    pub fn new(mode: RewriteMode, manifests: Arc<dyn ManifestTransformer>) -> Self {
        Self { mode, manifests }
    }

    fn read(path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| ReleaseError::io(format!("Failed to read {}", path.display()), e))
    }

    /// Check every project is mapped and build its rewrite
    fn plan(&self, ctx: &mut PhaseContext<'_>) -> Result<Vec<(PathBuf, ManifestRewrite)>> {
        let versions = self.mode.versions(ctx.descriptor);
        for project in ctx.projects {
            if !versions.contains_key(&project.key) {
                return Err(FailureError::VersionNotMapped {
                    module: project.key.to_string(),
                    map: self.mode.map_name().to_string(),
                }
                .into());
            }
        }

        if self.mode == RewriteMode::Release {
            self.record_original_tags(ctx)?;
        }

        let descriptor = &*ctx.descriptor;
        let versions = self.mode.versions(descriptor);
        let dependency_versions = self.dependency_versions(descriptor, ctx.projects);
        let workspace_version = ctx
            .projects
            .iter()
            .find(|p| p.inherits_version)
            .and_then(|p| versions.get(&p.key))
            .cloned();
        let workspace_manifest = descriptor.working_directory.join("Cargo.toml");

        let mut plan = Vec::new();
        for manifest in release_manifests(&descriptor.working_directory, ctx.projects) {
            let project = ctx.projects.iter().find(|p| p.manifest_path == manifest);
            let rewrite = ManifestRewrite {
                package_version: project
                    .filter(|p| !p.inherits_version)
                    .and_then(|p| versions.get(&p.key))
                    .cloned(),
                workspace_version: workspace_version.clone().filter(|_| manifest == workspace_manifest),
                dependency_versions: dependency_versions.clone(),
                scm_tag: project.map_or(ScmTagUpdate::Keep, |p| self.scm_tag(descriptor, p)),
            };
            plan.push((manifest, rewrite));
        }
        Ok(plan)
    }

    /// Remember each manifest's tag before the release overwrites it
    fn record_original_tags(&self, ctx: &mut PhaseContext<'_>) -> Result<()> {
        for project in ctx.projects {
            if ctx.descriptor.original_scm_info.contains_key(&project.key) {
                continue;
            }
            let content = Self::read(&project.manifest_path)?;
            let tag = self.manifests.scm_tag(&project.manifest_path, &content)?;
            ctx.descriptor
                .original_scm_info
                .insert(project.key.clone(), ScmInfo { tag });
        }
        Ok(())
    }

    fn dependency_versions(&self, descriptor: &ReleaseDescriptor, projects: &[ReleaseProject]) -> BTreeMap<String, String> {
        let mut by_name = BTreeMap::new();
        if !descriptor.update_dependencies {
            return by_name;
        }
        let versions = self.mode.versions(descriptor);
        for project in projects {
            if let Some(version) = versions.get(&project.key) {
                by_name.insert(project.key.artifact.clone(), version.clone());
            }
        }
        for (key, triple) in &descriptor.resolved_snapshot_dependencies {
            let version = match self.mode {
                RewriteMode::Release => triple.release.as_ref(),
                RewriteMode::Development | RewriteMode::Versions => triple.development.as_ref(),
                RewriteMode::Branch => None,
            };
            if let Some(version) = version {
                by_name.insert(key.artifact.clone(), version.clone());
            }
        }
        by_name
    }

    fn scm_tag(&self, descriptor: &ReleaseDescriptor, project: &ReleaseProject) -> ScmTagUpdate {
        match self.mode {
            RewriteMode::Release => descriptor
                .scm_release_label
                .clone()
                .map_or(ScmTagUpdate::Keep, ScmTagUpdate::Set),
            RewriteMode::Development => match descriptor.original_scm_info.get(&project.key) {
                Some(ScmInfo { tag: Some(tag) }) => ScmTagUpdate::Set(tag.clone()),
                Some(ScmInfo { tag: None }) => ScmTagUpdate::Remove,
                None => ScmTagUpdate::Keep,
            },
            RewriteMode::Branch | RewriteMode::Versions => ScmTagUpdate::Keep,
        }
    }

    fn run(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult, simulate: bool) -> Result<()> {
        let plan = self.plan(ctx)?;
        for (manifest, rewrite) in plan {
            let content = Self::read(&manifest)?;
            let updated = self.manifests.transform(&manifest, &content, &rewrite)?;
            if simulate {
                let shadow = suffixed(&manifest, self.mode.shadow_suffix());
                write_atomic(&shadow, &updated)?;
                result.info(format!("Full run would rewrite {} (see {})", manifest.display(), shadow.display()));
                continue;
            }

            if updated != content {
                write_atomic(&manifest, &updated)?;
                result.info(format!("Rewrote {}", manifest.display()));
            } else {
                result.debug(format!("{} is already up to date", manifest.display()));
            }
            self.update_release_manifest(ctx.descriptor, &manifest, &updated, result)?;
        }
        Ok(())
    }

    fn update_release_manifest(
        &self,
        descriptor: &ReleaseDescriptor,
        manifest: &Path,
        updated: &str,
        result: &mut ReleaseResult,
    ) -> Result<()> {
        let release_manifest = suffixed(manifest, RELEASE_MANIFEST_SUFFIX);
        match self.mode {
            RewriteMode::Release if descriptor.generate_release_manifests => {
                write_atomic(&release_manifest, updated)?;
                result.info(format!("Generated release manifest {}", release_manifest.display()));
            }
            RewriteMode::Development => remove_if_exists(&release_manifest, result),
            _ => {}
        }
        Ok(())
    }
}

impl ReleasePhase for RewriteManifestsPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        self.run(ctx, result, false)
    }

    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        self.run(ctx, result, true)
    }

    fn clean(&self, descriptor: &ReleaseDescriptor, projects: &[ReleaseProject]) -> ReleaseResult {
        let mut result = ReleaseResult::new();
        for manifest in release_manifests(&descriptor.working_directory, projects) {
            remove_if_exists(&suffixed(&manifest, self.mode.shadow_suffix()), &mut result);
            if self.mode == RewriteMode::Release {
                remove_if_exists(&suffixed(&manifest, RELEASE_MANIFEST_SUFFIX), &mut result);
            }
        }
        result
    }
}
