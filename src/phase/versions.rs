//! Version mapping and release label input.

use super::{PhaseContext, ReleasePhase};
use crate::error::{FailureError, Result};
use crate::prompt::Prompter;
use crate::result::ReleaseResult;
use crate::version;
use crate::workspace::{ModuleKey, ReleaseProject, root_project};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which version map a [`MapVersionsPhase`] fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMode {
    /// Release versions
    Release,
    /// Next development versions
    Development,
    /// Versions on a new branch (stored in the release map)
    Branch,
}

impl VersionMode {
    fn describe(self) -> &'static str {
        match self {
            VersionMode::Release => "release",
            VersionMode::Development => "new development",
            VersionMode::Branch => "branch",
        }
    }
}

/// Decides a version per reactor project
///
/// Explicit overrides already in the map win. Otherwise a suggestion is
/// computed and, in interactive mode, offered to the user. With
/// `auto_version_submodules` every project takes the root project's version.
pub struct MapVersionsPhase {
    mode: VersionMode,
    prompter: Arc<dyn Prompter>,
}

impl MapVersionsPhase {
    /// Create the phase
    pub fn new(mode: VersionMode, prompter: Arc<dyn Prompter>) -> Self {
        Self { mode, prompter }
    }

    fn suggest(&self, ctx: &PhaseContext<'_>, project: &ReleaseProject) -> Result<String> {
        let descriptor = &*ctx.descriptor;
        let suggestion = match self.mode {
            VersionMode::Release => descriptor
                .default_release_version
                .clone()
                .unwrap_or_else(|| version::release_version(&project.version)),
            VersionMode::Development if !descriptor.update_working_copy_versions => project.version.clone(),
            VersionMode::Development => match &descriptor.default_development_version {
                Some(v) => v.clone(),
                None => {
                    let base = descriptor
                        .release_version(&project.key)
                        .unwrap_or(project.version.as_str());
                    version::next_development_version(base).ok_or_else(|| FailureError::InvalidVersion {
                        module: project.key.to_string(),
                        version: base.to_string(),
                    })?
                }
            },
            VersionMode::Branch if !descriptor.update_branch_versions => project.version.clone(),
            VersionMode::Branch => descriptor
                .default_release_version
                .clone()
                .unwrap_or_else(|| project.version.clone()),
        };
        Ok(suggestion)
    }

    fn asks(&self, ctx: &PhaseContext<'_>) -> bool {
        ctx.descriptor.interactive
            && match self.mode {
                VersionMode::Release => true,
                VersionMode::Development => ctx.descriptor.update_working_copy_versions,
                VersionMode::Branch => ctx.descriptor.update_branch_versions,
            }
    }

    fn map_mut<'d>(&self, ctx: &'d mut PhaseContext<'_>) -> &'d mut BTreeMap<ModuleKey, String> {
        match self.mode {
            VersionMode::Release | VersionMode::Branch => &mut ctx.descriptor.release_versions,
            VersionMode::Development => &mut ctx.descriptor.development_versions,
        }
    }
}

impl ReleasePhase for MapVersionsPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let root_key = root_project(ctx.projects).map(|p| p.key.clone());

        for project in ctx.projects {
            ctx.descriptor
                .original_versions
                .entry(project.key.clone())
                .or_insert_with(|| project.version.clone());

            let inherited = if ctx.descriptor.auto_version_submodules && !project.is_root {
                root_key.as_ref().and_then(|root| self.map_mut(ctx).get(root).cloned())
            } else {
                None
            };

            let version = match (self.map_mut(ctx).get(&project.key).cloned(), inherited) {
                (Some(explicit), _) => explicit,
                (None, Some(from_root)) => from_root,
                (None, None) => {
                    let suggestion = self.suggest(ctx, project)?;
                    if self.asks(ctx) {
                        self.prompter.prompt(
                            &format!("What is the {} version for \"{}\"? ({})", self.mode.describe(), project.name, project.key),
                            &suggestion,
                        )?
                    } else {
                        suggestion
                    }
                }
            };

            if version.trim().is_empty()
                || (self.mode == VersionMode::Release && version::is_snapshot(&version))
            {
                return Err(FailureError::InvalidVersion {
                    module: project.key.to_string(),
                    version,
                }
                .into());
            }

            result.info(format!("{} {} version: {}", project.key, self.mode.describe(), version));
            self.map_mut(ctx).insert(project.key.clone(), version);
        }
        Ok(())
    }
}

/// Settles the release label (tag or branch name)
pub struct InputVariablesPhase {
    branch: bool,
    prompter: Arc<dyn Prompter>,
}

impl InputVariablesPhase {
    /// Create the phase; `branch` selects branch-name input
    pub fn new(branch: bool, prompter: Arc<dyn Prompter>) -> Self {
        Self { branch, prompter }
    }
}

impl ReleasePhase for InputVariablesPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        if ctx.descriptor.scm_release_label.is_some() {
            return Ok(());
        }

        let label = if self.branch {
            if !ctx.descriptor.interactive {
                return Err(FailureError::ReleaseLabelRequired.into());
            }
            self.prompter.prompt("What is the branch name?", "")?
        } else {
            let root = root_project(ctx.projects).ok_or(FailureError::NoSnapshotInReactor)?;
            let release = ctx
                .descriptor
                .release_version(&root.key)
                .map(str::to_string)
                .ok_or_else(|| FailureError::VersionNotMapped {
                    module: root.key.to_string(),
                    map: "release".to_string(),
                })?;
            let suggestion = ctx.descriptor.format_tag_name(root, &release);
            if ctx.descriptor.interactive {
                self.prompter
                    .prompt(&format!("What is the SCM release tag or label for \"{}\"?", root.name), &suggestion)?
            } else {
                suggestion
            }
        };

        let label = label.trim().to_string();
        if label.is_empty() {
            return Err(FailureError::ReleaseLabelRequired.into());
        }
        result.info(format!("Release label: {}", label));
        ctx.descriptor.scm_release_label = Some(label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::prompt::{DefaultsPrompter, ScriptedPrompter};

    fn map(mode: VersionMode) -> MapVersionsPhase {
        MapVersionsPhase::new(mode, Arc::new(DefaultsPrompter))
    }

    fn with_submodule(fixture: &mut Fixture) -> ModuleKey {
        let key = ModuleKey::new("acme", "lib");
        let manifest = fixture.dir.path().join("lib/Cargo.toml");
        fixture.projects.push(ReleaseProject::new(key.clone(), "0.4-SNAPSHOT", manifest));
        key
    }

    #[test]
    fn maps_release_then_development() {
        let mut fixture = Fixture::new("1.0-SNAPSHOT");
        let (outcome, _) = fixture.run(&map(VersionMode::Release), false);
        outcome.unwrap();
        let (outcome, _) = fixture.run(&map(VersionMode::Development), false);
        outcome.unwrap();

        let key = fixture.key();
        assert_eq!(fixture.descriptor.original_version(&key), Some("1.0-SNAPSHOT"));
        assert_eq!(fixture.descriptor.release_version(&key), Some("1.0"));
        assert_eq!(fixture.descriptor.development_version(&key), Some("1.1-SNAPSHOT"));
    }

    #[test]
    fn explicit_versions_are_kept() {
        let mut fixture = Fixture::new("1.0-SNAPSHOT");
        let key = fixture.key();
        fixture.descriptor.release_versions.insert(key.clone(), "1.0.0".to_string());

        let (outcome, _) = fixture.run(&map(VersionMode::Release), false);
        outcome.unwrap();
        assert_eq!(fixture.descriptor.release_version(&key), Some("1.0.0"));
    }

    #[test]
    fn auto_versioned_submodules_follow_root() {
        let mut fixture = Fixture::new("1.0-SNAPSHOT");
        let lib = with_submodule(&mut fixture);
        fixture.descriptor.auto_version_submodules = true;

        let (outcome, _) = fixture.run(&map(VersionMode::Release), false);
        outcome.unwrap();
        assert_eq!(fixture.descriptor.release_version(&lib), Some("1.0"));
    }

    #[test]
    fn interactive_answers_are_used() {
        let mut fixture = Fixture::new("1.0-SNAPSHOT");
        fixture.descriptor.interactive = true;
        let phase = MapVersionsPhase::new(VersionMode::Release, Arc::new(ScriptedPrompter::new(["1.0.0"])));

        let (outcome, _) = fixture.run(&phase, false);
        outcome.unwrap();
        assert_eq!(fixture.descriptor.release_version(&fixture.key()), Some("1.0.0"));
    }

    #[test]
    fn snapshot_release_version_is_rejected() {
        let mut fixture = Fixture::new("1.0-SNAPSHOT");
        fixture.descriptor.default_release_version = Some("2.0-SNAPSHOT".to_string());
        let (outcome, _) = fixture.run(&map(VersionMode::Release), false);
        assert!(outcome.unwrap_err().is_failure());
    }

    #[test]
    fn branch_versions_default_to_current() {
        let mut fixture = Fixture::new("1.0-SNAPSHOT");
        let (outcome, _) = fixture.run(&map(VersionMode::Branch), false);
        outcome.unwrap();
        assert_eq!(fixture.descriptor.release_version(&fixture.key()), Some("1.0-SNAPSHOT"));
    }

    #[test]
    fn tag_name_is_derived_from_release_version() {
        let mut fixture = Fixture::new("1.0-SNAPSHOT");
        let (outcome, _) = fixture.run(&map(VersionMode::Release), false);
        outcome.unwrap();

        let phase = InputVariablesPhase::new(false, Arc::new(DefaultsPrompter));
        let (outcome, _) = fixture.run(&phase, false);
        outcome.unwrap();
        assert_eq!(fixture.descriptor.scm_release_label.as_deref(), Some("app-1.0"));
    }

    #[test]
    fn branch_name_is_required_in_batch_mode() {
        let mut fixture = Fixture::new("1.0-SNAPSHOT");
        let phase = InputVariablesPhase::new(true, Arc::new(DefaultsPrompter));
        let (outcome, _) = fixture.run(&phase, false);
        assert!(matches!(
            outcome.unwrap_err(),
            crate::error::ReleaseError::Failure(FailureError::ReleaseLabelRequired)
        ));
    }
}
