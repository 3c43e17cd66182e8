//! Read-only verification phases.

use super::backup::BACKUP_SUFFIX;
use super::rewrite::RELEASE_MANIFEST_SUFFIX;
use super::{END_RELEASE_PHASE, PhaseContext, ReleasePhase};
use crate::descriptor::VersionTriple;
use crate::error::{FailureError, Result};
use crate::prompt::Prompter;
use crate::result::ReleaseResult;
use crate::scm::ScmProvider;
use crate::state::STATE_FILE_NAME;
use crate::version;
use crate::workspace::{ModuleKey, root_project};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Files the release itself creates; they never count as local modifications
const RELEASE_FILE_SUFFIXES: [&str; 6] =
    [BACKUP_SUFFIX, RELEASE_MANIFEST_SUFFIX, ".tag", ".next", ".branch", ".tmp"];

/// Validates the reactor before anything is changed
#[derive(Debug, Clone, Copy)]
pub struct CheckManifestsPhase {
    scm_required: bool,
    snapshots_required: bool,
}

impl CheckManifestsPhase {
    /// Create the phase
    pub fn new(scm_required: bool, snapshots_required: bool) -> Self {
        Self {
            scm_required,
            snapshots_required,
        }
    }
}

impl ReleasePhase for CheckManifestsPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        if self.scm_required && ctx.descriptor.scm_source_url.is_none() {
            let repository = root_project(ctx.projects).and_then(|p| p.repository.clone());
            match repository {
                Some(url) => {
                    result.info(format!("Using SCM URL from package.repository: {}", url));
                    ctx.descriptor.scm_source_url = Some(url);
                }
                None => return Err(FailureError::MissingScmUrl.into()),
            }
        }

        let has_snapshot = ctx.projects.iter().any(|p| version::is_snapshot(&p.version));
        if self.snapshots_required && !has_snapshot && !ctx.descriptor.branch_creation {
            return Err(FailureError::NoSnapshotInReactor.into());
        }

        result.info(format!("Verified {} reactor project(s)", ctx.projects.len()));
        Ok(())
    }
}

/// Fails when the working copy has uncommitted changes
pub struct ScmCheckModificationsPhase {
    scm: Arc<dyn ScmProvider>,
}

impl ScmCheckModificationsPhase {
    /// Create the phase
    pub fn new(scm: Arc<dyn ScmProvider>) -> Self {
        Self { scm }
    }
}

fn is_release_file(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    name == STATE_FILE_NAME
        || name == crate::config::SETTINGS_FILE_NAME
        || RELEASE_FILE_SUFFIXES
            .iter()
            .any(|suffix| name.starts_with("Cargo.toml") && name.ends_with(suffix))
        || name.starts_with(STATE_FILE_NAME)
}

impl ReleasePhase for ScmCheckModificationsPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        result.info("Verifying that there are no local modifications...");

        let mut modified = self.scm.status(&ctx.descriptor.working_directory)?;
        modified.retain(|path| !is_release_file(path));

        if !modified.is_empty() {
            return Err(FailureError::LocalModifications { files: modified }.into());
        }
        Ok(())
    }
}

/// Checks that dependencies outside the reactor are released
///
/// In interactive mode the user may pick release and development versions
/// for each snapshot dependency instead.
pub struct CheckDependencySnapshotsPhase {
    prompter: Arc<dyn Prompter>,
}

impl CheckDependencySnapshotsPhase {
    /// Create the phase
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self { prompter }
    }
}

impl ReleasePhase for CheckDependencySnapshotsPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        result.info("Checking dependencies for snapshots...");

        let reactor: BTreeSet<&ModuleKey> = ctx.projects.iter().map(|p| &p.key).collect();
        let allow_timestamped = ctx.descriptor.allow_timestamped_snapshots;

        let mut unreleased: Vec<(ModuleKey, String)> = Vec::new();
        for project in ctx.projects {
            for dependency in &project.dependencies {
                let Some(version) = &dependency.version else {
                    continue;
                };
                if reactor.contains(&dependency.key) || !version::is_unreleased(version, allow_timestamped) {
                    continue;
                }
                let resolved = ctx
                    .descriptor
                    .resolved_snapshot_dependencies
                    .get(&dependency.key)
                    .is_some_and(|t| t.release.is_some());
                if !resolved && !unreleased.iter().any(|(k, _)| k == &dependency.key) {
                    unreleased.push((dependency.key.clone(), version.clone()));
                }
            }
        }

        if unreleased.is_empty() {
            return Ok(());
        }

        if !ctx.descriptor.interactive {
            return Err(FailureError::UnreleasedDependencies {
                dependencies: unreleased.iter().map(|(k, v)| format!("{}:{}", k, v)).collect(),
            }
            .into());
        }

        for (key, original) in unreleased {
            let release = self.prompter.prompt(
                &format!("Dependency '{}' is a snapshot ({}). Which release version should it use?", key, original),
                &version::release_version(&original),
            )?;
            let suggested_development = version::next_development_version(&release).unwrap_or_else(|| original.clone());
            let development = self.prompter.prompt(
                &format!("Which development version should '{}' use after the release?", key),
                &suggested_development,
            )?;
            result.info(format!("Resolved {} {} -> {} / {}", key, original, release, development));
            ctx.descriptor.resolved_snapshot_dependencies.insert(
                key,
                VersionTriple {
                    original,
                    release: Some(release),
                    development: Some(development),
                },
            );
        }
        Ok(())
    }
}

/// Perform prerequisite: prepare must have finished
#[derive(Debug, Default)]
pub struct VerifyCompletedPreparePhasesPhase;

impl ReleasePhase for VerifyCompletedPreparePhasesPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        match ctx.descriptor.completed_phase.as_deref() {
            None => {
                result.warn("No completed prepare found; performing from the configured release label");
                Ok(())
            }
            Some(END_RELEASE_PHASE) => Ok(()),
            Some(phase) => Err(FailureError::IncompletePrepare {
                completed_phase: phase.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Fixture, RecordingScm};
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::workspace::ProjectDependency;

    #[test]
    fn release_requires_a_snapshot() {
        let mut fixture = Fixture::new("1.0.0");
        fixture.descriptor.scm_source_url = Some("https://example.com/app.git".to_string());
        let (outcome, _) = fixture.run(&CheckManifestsPhase::new(true, true), false);
        assert!(matches!(
            outcome.unwrap_err(),
            crate::error::ReleaseError::Failure(FailureError::NoSnapshotInReactor)
        ));

        fixture.descriptor.branch_creation = true;
        let (outcome, _) = fixture.run(&CheckManifestsPhase::new(true, true), false);
        outcome.unwrap();
    }

    #[test]
    fn scm_url_falls_back_to_package_repository() {
        let mut fixture = Fixture::new("1.0.0-SNAPSHOT");
        let (outcome, _) = fixture.run(&CheckManifestsPhase::new(true, true), false);
        assert!(outcome.unwrap_err().is_failure());

        fixture.projects[0].repository = Some("https://example.com/app.git".to_string());
        let (outcome, _) = fixture.run(&CheckManifestsPhase::new(true, true), false);
        outcome.unwrap();
        assert_eq!(fixture.descriptor.scm_source_url.as_deref(), Some("https://example.com/app.git"));
    }

    #[test]
    fn release_files_are_not_modifications() {
        let scm = Arc::new(RecordingScm {
            modified: vec![
                "release.json".to_string(),
                "crates/a/Cargo.toml.releaseBackup".to_string(),
                "Cargo.toml.tag".to_string(),
                "crates/a/Cargo.toml.release".to_string(),
            ],
            ..Default::default()
        });
        let mut fixture = Fixture::new("1.0.0-SNAPSHOT");
        let (outcome, _) = fixture.run(&ScmCheckModificationsPhase::new(scm), false);
        outcome.unwrap();

        let scm = Arc::new(RecordingScm {
            modified: vec!["src/lib.rs".to_string()],
            ..Default::default()
        });
        let (outcome, _) = fixture.run(&ScmCheckModificationsPhase::new(scm), false);
        assert!(outcome.unwrap_err().to_string().contains("src/lib.rs"));
    }

    #[test]
    fn snapshot_dependencies_fail_in_batch_mode() {
        let mut fixture = Fixture::new("1.0.0-SNAPSHOT");
        fixture.projects[0].dependencies.push(ProjectDependency {
            key: ModuleKey::new("crates-io", "helper"),
            version: Some("0.2.0-SNAPSHOT".to_string()),
        });
        let phase = CheckDependencySnapshotsPhase::new(Arc::new(ScriptedPrompter::default()));

        let (outcome, _) = fixture.run(&phase, false);
        assert!(outcome.unwrap_err().to_string().contains("helper"));
    }

    #[test]
    fn snapshot_dependencies_are_resolved_interactively() {
        let mut fixture = Fixture::new("1.0.0-SNAPSHOT");
        fixture.descriptor.interactive = true;
        fixture.projects[0].dependencies.push(ProjectDependency {
            key: ModuleKey::new("crates-io", "helper"),
            version: Some("0.2.0-SNAPSHOT".to_string()),
        });
        let phase = CheckDependencySnapshotsPhase::new(Arc::new(ScriptedPrompter::new(["0.2.0"])));

        let (outcome, _) = fixture.run(&phase, false);
        outcome.unwrap();
        let triple = &fixture.descriptor.resolved_snapshot_dependencies[&ModuleKey::new("crates-io", "helper")];
        assert_eq!(triple.release.as_deref(), Some("0.2.0"));
        assert_eq!(triple.development.as_deref(), Some("0.2.1-SNAPSHOT"));

        // Resolved dependencies are not asked for again
        fixture.descriptor.interactive = false;
        let (outcome, _) = fixture.run(&phase, false);
        outcome.unwrap();
    }

    #[test]
    fn perform_requires_finished_prepare() {
        let mut fixture = Fixture::new("1.0.0");
        fixture.descriptor.completed_phase = Some("scm-tag".to_string());
        let (outcome, _) = fixture.run(&VerifyCompletedPreparePhasesPhase, false);
        assert!(outcome.unwrap_err().is_failure());

        fixture.descriptor.completed_phase = Some(END_RELEASE_PHASE.to_string());
        let (outcome, _) = fixture.run(&VerifyCompletedPreparePhasesPhase, false);
        outcome.unwrap();
    }
}
