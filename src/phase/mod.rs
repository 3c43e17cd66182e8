//! Release phases and the registry resolving them by name.
//!
//! A strategy lists phases by name only; the [`PhaseRegistry`] maps those
//! names to implementations at run time. Every phase is idempotent when
//! re-run after an interruption, and its `simulate` never touches anything
//! but clearly-suffixed shadow files.

mod backup;
mod checks;
mod goals;
mod rewrite;
mod scm;
mod versions;

pub use backup::{BACKUP_SUFFIX, CreateBackupManifestsPhase, RestoreBackupManifestsPhase};
pub use checks::{
    CheckDependencySnapshotsPhase, CheckManifestsPhase, ScmCheckModificationsPhase,
    VerifyCompletedPreparePhasesPhase,
};
pub use goals::{GoalsKind, RunGoalsPhase};
pub use rewrite::{RELEASE_MANIFEST_SUFFIX, RewriteManifestsPhase, RewriteMode};
pub use scm::{
    CheckoutProjectFromScmPhase, CommitKind, RemoveScmTagPhase, ScmBranchPhase, ScmCommitPhase,
    ScmTagPhase,
};
pub use versions::{InputVariablesPhase, MapVersionsPhase, VersionMode};

use crate::descriptor::ReleaseDescriptor;
use crate::error::{ExecutionError, ReleaseError, Result};
use crate::exec::{BuildExecutor, CommandBuildExecutor};
use crate::prompt::{Prompter, StdinPrompter};
use crate::result::ReleaseResult;
use crate::scm::{GitScmProvider, ScmProvider};
use crate::version::{CargoManifestTransformer, ManifestTransformer};
use crate::workspace::ReleaseProject;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Name of the terminal prepare phase; perform requires prepare to have reached it
pub const END_RELEASE_PHASE: &str = "end-release";

/// Settings of the machine running the release
#[derive(Debug, Clone, Default)]
pub struct ReleaseEnvironment {
    /// Build tool overriding the descriptor's
    pub build_tool: Option<String>,
    /// Extra environment variables for build invocations
    pub environment_variables: BTreeMap<String, String>,
}

/// Everything a phase operates on
pub struct PhaseContext<'a> {
    /// Shared mutable release state
    pub descriptor: &'a mut ReleaseDescriptor,
    /// Machine settings
    pub environment: &'a ReleaseEnvironment,
    /// Reactor projects
    pub projects: &'a [ReleaseProject],
}

/// A named unit of release work
///
/// Messages go into `result` so they survive a failing phase.
pub trait ReleasePhase: Send + Sync {
    /// Perform the phase's real side effects
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()>;

    /// Same descriptor changes and messages as [`execute`](Self::execute),
    /// without externally observable side effects
    ///
    /// The default is right for phases that only read or touch the descriptor.
    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        self.execute(ctx, result)
    }

    /// Remove files this phase leaves outside version control
    ///
    /// Must succeed when nothing was ever created.
    fn clean(&self, _descriptor: &ReleaseDescriptor, _projects: &[ReleaseProject]) -> ReleaseResult {
        ReleaseResult::new()
    }
}

/// Final prepare phase
#[derive(Debug, Default)]
pub struct EndReleasePhase;

impl ReleasePhase for EndReleasePhase {
    fn execute(&self, _ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        result.info("Release preparation complete.");
        Ok(())
    }

    fn simulate(&self, _ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        result.info("Release preparation simulation complete.");
        Ok(())
    }
}

/// Collaborators shared by the built-in phases
#[derive(Clone)]
pub struct ReleaseToolkit {
    /// Version control backend
    pub scm: Arc<dyn ScmProvider>,
    /// Manifest rewriter
    pub manifests: Arc<dyn ManifestTransformer>,
    /// Build runner
    pub executor: Arc<dyn BuildExecutor>,
    /// Interactive input
    pub prompter: Arc<dyn Prompter>,
}

impl ReleaseToolkit {
    /// System git, Cargo manifests, subprocess builds and stdin prompts
    pub fn system() -> Result<Self> {
        Ok(Self {
            scm: Arc::new(GitScmProvider::new()?),
            manifests: Arc::new(CargoManifestTransformer::new()),
            executor: Arc::new(CommandBuildExecutor::new()),
            prompter: Arc::new(StdinPrompter),
        })
    }
}

impl fmt::Debug for ReleaseToolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseToolkit").finish_non_exhaustive()
    }
}

/// Phases by name
#[derive(Default)]
pub struct PhaseRegistry {
    phases: BTreeMap<String, Box<dyn ReleasePhase>>,
}

impl fmt::Debug for PhaseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.phases.keys()).finish()
    }
}

impl PhaseRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `phase` under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, phase: impl ReleasePhase + 'static) {
        self.phases.insert(name.into(), Box::new(phase));
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, name: impl Into<String>, phase: impl ReleasePhase + 'static) -> Self {
        self.register(name, phase);
        self
    }

    /// Look up a phase
    pub fn get(&self, name: &str) -> Option<&dyn ReleasePhase> {
        self.phases.get(name).map(Box::as_ref)
    }

    /// Look up a phase that must exist
    pub fn require(&self, name: &str) -> Result<&dyn ReleasePhase> {
        self.get(name).ok_or_else(|| {
            ReleaseError::from(ExecutionError::PhaseNotFound {
                name: name.to_string(),
            })
        })
    }

    /// Registered names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.phases.keys().map(String::as_str)
    }

    /// Every built-in phase, wired to `toolkit`
    pub fn with_defaults(toolkit: &ReleaseToolkit) -> Self {
        let ReleaseToolkit {
            scm,
            manifests,
            executor,
            prompter,
        } = toolkit;

        Self::new()
            .with("check-manifests", CheckManifestsPhase::new(true, true))
            .with("check-manifests-update-versions", CheckManifestsPhase::new(false, false))
            .with("scm-check-modifications", ScmCheckModificationsPhase::new(scm.clone()))
            .with("check-dependency-snapshots", CheckDependencySnapshotsPhase::new(prompter.clone()))
            .with("verify-completed-prepare-phases", VerifyCompletedPreparePhasesPhase)
            .with("create-backup-manifests", CreateBackupManifestsPhase)
            .with("restore-backup-manifests", RestoreBackupManifestsPhase)
            .with("map-release-versions", MapVersionsPhase::new(VersionMode::Release, prompter.clone()))
            .with("map-development-versions", MapVersionsPhase::new(VersionMode::Development, prompter.clone()))
            .with("map-branch-versions", MapVersionsPhase::new(VersionMode::Branch, prompter.clone()))
            .with("input-variables", InputVariablesPhase::new(false, prompter.clone()))
            .with("branch-input-variables", InputVariablesPhase::new(true, prompter.clone()))
            .with("rewrite-manifests-for-release", RewriteManifestsPhase::new(RewriteMode::Release, manifests.clone()))
            .with("rewrite-manifests-for-development", RewriteManifestsPhase::new(RewriteMode::Development, manifests.clone()))
            .with("rewrite-manifests-for-branch", RewriteManifestsPhase::new(RewriteMode::Branch, manifests.clone()))
            .with("rewrite-manifest-versions", RewriteManifestsPhase::new(RewriteMode::Versions, manifests.clone()))
            .with("run-preparation-goals", RunGoalsPhase::new(GoalsKind::Preparation, executor.clone()))
            .with("run-completion-goals", RunGoalsPhase::new(GoalsKind::Completion, executor.clone()))
            .with("run-perform-goals", RunGoalsPhase::new(GoalsKind::Perform, executor.clone()))
            .with("scm-commit-release", ScmCommitPhase::new(CommitKind::Release, scm.clone()))
            .with("scm-commit-development", ScmCommitPhase::new(CommitKind::Development, scm.clone()))
            .with("scm-commit-branch", ScmCommitPhase::new(CommitKind::Branch, scm.clone()))
            .with("scm-commit-rollback", ScmCommitPhase::new(CommitKind::Rollback, scm.clone()))
            .with("scm-tag", ScmTagPhase::new(scm.clone()))
            .with("scm-branch", ScmBranchPhase::new(scm.clone()))
            .with("remove-scm-tag", RemoveScmTagPhase::new(scm.clone()))
            .with("checkout-project-from-scm", CheckoutProjectFromScmPhase::new(scm.clone()))
            .with(END_RELEASE_PHASE, EndReleasePhase)
    }
}

/// `path` with `suffix` appended to its file name (`Cargo.toml` -> `Cargo.toml.tag`)
pub(crate) fn suffixed(path: &Path, suffix: &str) -> std::path::PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Remove `path` if it exists, recording the outcome
pub(crate) fn remove_if_exists(path: &Path, result: &mut ReleaseResult) {
    match std::fs::remove_file(path) {
        Ok(()) => result.debug(format!("Removed {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => result.warn(format!("Failed to remove {}: {}", path.display(), e)),
    }
}

/// Write `content` to `path` via a temp file and rename
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let temp = suffixed(path, ".tmp");
    std::fs::write(&temp, content)
        .map_err(|e| ReleaseError::io(format!("Failed to write {}", temp.display()), e))?;
    std::fs::rename(&temp, path)
        .map_err(|e| ReleaseError::io(format!("Failed to replace {}", path.display()), e))
}
