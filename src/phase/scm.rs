//! Phases talking to version control.

use super::{PhaseContext, ReleasePhase};
use crate::descriptor::ReleaseDescriptor;
use crate::error::{FailureError, ReleaseError, Result};
use crate::result::ReleaseResult;
use crate::scm::ScmProvider;
use crate::workspace::release_manifests;
use std::path::PathBuf;
use std::sync::Arc;

fn release_label(descriptor: &ReleaseDescriptor) -> Result<&str> {
    descriptor
        .scm_release_label
        .as_deref()
        .ok_or_else(|| FailureError::ReleaseLabelRequired.into())
}

/// Which commit a [`ScmCommitPhase`] makes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// Manifests at release versions
    Release,
    /// Manifests at next development versions
    Development,
    /// Manifests at branch versions
    Branch,
    /// Manifests restored from backup
    Rollback,
}

/// Commits the rewritten manifests
pub struct ScmCommitPhase {
    kind: CommitKind,
    scm: Arc<dyn ScmProvider>,
}

impl ScmCommitPhase {
    /// Create the phase
    pub fn new(kind: CommitKind, scm: Arc<dyn ScmProvider>) -> Self {
        Self { kind, scm }
    }

    fn message(&self, descriptor: &ReleaseDescriptor) -> Result<String> {
        let message = match self.kind {
            CommitKind::Release => format!("prepare release {}", release_label(descriptor)?),
            CommitKind::Development => "prepare for next development iteration".to_string(),
            CommitKind::Branch => format!("prepare branch {}", release_label(descriptor)?),
            CommitKind::Rollback => format!("rollback the release of {}", release_label(descriptor)?),
        };
        Ok(descriptor.commit_message(&message))
    }

    /// Reason to skip the commit, if any
    fn skip_reason(&self, descriptor: &ReleaseDescriptor) -> Option<&'static str> {
        match self.kind {
            CommitKind::Release if descriptor.suppress_commit_before_tag_or_branch => {
                Some("commits before tagging are suppressed")
            }
            CommitKind::Branch if descriptor.suppress_commit_before_tag_or_branch => {
                Some("commits before branching are suppressed")
            }
            CommitKind::Branch if !descriptor.update_branch_versions => Some("branch versions are unchanged"),
            CommitKind::Development if !descriptor.update_working_copy_versions => {
                Some("working copy versions are unchanged")
            }
            _ => None,
        }
    }

    /// Files to commit, grouped per commit
    fn batches(ctx: &PhaseContext<'_>) -> Vec<Vec<PathBuf>> {
        let manifests = release_manifests(&ctx.descriptor.working_directory, ctx.projects);
        if ctx.descriptor.commit_by_project {
            manifests.into_iter().map(|m| vec![m]).collect()
        } else {
            vec![manifests]
        }
    }
}

impl ReleasePhase for ScmCommitPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        if let Some(reason) = self.skip_reason(ctx.descriptor) {
            result.info(format!("Not committing: {}", reason));
            return Ok(());
        }
        let message = self.message(ctx.descriptor)?;
        let working_dir = ctx.descriptor.working_directory.clone();

        result.info(format!("Checking in modified manifests: {}", message));
        for files in Self::batches(ctx) {
            let commit = self.scm.checkin(&working_dir, &files, &message)?;
            if self.kind == CommitKind::Release {
                ctx.descriptor.scm_released_revision = Some(commit.revision.clone());
            }
            result.debug(format!("Committed revision {}", commit.revision));
        }

        if ctx.descriptor.push_changes {
            self.scm.push(&working_dir, None)?;
            result.info("Pushed changes");
        }
        Ok(())
    }

    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        if let Some(reason) = self.skip_reason(ctx.descriptor) {
            result.info(format!("Not committing: {}", reason));
            return Ok(());
        }
        let message = self.message(ctx.descriptor)?;
        let files: usize = Self::batches(ctx).iter().map(Vec::len).sum();
        result.info(format!("Full run would commit {} file(s) with message: '{}'", files, message));
        Ok(())
    }
}

/// Tags the release commit
pub struct ScmTagPhase {
    scm: Arc<dyn ScmProvider>,
}

impl ScmTagPhase {
    /// Create the phase
    pub fn new(scm: Arc<dyn ScmProvider>) -> Self {
        Self { scm }
    }
}

impl ReleasePhase for ScmTagPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let descriptor = &*ctx.descriptor;
        let label = release_label(descriptor)?;
        let message = descriptor.commit_message(&format!("copy for tag {}", label));

        result.info(format!("Tagging release with the label {}...", label));
        self.scm.tag(&descriptor.working_directory, label, &message)?;

        if descriptor.remote_tagging && descriptor.push_changes {
            self.scm
                .push(&descriptor.working_directory, Some(&format!("refs/tags/{}", label)))?;
            result.info(format!("Pushed tag {}", label));
        }
        Ok(())
    }

    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let label = release_label(ctx.descriptor)?;
        result.info(format!("Full run would tag working copy with label: '{}'", label));
        Ok(())
    }
}

/// Creates the release branch
pub struct ScmBranchPhase {
    scm: Arc<dyn ScmProvider>,
}

impl ScmBranchPhase {
    /// Create the phase
    pub fn new(scm: Arc<dyn ScmProvider>) -> Self {
        Self { scm }
    }
}

impl ReleasePhase for ScmBranchPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let descriptor = &*ctx.descriptor;
        let label = release_label(descriptor)?;

        result.info(format!("Branching release with the label {}...", label));
        self.scm.branch(&descriptor.working_directory, label)?;

        if descriptor.push_changes {
            self.scm
                .push(&descriptor.working_directory, Some(&format!("refs/heads/{}", label)))?;
        }
        Ok(())
    }

    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let label = release_label(ctx.descriptor)?;
        result.info(format!("Full run would branch working copy with label: '{}'", label));
        Ok(())
    }
}

/// Deletes the tag created by prepare
pub struct RemoveScmTagPhase {
    scm: Arc<dyn ScmProvider>,
}

impl RemoveScmTagPhase {
    /// Create the phase
    pub fn new(scm: Arc<dyn ScmProvider>) -> Self {
        Self { scm }
    }
}

impl ReleasePhase for RemoveScmTagPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let descriptor = &*ctx.descriptor;
        let Some(label) = descriptor.scm_release_label.as_deref() else {
            result.warn("No release label recorded, no tag to remove");
            return Ok(());
        };
        let remote = descriptor.remote_tagging && descriptor.push_changes;

        result.info(format!("Removing tag with the label {}...", label));
        self.scm.untag(&descriptor.working_directory, label, remote)
    }

    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        match ctx.descriptor.scm_release_label.as_deref() {
            Some(label) => result.info(format!("Full run would remove tag with label: '{}'", label)),
            None => result.warn("No release label recorded, no tag to remove"),
        }
        Ok(())
    }
}

/// Checks out the tagged sources for perform
///
/// The checkout directory is emptied first.
pub struct CheckoutProjectFromScmPhase {
    scm: Arc<dyn ScmProvider>,
}

impl CheckoutProjectFromScmPhase {
    /// Create the phase
    pub fn new(scm: Arc<dyn ScmProvider>) -> Self {
        Self { scm }
    }

    fn source(descriptor: &ReleaseDescriptor) -> Result<String> {
        if descriptor.local_checkout {
            return Ok(descriptor.working_directory.display().to_string());
        }
        descriptor
            .scm_source_url
            .clone()
            .ok_or_else(|| FailureError::MissingScmUrl.into())
    }
}

impl ReleasePhase for CheckoutProjectFromScmPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let descriptor = &*ctx.descriptor;
        let label = release_label(descriptor)?;
        let source = Self::source(descriptor)?;
        let target = &descriptor.checkout_directory;

        if target.exists() {
            std::fs::remove_dir_all(target)
                .map_err(|e| ReleaseError::io(format!("Failed to remove {}", target.display()), e))?;
        }

        result.info(format!("Checking out {} at {} into {}", source, label, target.display()));
        self.scm.checkout(&source, label, target)
    }

    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let descriptor = &*ctx.descriptor;
        let label = release_label(descriptor)?;
        let source = Self::source(descriptor)?;
        result.info(format!(
            "Full run would check out {} at {} into {}",
            source,
            label,
            descriptor.checkout_directory.display()
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Fixture, RecordingScm};
    use super::*;

    fn labelled() -> Fixture {
        let mut fixture = Fixture::new("1.0");
        fixture.descriptor.scm_release_label = Some("app-1.0".to_string());
        fixture
    }

    #[test]
    fn release_commit_records_revision_and_pushes() {
        let scm = Arc::new(RecordingScm::default());
        let mut fixture = labelled();
        let (outcome, _) = fixture.run(&ScmCommitPhase::new(CommitKind::Release, scm.clone()), false);
        outcome.unwrap();

        assert_eq!(fixture.descriptor.scm_released_revision.as_deref(), Some("abc123"));
        assert_eq!(scm.calls(), vec!["checkin 1 [release] prepare release app-1.0", "push HEAD"]);
    }

    #[test]
    fn simulated_scm_phases_make_no_calls() {
        let scm = Arc::new(RecordingScm::default());
        let mut fixture = labelled();
        fixture.descriptor.scm_source_url = Some("https://example.com/app.git".to_string());

        let phases: Vec<Box<dyn ReleasePhase>> = vec![
            Box::new(ScmCommitPhase::new(CommitKind::Release, scm.clone())),
            Box::new(ScmTagPhase::new(scm.clone())),
            Box::new(ScmBranchPhase::new(scm.clone())),
            Box::new(RemoveScmTagPhase::new(scm.clone())),
            Box::new(CheckoutProjectFromScmPhase::new(scm.clone())),
        ];
        for phase in &phases {
            let (outcome, result) = fixture.run(phase.as_ref(), true);
            outcome.unwrap();
            assert!(result.output().contains("Full run would"));
        }
        assert!(scm.calls().is_empty());
    }

    #[test]
    fn tag_is_pushed_only_with_remote_tagging() {
        let scm = Arc::new(RecordingScm::default());
        let mut fixture = labelled();
        fixture.descriptor.remote_tagging = false;
        let (outcome, _) = fixture.run(&ScmTagPhase::new(scm.clone()), false);
        outcome.unwrap();
        assert_eq!(scm.calls(), vec!["tag app-1.0"]);

        fixture.descriptor.remote_tagging = true;
        let (outcome, _) = fixture.run(&ScmTagPhase::new(scm.clone()), false);
        outcome.unwrap();
        assert_eq!(scm.calls()[2], "push refs/tags/app-1.0");
    }

    #[test]
    fn label_is_required() {
        let scm = Arc::new(RecordingScm::default());
        let mut fixture = Fixture::new("1.0");
        let (outcome, _) = fixture.run(&ScmTagPhase::new(scm.clone()), false);
        assert!(outcome.unwrap_err().is_failure());
        assert!(scm.calls().is_empty());
    }

    #[test]
    fn development_commit_skipped_without_working_copy_update() {
        let scm = Arc::new(RecordingScm::default());
        let mut fixture = labelled();
        fixture.descriptor.update_working_copy_versions = false;
        let (outcome, result) = fixture.run(&ScmCommitPhase::new(CommitKind::Development, scm.clone()), false);
        outcome.unwrap();
        assert!(result.output().contains("Not committing"));
        assert!(scm.calls().is_empty());
    }

    #[test]
    fn checkout_uses_local_directory_when_asked() {
        let scm = Arc::new(RecordingScm::default());
        let mut fixture = labelled();
        fixture.descriptor.local_checkout = true;
        let (outcome, _) = fixture.run(&CheckoutProjectFromScmPhase::new(scm.clone()), false);
        outcome.unwrap();
        let calls = scm.calls();
        assert!(calls[0].starts_with(&format!("checkout {} app-1.0", fixture.dir.path().display())));
    }
}
