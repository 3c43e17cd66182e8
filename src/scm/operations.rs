//! Version control operations needed by release phases.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Outcome of a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Revision id of the new (or current, when nothing changed) commit
    pub revision: String,
    /// Whether a new commit was created
    pub created: bool,
}

/// Version control backend used by the SCM phases
///
/// All operations act on the repository containing `dir`.
pub trait ScmProvider: Send + Sync {
    /// Paths with uncommitted changes, relative to the repository root
    fn status(&self, dir: &Path) -> Result<Vec<String>>;

    /// Commit `files` with `message`
    fn checkin(&self, dir: &Path, files: &[PathBuf], message: &str) -> Result<CommitInfo>;

    /// Create an annotated tag at the current revision
    fn tag(&self, dir: &Path, name: &str, message: &str) -> Result<()>;

    /// Create a branch at the current revision
    fn branch(&self, dir: &Path, name: &str) -> Result<()>;

    /// Delete a tag, optionally on the remote as well
    fn untag(&self, dir: &Path, name: &str, remote: bool) -> Result<()>;

    /// Push the current branch, or a specific ref when `refspec` is given
    fn push(&self, dir: &Path, refspec: Option<&str>) -> Result<()>;

    /// Check out `label` from `source` into `target`
    fn checkout(&self, source: &str, label: &str, target: &Path) -> Result<()>;
}
