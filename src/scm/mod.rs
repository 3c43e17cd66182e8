//! Version control integration.

mod git_adapter;
mod operations;

pub use git_adapter::{DEFAULT_REMOTE, GitScmProvider};
pub use operations::{CommitInfo, ScmProvider};
