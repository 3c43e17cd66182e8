//! Persisted release progress.
//!
//! This module stores the release descriptor between runs so that a failed
//! or interrupted `prepare` can resume from its last completed phase.

mod manager;
mod release_state;

pub use manager::{ConfigStore, FileConfigStore};
pub use release_state::{ExecState, ProjectState, ReleaseState, ScmState};

/// Name of the state file kept in the working directory
pub const STATE_FILE_NAME: &str = "release.json";
