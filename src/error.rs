//! Error types for release orchestration.
//!
//! Every failure surfaced to the release manager falls into one of two
//! categories: an [`ExecutionError`] (the environment or configuration broke)
//! or a [`FailureError`] (the user has something actionable to fix). The
//! orchestrator treats both identically; callers decide how to report them.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Top-level error for all release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Unexpected or environmental failure
    #[error("Release execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Expected, user-actionable failure
    #[error("Release failure: {0}")]
    Failure(#[from] FailureError),
}

/// Unexpected failures: I/O, unresolvable configuration, persistence
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Filesystem operation failed
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted
        context: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A strategy names a phase that is not registered
    #[error("Unable to find phase '{name}' to execute")]
    PhaseNotFound {
        /// Phase name
        name: String,
    },

    /// Persisted release state could not be read
    #[error("Error reading stored configuration at {path}: {reason}")]
    StateRead {
        /// State file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Persisted release state could not be written
    #[error("Error writing release state at {path}: {reason}")]
    StateWrite {
        /// State file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Version control command failed
    #[error("SCM {operation} failed: {reason}")]
    Scm {
        /// Operation that failed
        operation: String,
        /// Reason for the error
        reason: String,
    },

    /// External build invocation failed
    #[error("Build command '{command}' failed: {reason}")]
    Build {
        /// Command that was run
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Manifest could not be parsed or rewritten
    #[error("Manifest error in {path}: {reason}")]
    Manifest {
        /// Manifest path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// `release.toml` could not be read or parsed
    #[error("Invalid release settings in {path}: {reason}")]
    Config {
        /// Settings file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// A rollback needs a backup that does not exist
    #[error("Cannot restore from a missing backup manifest: {path}")]
    MissingBackup {
        /// Expected backup path
        path: PathBuf,
    },

    /// Interactive prompt could not be answered
    #[error("Prompt failed: {reason}")]
    Prompt {
        /// Reason for the error
        reason: String,
    },
}

/// Expected failures the user can act on
#[derive(Error, Debug)]
pub enum FailureError {
    /// No strategy registered under the requested id
    #[error("Unknown release strategy '{id}'")]
    UnknownStrategy {
        /// Strategy id
        id: String,
    },

    /// Prepare requires at least one snapshot module
    #[error("You don't have a SNAPSHOT project in the reactor projects list")]
    NoSnapshotInReactor,

    /// Tag or branch name missing
    #[error("Missing required setting: release label (tag or branch name)")]
    ReleaseLabelRequired,

    /// SCM URL missing
    #[error("Missing required setting: scm url")]
    MissingScmUrl,

    /// Working copy has uncommitted changes
    #[error("Cannot prepare the release because you have local modifications: {files:?}")]
    LocalModifications {
        /// Modified files
        files: Vec<String>,
    },

    /// Snapshot dependencies outside the reactor were not resolved
    #[error("Can't release project due to non released dependencies: {dependencies:?}")]
    UnreleasedDependencies {
        /// Offending dependencies
        dependencies: Vec<String>,
    },

    /// Perform was started on top of an unfinished prepare
    #[error(
        "Cannot perform release - the preparation step was stopped unexpectedly (last completed phase: '{completed_phase}')"
    )]
    IncompletePrepare {
        /// Last completed prepare phase
        completed_phase: String,
    },

    /// A module reached a rewrite without a mapped version
    #[error("Version for '{module}' was not mapped in the {map} version map")]
    VersionNotMapped {
        /// Module key
        module: String,
        /// Which map was consulted
        map: String,
    },

    /// A version string cannot be used
    #[error("Invalid version '{version}' for '{module}'")]
    InvalidVersion {
        /// Module key
        module: String,
        /// Version string
        version: String,
    },
}

impl ReleaseError {
    /// Whether this is a user-actionable failure rather than an execution error
    pub fn is_failure(&self) -> bool {
        matches!(self, ReleaseError::Failure(_))
    }

    /// Wrap an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ReleaseError::Execution(ExecutionError::Io {
            context: context.into(),
            source,
        })
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Failure(FailureError::UnknownStrategy { id }) => vec![
                format!("Define a strategy named '{}' in release.toml", id),
                "Omit --strategy to use the default strategy".to_string(),
            ],
            ReleaseError::Failure(FailureError::NoSnapshotInReactor) => vec![
                "Set the workspace version to a -SNAPSHOT version before preparing".to_string(),
            ],
            ReleaseError::Failure(FailureError::ReleaseLabelRequired) => vec![
                "Pass the tag or branch name with --tag <name>".to_string(),
            ],
            ReleaseError::Failure(FailureError::MissingScmUrl) => vec![
                "Set scm-url in release.toml or pass --scm-url".to_string(),
            ],
            ReleaseError::Failure(FailureError::LocalModifications { .. }) => vec![
                "Commit pending changes: git add . && git commit -m 'message'".to_string(),
                "Stash changes temporarily: git stash".to_string(),
            ],
            ReleaseError::Failure(FailureError::IncompletePrepare { .. }) => vec![
                "Resume the preparation: prepare (resume is the default)".to_string(),
                "Start the preparation again: prepare --no-resume".to_string(),
            ],
            ReleaseError::Execution(ExecutionError::StateWrite { .. }) => vec![
                "Check that the working directory is writable".to_string(),
                "Re-run prepare; the last phase will be executed again".to_string(),
            ],
            ReleaseError::Execution(ExecutionError::PhaseNotFound { name }) => vec![format!(
                "Remove '{}' from the strategy or register a phase with that name",
                name
            )],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_and_execution_are_distinguished() {
        let failure: ReleaseError = FailureError::NoSnapshotInReactor.into();
        let execution: ReleaseError = ExecutionError::PhaseNotFound {
            name: "scm-tag".to_string(),
        }
        .into();

        assert!(failure.is_failure());
        assert!(!execution.is_failure());
        assert_eq!(
            execution.to_string(),
            "Release execution error: Unable to find phase 'scm-tag' to execute"
        );
    }

    #[test]
    fn suggestions_are_never_empty() {
        let err: ReleaseError = FailureError::UnknownStrategy {
            id: "nightly".to_string(),
        }
        .into();
        assert!(err.recovery_suggestions()[0].contains("nightly"));

        let err = ReleaseError::io("reading", std::io::Error::other("boom"));
        assert!(!err.recovery_suggestions().is_empty());
    }
}
