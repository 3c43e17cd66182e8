//! # Kodegen Release Manager
//!
//! Phased, resumable release orchestration for Cargo workspaces.
//!
//! A release goal (prepare, perform, rollback, branch, update-versions) is
//! an ordered list of named phases taken from a strategy. The
//! [`ReleaseManager`] runs them against one shared [`ReleaseDescriptor`],
//! recording the last completed prepare phase in `release.json` so an
//! interrupted run picks up where it stopped.
//!
//! ## Features
//!
//! - **Resumable prepare**: progress is persisted after every phase
//! - **Dry runs**: phases simulate into `Cargo.toml.tag`/`.next`/`.branch` shadow files
//! - **Pluggable strategies**: `release.toml` can define per-goal phase lists
//! - **Format-preserving rewrites**: manifests are edited with `toml_edit`
//! - **Rollback**: restores manifest backups and removes the release tag
//!
//! ## Usage
//!
//! ```bash
//! kodegen_release_manager prepare --batch          # Map versions, commit and tag
//! kodegen_release_manager prepare --dry-run        # Write shadow manifests only
//! kodegen_release_manager perform                  # Build the tag and publish
//! kodegen_release_manager rollback                 # Undo the last prepare
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod exec;
pub mod listener;
pub mod manager;
pub mod phase;
pub mod prompt;
pub mod result;
pub mod scm;
pub mod state;
pub mod strategy;
pub mod version;
pub mod workspace;

// Re-export main types for public API
pub use descriptor::{ReleaseDescriptor, ReleaseDescriptorBuilder};
pub use error::{ExecutionError, FailureError, ReleaseError, Result};
pub use listener::{LoggingListener, ReleaseListener};
pub use manager::{BranchRequest, PerformRequest, PrepareRequest, ReleaseManager, ReleaseRequest};
pub use phase::{PhaseContext, PhaseRegistry, ReleaseEnvironment, ReleasePhase, ReleaseToolkit};
pub use result::{ReleaseResult, ResultCode};
pub use state::{ConfigStore, FileConfigStore};
pub use strategy::{Goal, Strategy, StrategyRegistry};
pub use workspace::{ModuleKey, ReleaseProject};
