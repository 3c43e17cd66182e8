//! The release descriptor: mutable state threaded through every phase.
//!
//! A descriptor is built fresh for each invocation from a
//! [`ReleaseDescriptorBuilder`], optionally overlaid with persisted state on
//! resume, and then mutated in place by successive phases. A phase may read
//! any field but should only write the fields it owns.

mod builder;

pub use builder::ReleaseDescriptorBuilder;

use crate::workspace::{ModuleKey, ReleaseProject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Strategy id used when none is configured, and as the fallback for
/// strategies that leave a goal undefined
pub const DEFAULT_STRATEGY_ID: &str = "default";

/// Default tag name format; `{artifact}`, `{group}` and `{version}` are substituted
pub const DEFAULT_TAG_NAME_FORMAT: &str = "{artifact}-{version}";

/// Default prefix for SCM commit messages
pub const DEFAULT_COMMENT_PREFIX: &str = "[release] ";

/// Default checkout location for perform, relative to the working directory
pub const DEFAULT_CHECKOUT_DIRECTORY: &str = "target/checkout";

/// Release/development versions chosen for an external snapshot dependency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTriple {
    /// Version declared before the release
    pub original: String,
    /// Version to depend on in the release
    pub release: Option<String>,
    /// Version to depend on after the release
    pub development: Option<String>,
}

/// SCM information recorded for a module before the release rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmInfo {
    /// Tag recorded in the manifest before the release rewrite
    pub tag: Option<String>,
}

/// Mutable configuration and progress state for one release run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    /// Directory holding the project being released
    pub working_directory: PathBuf,
    /// Where perform checks out the tagged sources
    pub checkout_directory: PathBuf,
    /// SCM URL of the project
    pub scm_source_url: Option<String>,
    /// Tag (or branch) name
    pub scm_release_label: Option<String>,
    /// Format used to derive a tag name when none is given
    pub scm_tag_name_format: String,
    /// Prefix for every commit message
    pub scm_comment_prefix: String,
    /// Revision produced by the release commit
    pub scm_released_revision: Option<String>,
    /// Strategy selecting the phase lists
    pub release_strategy_id: String,

    /// Prompt the user for versions and tag names
    pub interactive: bool,
    /// Give every submodule the root module's versions
    pub auto_version_submodules: bool,
    /// Rewrite the working copy to the next development versions
    pub update_working_copy_versions: bool,
    /// Change versions on the created branch
    pub update_branch_versions: bool,
    /// This run creates a branch rather than a release
    pub branch_creation: bool,
    /// Timestamped snapshot dependencies are acceptable in a release
    pub allow_timestamped_snapshots: bool,
    /// Tag or branch without committing first
    pub suppress_commit_before_tag_or_branch: bool,
    /// Tag against the remote rather than the working copy
    pub remote_tagging: bool,
    /// Push commits and tags after creating them
    pub push_changes: bool,
    /// Keep schema declarations in rewritten manifests
    ///
    /// Persisted with the release state but not consulted: the
    /// format-preserving rewrite never drops anything from a manifest.
    pub add_schema: bool,
    /// Leave a `Cargo.toml.release` copy of each manifest as rewritten for the release
    pub generate_release_manifests: bool,
    /// Commit each module separately
    pub commit_by_project: bool,
    /// Put files in edit mode before modifying them
    ///
    /// Persisted with the release state but not consulted: git has no
    /// edit (checkout-lock) step.
    pub use_edit_mode: bool,
    /// Rewrite dependency versions along with module versions
    pub update_dependencies: bool,
    /// Check out from the local working directory instead of the SCM URL
    pub local_checkout: bool,

    /// Suggested release version for every module
    pub default_release_version: Option<String>,
    /// Suggested development version for every module
    pub default_development_version: Option<String>,

    /// Build goals run before the release commit
    pub preparation_goals: Vec<String>,
    /// Build goals run after the development rewrite
    pub completion_goals: Vec<String>,
    /// Build goals run against the checked-out tag
    pub perform_goals: Vec<String>,
    /// Extra arguments for every build invocation
    pub additional_arguments: Option<String>,
    /// Build tool executable
    pub build_tool: String,
    /// Profiles activated for build invocations
    pub active_profiles: Vec<String>,

    /// Module versions before the release
    pub original_versions: BTreeMap<ModuleKey, String>,
    /// Module versions for the release (or branch)
    pub release_versions: BTreeMap<ModuleKey, String>,
    /// Module versions after the release
    pub development_versions: BTreeMap<ModuleKey, String>,
    /// External snapshot dependencies resolved during prepare
    pub resolved_snapshot_dependencies: BTreeMap<ModuleKey, VersionTriple>,
    /// SCM information per module captured before the release rewrite
    pub original_scm_info: BTreeMap<ModuleKey, ScmInfo>,

    /// Name of the last phase fully executed
    pub completed_phase: Option<String>,
}

impl ReleaseDescriptor {
    /// Location of the persisted state for this descriptor
    pub fn state_file(&self) -> PathBuf {
        self.working_directory.join(crate::state::STATE_FILE_NAME)
    }

    /// Mapped release version of a module
    pub fn release_version(&self, key: &ModuleKey) -> Option<&str> {
        self.release_versions.get(key).map(String::as_str)
    }

    /// Mapped development version of a module
    pub fn development_version(&self, key: &ModuleKey) -> Option<&str> {
        self.development_versions.get(key).map(String::as_str)
    }

    /// Original version of a module
    pub fn original_version(&self, key: &ModuleKey) -> Option<&str> {
        self.original_versions.get(key).map(String::as_str)
    }

    /// Build a tag name for `project` at `version` from the tag name format
    pub fn format_tag_name(&self, project: &ReleaseProject, version: &str) -> String {
        self.scm_tag_name_format
            .replace("{artifact}", &project.key.artifact)
            .replace("{group}", &project.key.group)
            .replace("{version}", version)
    }

    /// Prefix `message` with the configured comment prefix
    pub fn commit_message(&self, message: &str) -> String {
        format!("{}{}", self.scm_comment_prefix, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_name_substitutes_placeholders() {
        let descriptor = ReleaseDescriptorBuilder::new("/work").build();
        let project = ReleaseProject::new(ModuleKey::new("acme", "core"), "1.0-SNAPSHOT", "/work/Cargo.toml");

        assert_eq!(descriptor.format_tag_name(&project, "1.0"), "core-1.0");

        let descriptor = ReleaseDescriptorBuilder {
            scm_tag_name_format: Some("{group}/{artifact}/v{version}".to_string()),
            ..ReleaseDescriptorBuilder::new("/work")
        }
        .build();
        assert_eq!(descriptor.format_tag_name(&project, "1.0"), "acme/core/v1.0");
    }

    #[test]
    fn commit_message_uses_prefix() {
        let descriptor = ReleaseDescriptorBuilder::new("/work").build();
        assert_eq!(
            descriptor.commit_message("prepare release core-1.0"),
            "[release] prepare release core-1.0"
        );
    }
}
