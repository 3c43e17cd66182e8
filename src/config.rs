//! Project-level release settings from `release.toml`.
//!
//! ```toml
//! scm-url = "https://github.com/acme/app.git"
//! tag-name-format = "v{version}"
//! preparation-goals = ["test", "build --release"]
//! perform-goals = ["publish"]
//! push-changes = false
//!
//! [strategies.quick]
//! prepare = ["check-manifests", "map-release-versions", "rewrite-manifests-for-release", "end-release"]
//! ```
//!
//! Every setting is optional. Settings seed the descriptor builder; command
//! line values applied afterwards take precedence.

use crate::descriptor::ReleaseDescriptorBuilder;
use crate::error::{ExecutionError, ReleaseError, Result};
use crate::strategy::{Strategy, StrategyRegistry};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings file name looked up in the working directory
pub const SETTINGS_FILE_NAME: &str = "release.toml";

/// Contents of `release.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ReleaseSettings {
    /// SCM URL of the project
    pub scm_url: Option<String>,
    /// Tag name format
    pub tag_name_format: Option<String>,
    /// Commit message prefix
    pub comment_prefix: Option<String>,
    /// Strategy used when none is given on the command line
    pub strategy: Option<String>,
    /// Checkout directory for perform, relative to the working directory
    pub checkout_directory: Option<PathBuf>,

    /// Goals run before the release commit
    pub preparation_goals: Option<Vec<String>>,
    /// Goals run after the development rewrite
    pub completion_goals: Option<Vec<String>>,
    /// Goals run against the tagged checkout
    pub perform_goals: Option<Vec<String>>,
    /// Build tool executable
    pub build_tool: Option<String>,
    /// Extra build arguments
    pub additional_arguments: Option<String>,
    /// Profiles (cargo features) activated for builds
    pub profiles: Vec<String>,

    /// Give submodules the root module's versions
    pub auto_version_submodules: Option<bool>,
    /// Rewrite the working copy to the next development versions
    pub update_working_copy_versions: Option<bool>,
    /// Change versions on created branches
    pub update_branch_versions: Option<bool>,
    /// Accept timestamped snapshot dependencies
    pub allow_timestamped_snapshots: Option<bool>,
    /// Tag or branch without committing first
    pub suppress_commit_before_tag_or_branch: Option<bool>,
    /// Tag against the remote
    pub remote_tagging: Option<bool>,
    /// Push commits and tags
    pub push_changes: Option<bool>,
    /// Commit each module separately
    pub commit_by_project: Option<bool>,
    /// Rewrite dependency versions along with module versions
    pub update_dependencies: Option<bool>,
    /// Check out from the local working directory during perform
    pub local_checkout: Option<bool>,

    /// Additional strategies by id
    pub strategies: BTreeMap<String, Strategy>,
}

impl ReleaseSettings {
    /// Load `release.toml` from `working_dir`; a missing file yields defaults
    pub fn load(working_dir: &Path) -> Result<Self> {
        let path = working_dir.join(SETTINGS_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ReleaseError::io(format!("Failed to read {}", path.display()), e)),
        }
    }

    /// Parse settings text read from `path`
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).map_err(|e| ExecutionError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        log::debug!(
            "Loaded release settings from {} ({} custom strategies)",
            path.display(),
            settings.strategies.len()
        );
        Ok(settings)
    }

    /// Seed `builder` with these settings
    pub fn apply(&self, builder: &mut ReleaseDescriptorBuilder) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        set(&mut builder.scm_source_url, &self.scm_url);
        set(&mut builder.scm_tag_name_format, &self.tag_name_format);
        set(&mut builder.scm_comment_prefix, &self.comment_prefix);
        set(&mut builder.release_strategy_id, &self.strategy);
        if let Some(dir) = &self.checkout_directory {
            builder.checkout_directory = Some(builder.working_directory.join(dir));
        }

        set(&mut builder.preparation_goals, &self.preparation_goals);
        set(&mut builder.completion_goals, &self.completion_goals);
        set(&mut builder.perform_goals, &self.perform_goals);
        set(&mut builder.build_tool, &self.build_tool);
        set(&mut builder.additional_arguments, &self.additional_arguments);
        for profile in &self.profiles {
            if !builder.active_profiles.contains(profile) {
                builder.active_profiles.push(profile.clone());
            }
        }

        set(&mut builder.auto_version_submodules, &self.auto_version_submodules);
        set(&mut builder.update_working_copy_versions, &self.update_working_copy_versions);
        set(&mut builder.update_branch_versions, &self.update_branch_versions);
        set(&mut builder.allow_timestamped_snapshots, &self.allow_timestamped_snapshots);
        set(
            &mut builder.suppress_commit_before_tag_or_branch,
            &self.suppress_commit_before_tag_or_branch,
        );
        set(&mut builder.remote_tagging, &self.remote_tagging);
        set(&mut builder.push_changes, &self.push_changes);
        set(&mut builder.commit_by_project, &self.commit_by_project);
        set(&mut builder.update_dependencies, &self.update_dependencies);
        set(&mut builder.local_checkout, &self.local_checkout);
    }

    /// Built-in strategies plus those defined in the settings
    pub fn strategy_registry(&self) -> StrategyRegistry {
        let mut registry = StrategyRegistry::new();
        for (id, strategy) in &self.strategies {
            registry.register(Strategy {
                id: id.clone(),
                ..strategy.clone()
            });
        }
        registry
    }
}
