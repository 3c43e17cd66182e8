//! Pre-merge descriptor values supplied by the caller.

use super::{
    DEFAULT_CHECKOUT_DIRECTORY, DEFAULT_COMMENT_PREFIX, DEFAULT_STRATEGY_ID,
    DEFAULT_TAG_NAME_FORMAT, ReleaseDescriptor, ScmInfo, VersionTriple,
};
use crate::workspace::ModuleKey;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Optional descriptor values; unset fields take defaults in [`build`](Self::build)
#[derive(Debug, Clone, Default)]
pub struct ReleaseDescriptorBuilder {
    /// See [`ReleaseDescriptor::working_directory`]
    pub working_directory: PathBuf,
    /// See [`ReleaseDescriptor::checkout_directory`]
    pub checkout_directory: Option<PathBuf>,
    /// See [`ReleaseDescriptor::scm_source_url`]
    pub scm_source_url: Option<String>,
    /// See [`ReleaseDescriptor::scm_release_label`]
    pub scm_release_label: Option<String>,
    /// See [`ReleaseDescriptor::scm_tag_name_format`]
    pub scm_tag_name_format: Option<String>,
    /// See [`ReleaseDescriptor::scm_comment_prefix`]
    pub scm_comment_prefix: Option<String>,
    /// See [`ReleaseDescriptor::scm_released_revision`]
    pub scm_released_revision: Option<String>,
    /// See [`ReleaseDescriptor::release_strategy_id`]
    pub release_strategy_id: Option<String>,

    /// See [`ReleaseDescriptor::interactive`]
    pub interactive: Option<bool>,
    /// See [`ReleaseDescriptor::auto_version_submodules`]
    pub auto_version_submodules: Option<bool>,
    /// See [`ReleaseDescriptor::update_working_copy_versions`]
    pub update_working_copy_versions: Option<bool>,
    /// See [`ReleaseDescriptor::update_branch_versions`]
    pub update_branch_versions: Option<bool>,
    /// See [`ReleaseDescriptor::branch_creation`]
    pub branch_creation: Option<bool>,
    /// See [`ReleaseDescriptor::allow_timestamped_snapshots`]
    pub allow_timestamped_snapshots: Option<bool>,
    /// See [`ReleaseDescriptor::suppress_commit_before_tag_or_branch`]
    pub suppress_commit_before_tag_or_branch: Option<bool>,
    /// See [`ReleaseDescriptor::remote_tagging`]
    pub remote_tagging: Option<bool>,
    /// See [`ReleaseDescriptor::push_changes`]
    pub push_changes: Option<bool>,
    /// See [`ReleaseDescriptor::add_schema`]
    pub add_schema: Option<bool>,
    /// See [`ReleaseDescriptor::generate_release_manifests`]
    pub generate_release_manifests: Option<bool>,
    /// See [`ReleaseDescriptor::commit_by_project`]
    pub commit_by_project: Option<bool>,
    /// See [`ReleaseDescriptor::use_edit_mode`]
    pub use_edit_mode: Option<bool>,
    /// See [`ReleaseDescriptor::update_dependencies`]
    pub update_dependencies: Option<bool>,
    /// See [`ReleaseDescriptor::local_checkout`]
    pub local_checkout: Option<bool>,

    /// See [`ReleaseDescriptor::default_release_version`]
    pub default_release_version: Option<String>,
    /// See [`ReleaseDescriptor::default_development_version`]
    pub default_development_version: Option<String>,

    /// See [`ReleaseDescriptor::preparation_goals`]
    pub preparation_goals: Option<Vec<String>>,
    /// See [`ReleaseDescriptor::completion_goals`]
    pub completion_goals: Option<Vec<String>>,
    /// See [`ReleaseDescriptor::perform_goals`]
    pub perform_goals: Option<Vec<String>>,
    /// See [`ReleaseDescriptor::additional_arguments`]
    pub additional_arguments: Option<String>,
    /// See [`ReleaseDescriptor::build_tool`]
    pub build_tool: Option<String>,
    /// See [`ReleaseDescriptor::active_profiles`]
    pub active_profiles: Vec<String>,

    /// See [`ReleaseDescriptor::original_versions`]
    pub original_versions: BTreeMap<ModuleKey, String>,
    /// See [`ReleaseDescriptor::release_versions`]
    pub release_versions: BTreeMap<ModuleKey, String>,
    /// See [`ReleaseDescriptor::development_versions`]
    pub development_versions: BTreeMap<ModuleKey, String>,
    /// See [`ReleaseDescriptor::resolved_snapshot_dependencies`]
    pub resolved_snapshot_dependencies: BTreeMap<ModuleKey, VersionTriple>,
    /// See [`ReleaseDescriptor::original_scm_info`]
    pub original_scm_info: BTreeMap<ModuleKey, ScmInfo>,

    /// See [`ReleaseDescriptor::completed_phase`]
    pub completed_phase: Option<String>,
}

impl ReleaseDescriptorBuilder {
    /// Create a builder for a release of the project in `working_directory`
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            ..Default::default()
        }
    }

    /// Apply user-supplied override properties
    ///
    /// Recognized keys:
    /// - `release.<group:artifact>` / `development.<group:artifact>`: explicit module versions
    /// - `releaseVersion` / `developmentVersion`: suggested versions for every module
    /// - `tag`, `scm.url`, `strategy`: release label, SCM URL, strategy id
    ///
    /// Unrecognized keys are ignored with a warning.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) {
        for (key, value) in overrides {
            if let Some(module) = key.strip_prefix("release.") {
                self.add_module_version(module, value, true);
            } else if let Some(module) = key.strip_prefix("development.") {
                self.add_module_version(module, value, false);
            } else {
                match key.as_str() {
                    "releaseVersion" => self.default_release_version = Some(value.clone()),
                    "developmentVersion" => self.default_development_version = Some(value.clone()),
                    "tag" => self.scm_release_label = Some(value.clone()),
                    "scm.url" => self.scm_source_url = Some(value.clone()),
                    "strategy" => self.release_strategy_id = Some(value.clone()),
                    _ => log::warn!("Ignoring unrecognized release property '{}'", key),
                }
            }
        }
    }

    fn add_module_version(&mut self, module: &str, version: &str, release: bool) {
        match module.parse::<ModuleKey>() {
            Ok(key) if release => {
                self.release_versions.insert(key, version.to_string());
            }
            Ok(key) => {
                self.development_versions.insert(key, version.to_string());
            }
            Err(reason) => log::warn!("Ignoring version override: {}", reason),
        }
    }

    /// Build the descriptor, applying defaults for unset values
    pub fn build(self) -> ReleaseDescriptor {
        let checkout_directory = self
            .checkout_directory
            .unwrap_or_else(|| self.working_directory.join(DEFAULT_CHECKOUT_DIRECTORY));

        ReleaseDescriptor {
            checkout_directory,
            working_directory: self.working_directory,
            scm_source_url: self.scm_source_url,
            scm_release_label: self.scm_release_label,
            scm_tag_name_format: self
                .scm_tag_name_format
                .unwrap_or_else(|| DEFAULT_TAG_NAME_FORMAT.to_string()),
            scm_comment_prefix: self
                .scm_comment_prefix
                .unwrap_or_else(|| DEFAULT_COMMENT_PREFIX.to_string()),
            scm_released_revision: self.scm_released_revision,
            release_strategy_id: self
                .release_strategy_id
                .unwrap_or_else(|| DEFAULT_STRATEGY_ID.to_string()),

            interactive: self.interactive.unwrap_or(true),
            auto_version_submodules: self.auto_version_submodules.unwrap_or(false),
            update_working_copy_versions: self.update_working_copy_versions.unwrap_or(true),
            update_branch_versions: self.update_branch_versions.unwrap_or(false),
            branch_creation: self.branch_creation.unwrap_or(false),
            allow_timestamped_snapshots: self.allow_timestamped_snapshots.unwrap_or(false),
            suppress_commit_before_tag_or_branch: self
                .suppress_commit_before_tag_or_branch
                .unwrap_or(false),
            remote_tagging: self.remote_tagging.unwrap_or(true),
            push_changes: self.push_changes.unwrap_or(true),
            add_schema: self.add_schema.unwrap_or(true),
            generate_release_manifests: self.generate_release_manifests.unwrap_or(false),
            commit_by_project: self.commit_by_project.unwrap_or(false),
            use_edit_mode: self.use_edit_mode.unwrap_or(false),
            update_dependencies: self.update_dependencies.unwrap_or(true),
            local_checkout: self.local_checkout.unwrap_or(false),

            default_release_version: self.default_release_version,
            default_development_version: self.default_development_version,

            preparation_goals: self
                .preparation_goals
                .unwrap_or_else(|| vec!["test".to_string()]),
            completion_goals: self.completion_goals.unwrap_or_default(),
            perform_goals: self
                .perform_goals
                .unwrap_or_else(|| vec!["publish".to_string()]),
            additional_arguments: self.additional_arguments,
            build_tool: self.build_tool.unwrap_or_else(|| "cargo".to_string()),
            active_profiles: self.active_profiles,

            original_versions: self.original_versions,
            release_versions: self.release_versions,
            development_versions: self.development_versions,
            resolved_snapshot_dependencies: self.resolved_snapshot_dependencies,
            original_scm_info: self.original_scm_info,

            completed_phase: self.completed_phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_applies_defaults() {
        let descriptor = ReleaseDescriptorBuilder::new("/work").build();

        assert_eq!(descriptor.release_strategy_id, "default");
        assert_eq!(descriptor.checkout_directory, PathBuf::from("/work/target/checkout"));
        assert!(descriptor.interactive);
        assert!(descriptor.update_working_copy_versions);
        assert!(descriptor.push_changes);
        assert!(!descriptor.branch_creation);
        assert_eq!(descriptor.preparation_goals, vec!["test".to_string()]);
        assert_eq!(descriptor.completed_phase, None);
    }

    #[test]
    fn overrides_populate_version_maps() {
        let mut builder = ReleaseDescriptorBuilder::new("/work");
        let overrides: BTreeMap<String, String> = [
            ("release.acme:core", "1.0"),
            ("development.acme:core", "1.1-SNAPSHOT"),
            ("release.not-a-key", "9.9"),
            ("tag", "core-1.0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        builder.apply_overrides(&overrides);
        let descriptor = builder.build();
        let key = ModuleKey::new("acme", "core");

        assert_eq!(descriptor.release_version(&key), Some("1.0"));
        assert_eq!(descriptor.development_version(&key), Some("1.1-SNAPSHOT"));
        assert_eq!(descriptor.release_versions.len(), 1);
        assert_eq!(descriptor.scm_release_label.as_deref(), Some("core-1.0"));
    }
}
