//! Serialized form of the release descriptor.
//!
//! The state file is a JSON document mirroring the descriptor fields. Per-module
//! maps are keyed by the module id (`group:artifact`).

use crate::descriptor::{ReleaseDescriptor, ReleaseDescriptorBuilder, ScmInfo, VersionTriple};
use crate::workspace::ModuleKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// SCM settings of a persisted release
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScmState {
    /// SCM URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Release label (tag or branch name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Tag name format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name_format: Option<String>,
    /// Commit message prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_prefix: Option<String>,
    /// Revision of the release commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_revision: Option<String>,
}

/// Build settings of a persisted release
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecState {
    /// Goals run before the release commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation_goals: Option<Vec<String>>,
    /// Goals run after the development rewrite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_goals: Option<Vec<String>>,
    /// Goals run against the checked-out tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perform_goals: Option<Vec<String>>,
    /// Extra arguments for every build invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_arguments: Option<String>,
    /// Build tool executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_tool: Option<String>,
    /// Active profiles
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activate_profiles: Vec<String>,
}

/// Versions recorded for one reactor module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    /// Version before the release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Release (or branch) version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// Next development version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development: Option<String>,
    /// Manifest SCM information captured before the release rewrite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scm: Option<ScmInfo>,
}

/// Persisted release progress
///
/// `interactive` is a per-invocation setting and is never persisted, and
/// neither is the working directory the state belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseState {
    /// Last phase fully executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_phase: Option<String>,
    /// Strategy id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_strategy_id: Option<String>,
    /// SCM settings
    #[serde(default)]
    pub scm: ScmState,
    /// Build settings
    #[serde(default)]
    pub exec: ExecState,
    /// Perform checkout location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_directory: Option<PathBuf>,
    /// Suggested release version for every module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,
    /// Suggested development version for every module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development_version: Option<String>,
    /// Boolean settings by name
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    /// Per-module versions, keyed by `group:artifact`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, ProjectState>,
    /// Resolved external snapshot dependencies, keyed by `group:artifact`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, VersionTriple>,
}

fn flags(d: &ReleaseDescriptor) -> [(&'static str, bool); 14] {
    [
        ("autoVersionSubmodules", d.auto_version_submodules),
        ("updateWorkingCopyVersions", d.update_working_copy_versions),
        ("updateBranchVersions", d.update_branch_versions),
        ("branchCreation", d.branch_creation),
        ("allowTimestampedSnapshots", d.allow_timestamped_snapshots),
        ("suppressCommitBeforeTagOrBranch", d.suppress_commit_before_tag_or_branch),
        ("remoteTagging", d.remote_tagging),
        ("pushChanges", d.push_changes),
        ("addSchema", d.add_schema),
        ("generateReleaseManifests", d.generate_release_manifests),
        ("commitByProject", d.commit_by_project),
        ("useEditMode", d.use_edit_mode),
        ("updateDependencies", d.update_dependencies),
        ("localCheckout", d.local_checkout),
    ]
}

fn flag_slot<'a>(builder: &'a mut ReleaseDescriptorBuilder, key: &str) -> Option<&'a mut Option<bool>> {
    Some(match key {
        "autoVersionSubmodules" => &mut builder.auto_version_submodules,
        "updateWorkingCopyVersions" => &mut builder.update_working_copy_versions,
        "updateBranchVersions" => &mut builder.update_branch_versions,
        "branchCreation" => &mut builder.branch_creation,
        "allowTimestampedSnapshots" => &mut builder.allow_timestamped_snapshots,
        "suppressCommitBeforeTagOrBranch" => &mut builder.suppress_commit_before_tag_or_branch,
        "remoteTagging" => &mut builder.remote_tagging,
        "pushChanges" => &mut builder.push_changes,
        "addSchema" => &mut builder.add_schema,
        "generateReleaseManifests" => &mut builder.generate_release_manifests,
        "commitByProject" => &mut builder.commit_by_project,
        "useEditMode" => &mut builder.use_edit_mode,
        "updateDependencies" => &mut builder.update_dependencies,
        "localCheckout" => &mut builder.local_checkout,
        _ => return None,
    })
}

impl ReleaseState {
    /// Snapshot a descriptor for persistence
    pub fn capture(descriptor: &ReleaseDescriptor) -> Self {
        fn project<'a>(
            projects: &'a mut BTreeMap<String, ProjectState>,
            key: &ModuleKey,
        ) -> &'a mut ProjectState {
            projects.entry(key.to_string()).or_default()
        }

        let mut projects = BTreeMap::new();
        for (key, version) in &descriptor.original_versions {
            project(&mut projects, key).original = Some(version.clone());
        }
        for (key, version) in &descriptor.release_versions {
            project(&mut projects, key).release = Some(version.clone());
        }
        for (key, version) in &descriptor.development_versions {
            project(&mut projects, key).development = Some(version.clone());
        }
        for (key, info) in &descriptor.original_scm_info {
            project(&mut projects, key).scm = Some(info.clone());
        }

        Self {
            completed_phase: descriptor.completed_phase.clone(),
            release_strategy_id: Some(descriptor.release_strategy_id.clone()),
            scm: ScmState {
                url: descriptor.scm_source_url.clone(),
                tag: descriptor.scm_release_label.clone(),
                tag_name_format: Some(descriptor.scm_tag_name_format.clone()),
                comment_prefix: Some(descriptor.scm_comment_prefix.clone()),
                released_revision: descriptor.scm_released_revision.clone(),
            },
            exec: ExecState {
                preparation_goals: Some(descriptor.preparation_goals.clone()),
                completion_goals: Some(descriptor.completion_goals.clone()),
                perform_goals: Some(descriptor.perform_goals.clone()),
                additional_arguments: descriptor.additional_arguments.clone(),
                build_tool: Some(descriptor.build_tool.clone()),
                activate_profiles: descriptor.active_profiles.clone(),
            },
            checkout_directory: Some(descriptor.checkout_directory.clone()),
            release_version: descriptor.default_release_version.clone(),
            development_version: descriptor.default_development_version.clone(),
            flags: flags(descriptor)
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            projects,
            dependencies: descriptor
                .resolved_snapshot_dependencies
                .iter()
                .map(|(key, triple)| (key.to_string(), triple.clone()))
                .collect(),
        }
    }

    /// Overlay this state onto a builder; persisted values win
    ///
    /// Fails on the first module id that does not parse.
    pub fn overlay(&self, builder: &mut ReleaseDescriptorBuilder) -> std::result::Result<(), String> {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        set(&mut builder.completed_phase, &self.completed_phase);
        set(&mut builder.release_strategy_id, &self.release_strategy_id);
        set(&mut builder.scm_source_url, &self.scm.url);
        set(&mut builder.scm_release_label, &self.scm.tag);
        set(&mut builder.scm_tag_name_format, &self.scm.tag_name_format);
        set(&mut builder.scm_comment_prefix, &self.scm.comment_prefix);
        set(&mut builder.scm_released_revision, &self.scm.released_revision);
        set(&mut builder.preparation_goals, &self.exec.preparation_goals);
        set(&mut builder.completion_goals, &self.exec.completion_goals);
        set(&mut builder.perform_goals, &self.exec.perform_goals);
        set(&mut builder.additional_arguments, &self.exec.additional_arguments);
        set(&mut builder.build_tool, &self.exec.build_tool);
        set(&mut builder.checkout_directory, &self.checkout_directory);
        set(&mut builder.default_release_version, &self.release_version);
        set(&mut builder.default_development_version, &self.development_version);

        for profile in &self.exec.activate_profiles {
            if !builder.active_profiles.contains(profile) {
                builder.active_profiles.push(profile.clone());
            }
        }

        for (name, value) in &self.flags {
            match flag_slot(builder, name) {
                Some(slot) => *slot = Some(*value),
                None => log::debug!("Ignoring unknown release flag '{}'", name),
            }
        }

        for (module, project) in &self.projects {
            let key: ModuleKey = module.parse()?;
            if let Some(version) = &project.original {
                builder.original_versions.insert(key.clone(), version.clone());
            }
            if let Some(version) = &project.release {
                builder.release_versions.insert(key.clone(), version.clone());
            }
            if let Some(version) = &project.development {
                builder.development_versions.insert(key.clone(), version.clone());
            }
            if let Some(info) = &project.scm {
                builder.original_scm_info.insert(key, info.clone());
            }
        }

        for (module, triple) in &self.dependencies {
            builder
                .resolved_snapshot_dependencies
                .insert(module.parse()?, triple.clone());
        }
        Ok(())
    }
}
