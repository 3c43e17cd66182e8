//! Release strategies: the ordered phase lists for each goal.

use crate::descriptor::DEFAULT_STRATEGY_ID;
use crate::error::{FailureError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// A named release operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Goal {
    /// Prepare a release: map versions, rewrite, commit and tag
    Prepare,
    /// Build and publish the tagged release
    Perform,
    /// Undo the last prepare
    Rollback,
    /// Create a branch
    Branch,
    /// Update working copy versions only
    UpdateVersions,
}

impl Goal {
    /// Name used in listener events and strategy files
    pub fn name(self) -> &'static str {
        match self {
            Goal::Prepare => "prepare",
            Goal::Perform => "perform",
            Goal::Rollback => "rollback",
            Goal::Branch => "branch",
            Goal::UpdateVersions => "updateVersions",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Phase lists per goal
///
/// A `None` list defers to the default strategy's list for that goal. An
/// empty list does not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Strategy {
    /// Strategy id
    #[serde(skip)]
    pub id: String,
    /// Prepare phases
    pub prepare: Option<Vec<String>>,
    /// Perform phases
    pub perform: Option<Vec<String>>,
    /// Rollback phases
    pub rollback: Option<Vec<String>>,
    /// Branch phases
    pub branch: Option<Vec<String>>,
    /// Update-versions phases
    pub update_versions: Option<Vec<String>>,
}

fn names(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| s.to_string()).collect())
}

impl Strategy {
    /// Create a strategy with no phase lists
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// The built-in "default" strategy
    pub fn default_strategy() -> Self {
        Self {
            id: DEFAULT_STRATEGY_ID.to_string(),
            prepare: names(&[
                "check-manifests",
                "scm-check-modifications",
                "check-dependency-snapshots",
                "create-backup-manifests",
                "map-release-versions",
                "input-variables",
                "map-development-versions",
                "rewrite-manifests-for-release",
                "run-preparation-goals",
                "scm-commit-release",
                "scm-tag",
                "rewrite-manifests-for-development",
                "run-completion-goals",
                "scm-commit-development",
                "end-release",
            ]),
            perform: names(&[
                "verify-completed-prepare-phases",
                "checkout-project-from-scm",
                "run-perform-goals",
            ]),
            rollback: names(&[
                "restore-backup-manifests",
                "scm-commit-rollback",
                "remove-scm-tag",
            ]),
            branch: names(&[
                "check-manifests",
                "scm-check-modifications",
                "create-backup-manifests",
                "map-branch-versions",
                "branch-input-variables",
                "map-development-versions",
                "rewrite-manifests-for-branch",
                "scm-commit-branch",
                "scm-branch",
                "rewrite-manifests-for-development",
                "scm-commit-development",
                "end-release",
            ]),
            update_versions: names(&[
                "check-manifests-update-versions",
                "create-backup-manifests",
                "map-development-versions",
                "rewrite-manifest-versions",
            ]),
        }
    }

    /// Set the list for a goal
    pub fn with_phases(mut self, goal: Goal, phases: &[&str]) -> Self {
        *self.slot_mut(goal) = names(phases);
        self
    }

    /// Phase list for a goal, without fallback
    pub fn phases(&self, goal: Goal) -> Option<&[String]> {
        match goal {
            Goal::Prepare => self.prepare.as_deref(),
            Goal::Perform => self.perform.as_deref(),
            Goal::Rollback => self.rollback.as_deref(),
            Goal::Branch => self.branch.as_deref(),
            Goal::UpdateVersions => self.update_versions.as_deref(),
        }
    }

    fn slot_mut(&mut self, goal: Goal) -> &mut Option<Vec<String>> {
        match goal {
            Goal::Prepare => &mut self.prepare,
            Goal::Perform => &mut self.perform,
            Goal::Rollback => &mut self.rollback,
            Goal::Branch => &mut self.branch,
            Goal::UpdateVersions => &mut self.update_versions,
        }
    }
}

/// Strategies by id
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Strategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyRegistry {
    /// Registry holding only the built-in default strategy
    pub fn new() -> Self {
        Self::empty().with(Strategy::default_strategy())
    }

    /// Registry with no strategies at all
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Register a strategy, replacing any with the same id
    pub fn register(&mut self, strategy: Strategy) {
        self.strategies.insert(strategy.id.clone(), strategy);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, strategy: Strategy) -> Self {
        self.register(strategy);
        self
    }

    /// Look up a strategy
    pub fn get(&self, id: &str) -> Option<&Strategy> {
        self.strategies.get(id)
    }

    /// Registered ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    /// Ordered phase names for `goal` under strategy `id`
    ///
    /// Fails when `id` is not registered. A missing list falls back to the
    /// default strategy's list; if that is missing too the result is empty.
    pub fn resolve_phases(&self, id: &str, goal: Goal) -> Result<Vec<String>> {
        let strategy = self
            .get(id)
            .ok_or_else(|| FailureError::UnknownStrategy { id: id.to_string() })?;

        let phases = strategy
            .phases(goal)
            .or_else(|| self.get(DEFAULT_STRATEGY_ID).and_then(|d| d.phases(goal)));

        match phases {
            Some(phases) => Ok(phases.to_vec()),
            None => {
                log::warn!("Strategy '{}' defines no phases for goal '{}'", id, goal);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_list_falls_back_to_default() {
        let registry = StrategyRegistry::new().with(Strategy::new("partial").with_phases(Goal::Perform, &["deploy"]));

        let default_prepare = registry.resolve_phases("default", Goal::Prepare).unwrap();
        assert_eq!(registry.resolve_phases("partial", Goal::Prepare).unwrap(), default_prepare);
        assert_eq!(registry.resolve_phases("partial", Goal::Perform).unwrap(), vec!["deploy"]);
    }

    #[test]
    fn empty_list_does_not_fall_back() {
        let registry = StrategyRegistry::new().with(Strategy::new("quiet").with_phases(Goal::Prepare, &[]));
        assert!(registry.resolve_phases("quiet", Goal::Prepare).unwrap().is_empty());
    }

    #[test]
    fn unknown_strategy_is_a_failure() {
        let err = StrategyRegistry::new()
            .resolve_phases("nonexistent", Goal::Prepare)
            .unwrap_err();
        assert!(err.is_failure());
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn missing_everywhere_yields_empty_list() {
        let registry = StrategyRegistry::empty()
            .with(Strategy::new("default"))
            .with(Strategy::new("custom"));
        assert!(registry.resolve_phases("custom", Goal::Branch).unwrap().is_empty());
    }

    #[test]
    fn default_lists_end_where_expected() {
        let strategy = Strategy::default_strategy();
        assert_eq!(strategy.phases(Goal::Prepare).and_then(|p| p.last()).map(String::as_str), Some("end-release"));
        assert_eq!(strategy.phases(Goal::Rollback).map(<[String]>::len), Some(3));
        assert_eq!(Goal::UpdateVersions.to_string(), "updateVersions");
    }
}
