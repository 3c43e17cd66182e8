//! Goal sequencing.
//!
//! The [`ReleaseManager`] turns a goal into the strategy's ordered phase
//! list and runs it against one shared descriptor. Prepare records the last
//! completed phase after every step so an interrupted run resumes where it
//! stopped; the other goals always run their whole list.
//!
//! Every goal has a plain entry point returning `Result` and a
//! `*_with_result` variant that folds any error into the returned
//! [`ReleaseResult`].

mod request;

pub use request::{BranchRequest, PerformRequest, PrepareRequest, ReleaseRequest};

use crate::descriptor::ReleaseDescriptor;
use crate::error::{ExecutionError, ReleaseError, Result};
use crate::listener::{LoggingListener, ReleaseListener};
use crate::phase::{PhaseContext, PhaseRegistry};
use crate::result::{ReleaseResult, ResultCode};
use crate::state::ConfigStore;
use crate::strategy::{Goal, StrategyRegistry};
use crate::workspace::{ModuleKey, ReleaseProject};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How a phase list is run
#[derive(Debug, Clone, Copy)]
struct Execution {
    simulate: bool,
    persist: bool,
}

/// Runs release goals
pub struct ReleaseManager {
    strategies: StrategyRegistry,
    phases: PhaseRegistry,
    store: Box<dyn ConfigStore>,
}

impl fmt::Debug for ReleaseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseManager")
            .field("strategies", &self.strategies)
            .field("phases", &self.phases)
            .finish_non_exhaustive()
    }
}

/// The caller's listener, or `fallback` when there is none
fn listener<'l>(
    slot: &'l mut Option<&mut dyn ReleaseListener>,
    fallback: &'l mut LoggingListener,
) -> &'l mut dyn ReleaseListener {
    match slot {
        Some(listener) => &mut **listener,
        None => fallback,
    }
}

/// Re-apply explicit per-module versions over whatever persisted state holds
fn pin_version_overrides(descriptor: &mut ReleaseDescriptor, overrides: &BTreeMap<String, String>) {
    for (key, version) in overrides {
        let (map, module) = if let Some(module) = key.strip_prefix("release.") {
            (&mut descriptor.release_versions, module)
        } else if let Some(module) = key.strip_prefix("development.") {
            (&mut descriptor.development_versions, module)
        } else {
            continue;
        };
        if let Ok(module) = module.parse::<ModuleKey>() {
            map.insert(module, version.clone());
        }
    }
}

impl ReleaseManager {
    /// Create a manager over explicit registries and a state store
    pub fn new(strategies: StrategyRegistry, phases: PhaseRegistry, store: impl ConfigStore + 'static) -> Self {
        Self {
            strategies,
            phases,
            store: Box::new(store),
        }
    }

    /// Prepare a release, resuming from persisted state unless disabled
    pub fn prepare(&self, mut request: PrepareRequest<'_>) -> Result<ReleaseResult> {
        let mut result = ReleaseResult::started();
        self.run_prepare(&mut request, &mut result)?;
        Ok(Self::succeeded(result))
    }

    /// [`prepare`](Self::prepare), recording any error in the result
    pub fn prepare_with_result(&self, mut request: PrepareRequest<'_>) -> ReleaseResult {
        let mut result = ReleaseResult::started();
        let outcome = self.run_prepare(&mut request, &mut result);
        Self::conclude(outcome, &mut request.base.listener, result)
    }

    /// Build and publish a prepared release
    pub fn perform(&self, mut request: PerformRequest<'_>) -> Result<ReleaseResult> {
        let mut result = ReleaseResult::started();
        self.run_perform(&mut request, &mut result)?;
        Ok(Self::succeeded(result))
    }

    /// [`perform`](Self::perform), recording any error in the result
    pub fn perform_with_result(&self, mut request: PerformRequest<'_>) -> ReleaseResult {
        let mut result = ReleaseResult::started();
        let outcome = self.run_perform(&mut request, &mut result);
        Self::conclude(outcome, &mut request.base.listener, result)
    }

    /// Undo the last prepare
    pub fn rollback(&self, mut request: ReleaseRequest<'_>) -> Result<ReleaseResult> {
        let mut result = ReleaseResult::started();
        self.run_rollback(&mut request, &mut result)?;
        Ok(Self::succeeded(result))
    }

    /// [`rollback`](Self::rollback), recording any error in the result
    pub fn rollback_with_result(&self, mut request: ReleaseRequest<'_>) -> ReleaseResult {
        let mut result = ReleaseResult::started();
        let outcome = self.run_rollback(&mut request, &mut result);
        Self::conclude(outcome, &mut request.listener, result)
    }

    /// Create a branch
    pub fn branch(&self, mut request: BranchRequest<'_>) -> Result<ReleaseResult> {
        let mut result = ReleaseResult::started();
        self.run_branch(&mut request, &mut result)?;
        Ok(Self::succeeded(result))
    }

    /// [`branch`](Self::branch), recording any error in the result
    pub fn branch_with_result(&self, mut request: BranchRequest<'_>) -> ReleaseResult {
        let mut result = ReleaseResult::started();
        let outcome = self.run_branch(&mut request, &mut result);
        Self::conclude(outcome, &mut request.base.listener, result)
    }

    /// Update working copy versions without releasing
    pub fn update_versions(&self, mut request: ReleaseRequest<'_>) -> Result<ReleaseResult> {
        let mut result = ReleaseResult::started();
        self.run_update_versions(&mut request, &mut result)?;
        Ok(Self::succeeded(result))
    }

    /// [`update_versions`](Self::update_versions), recording any error in the result
    pub fn update_versions_with_result(&self, mut request: ReleaseRequest<'_>) -> ReleaseResult {
        let mut result = ReleaseResult::started();
        let outcome = self.run_update_versions(&mut request, &mut result);
        Self::conclude(outcome, &mut request.listener, result)
    }

    /// Remove persisted state and every artifact the phases left behind
    ///
    /// Safe to call repeatedly. Only an unknown strategy is an error.
    pub fn clean(&self, mut request: ReleaseRequest<'_>) -> Result<ReleaseResult> {
        let mut result = ReleaseResult::started();
        self.run_clean(&mut request, &mut result)?;
        Ok(Self::succeeded(result))
    }

    /// [`clean`](Self::clean), recording any error in the result
    pub fn clean_with_result(&self, mut request: ReleaseRequest<'_>) -> ReleaseResult {
        let mut result = ReleaseResult::started();
        let outcome = self.run_clean(&mut request, &mut result);
        Self::conclude(outcome, &mut request.listener, result)
    }

    fn succeeded(mut result: ReleaseResult) -> ReleaseResult {
        result.set_code(ResultCode::Success);
        result.finish();
        result
    }

    fn conclude(
        outcome: Result<()>,
        listener: &mut Option<&mut dyn ReleaseListener>,
        mut result: ReleaseResult,
    ) -> ReleaseResult {
        match outcome {
            Ok(()) => result.set_code(ResultCode::Success),
            Err(e) => {
                let reason = e.to_string();
                result.error(reason.as_str());
                result.set_code(ResultCode::Error);
                if let Some(listener) = listener {
                    listener.error(&reason);
                }
            }
        }
        result.finish();
        result
    }

    /// Build the effective descriptor for a request
    ///
    /// Overrides go into the builder first; with `from_store` the persisted
    /// state is overlaid and explicit module versions are pinned again on top.
    fn load(&self, request: &mut ReleaseRequest<'_>, from_store: bool) -> Result<ReleaseDescriptor> {
        let mut builder = std::mem::take(&mut request.builder);
        builder.apply_overrides(&request.overrides);

        let mut descriptor = if from_store {
            self.store.read(builder)?
        } else {
            builder.build()
        };
        pin_version_overrides(&mut descriptor, &request.overrides);

        log::debug!(
            "Release configuration for {}: strategy '{}', {} project(s)",
            descriptor.working_directory.display(),
            descriptor.release_strategy_id,
            request.projects.len()
        );
        Ok(descriptor)
    }

    /// Run `names[skip..]` in order
    ///
    /// Phase output is merged into `result` whether or not the phase
    /// succeeds. With `persist`, the phase only counts as completed once
    /// the store has recorded it.
    fn run_phases(
        &self,
        names: &[String],
        skip: usize,
        execution: Execution,
        ctx: &mut PhaseContext<'_>,
        listener: &mut dyn ReleaseListener,
        result: &mut ReleaseResult,
    ) -> Result<()> {
        for name in names.iter().skip(skip) {
            let phase = self.phases.require(name)?;
            listener.phase_start(name);
            log::debug!("Running phase '{}'", name);

            let mut phase_result = ReleaseResult::new();
            let outcome = if execution.simulate {
                phase.simulate(ctx, &mut phase_result)
            } else {
                phase.execute(ctx, &mut phase_result)
            };
            result.merge(&phase_result);
            outcome?;

            if execution.persist {
                let previous = ctx.descriptor.completed_phase.replace(name.clone());
                if let Err(e) = self.store.write(ctx.descriptor) {
                    ctx.descriptor.completed_phase = previous;
                    return Err(match e {
                        ReleaseError::Execution(ExecutionError::StateWrite { .. }) => e,
                        other => ExecutionError::StateWrite {
                            path: ctx.descriptor.state_file(),
                            reason: other.to_string(),
                        }
                        .into(),
                    });
                }
            }
            listener.phase_end();
        }
        Ok(())
    }

    fn run_prepare(&self, request: &mut PrepareRequest<'_>, result: &mut ReleaseResult) -> Result<()> {
        let resume = request.resume.unwrap_or(true);
        let execution = Execution {
            simulate: request.dry_run,
            persist: true,
        };
        let base = &mut request.base;
        let mut descriptor = self.load(base, resume)?;
        let names = self
            .strategies
            .resolve_phases(&descriptor.release_strategy_id, Goal::Prepare)?;

        let mut fallback = LoggingListener::new();
        let listener = listener(&mut base.listener, &mut fallback);
        listener.goal_start(Goal::Prepare.name(), &names);

        let resume_index = descriptor
            .completed_phase
            .as_deref()
            .and_then(|done| names.iter().position(|name| name == done));
        let start = resume_index.map_or(0, |index| index + 1);
        for name in &names[..start] {
            listener.phase_skip(name);
        }
        if start > 0 {
            match names.get(start) {
                None => result.info(
                    "Release preparation already completed. You can now continue with perform, \
                     or start again with resume disabled.",
                ),
                Some(next) => result.info(format!("Resuming release from phase '{}'", next)),
            }
        }

        let mut ctx = PhaseContext {
            descriptor: &mut descriptor,
            environment: &base.environment,
            projects: base.projects,
        };
        self.run_phases(&names, start, execution, &mut ctx, listener, result)?;
        listener.goal_end();
        Ok(())
    }

    fn run_perform(&self, request: &mut PerformRequest<'_>, result: &mut ReleaseResult) -> Result<()> {
        let execution = Execution {
            simulate: request.dry_run,
            persist: false,
        };
        let base = &mut request.base;
        let mut descriptor = self.load(base, true)?;
        for profile in &request.profiles {
            if !descriptor.active_profiles.contains(profile) {
                descriptor.active_profiles.push(profile.clone());
            }
        }
        let names = self
            .strategies
            .resolve_phases(&descriptor.release_strategy_id, Goal::Perform)?;

        let mut fallback = LoggingListener::new();
        let listener = listener(&mut base.listener, &mut fallback);
        listener.goal_start(Goal::Perform.name(), &names);

        let mut ctx = PhaseContext {
            descriptor: &mut descriptor,
            environment: &base.environment,
            projects: base.projects,
        };
        self.run_phases(&names, 0, execution, &mut ctx, listener, result)?;
        listener.goal_end();

        if request.clean != Some(false) {
            self.clean_up(&descriptor, base.projects, result)?;
        }
        Ok(())
    }

    fn run_rollback(&self, request: &mut ReleaseRequest<'_>, result: &mut ReleaseResult) -> Result<()> {
        let mut descriptor = self.load(request, true)?;
        let names = self
            .strategies
            .resolve_phases(&descriptor.release_strategy_id, Goal::Rollback)?;

        let mut fallback = LoggingListener::new();
        let listener = listener(&mut request.listener, &mut fallback);
        listener.goal_start(Goal::Rollback.name(), &names);

        let mut ctx = PhaseContext {
            descriptor: &mut descriptor,
            environment: &request.environment,
            projects: request.projects,
        };
        let execution = Execution {
            simulate: false,
            persist: false,
        };
        let outcome = self.run_phases(&names, 0, execution, &mut ctx, listener, result);
        if outcome.is_ok() {
            listener.goal_end();
        }

        let cleaned = self.clean_up(&descriptor, request.projects, result);
        outcome.and(cleaned)
    }

    fn run_branch(&self, request: &mut BranchRequest<'_>, result: &mut ReleaseResult) -> Result<()> {
        let execution = Execution {
            simulate: request.dry_run,
            persist: false,
        };
        let base = &mut request.base;
        let mut descriptor = self.load(base, false)?;
        descriptor.branch_creation = true;
        let names = self
            .strategies
            .resolve_phases(&descriptor.release_strategy_id, Goal::Branch)?;

        let mut fallback = LoggingListener::new();
        let listener = listener(&mut base.listener, &mut fallback);
        listener.goal_start(Goal::Branch.name(), &names);

        let mut ctx = PhaseContext {
            descriptor: &mut descriptor,
            environment: &base.environment,
            projects: base.projects,
        };
        self.run_phases(&names, 0, execution, &mut ctx, listener, result)?;
        listener.goal_end();

        if !execution.simulate {
            self.clean_up(&descriptor, base.projects, result)?;
        }
        Ok(())
    }

    fn run_update_versions(&self, request: &mut ReleaseRequest<'_>, result: &mut ReleaseResult) -> Result<()> {
        let mut descriptor = self.load(request, false)?;
        let names = self
            .strategies
            .resolve_phases(&descriptor.release_strategy_id, Goal::UpdateVersions)?;

        let mut fallback = LoggingListener::new();
        let listener = listener(&mut request.listener, &mut fallback);
        listener.goal_start(Goal::UpdateVersions.name(), &names);

        let mut ctx = PhaseContext {
            descriptor: &mut descriptor,
            environment: &request.environment,
            projects: request.projects,
        };
        let execution = Execution {
            simulate: false,
            persist: false,
        };
        self.run_phases(&names, 0, execution, &mut ctx, listener, result)?;
        listener.goal_end();

        self.clean_up(&descriptor, request.projects, result)
    }

    fn run_clean(&self, request: &mut ReleaseRequest<'_>, result: &mut ReleaseResult) -> Result<()> {
        let descriptor = self.load(request, false)?;
        self.clean_up(&descriptor, request.projects, result)
    }

    /// Delete persisted state and run every prepare and branch phase's clean
    fn clean_up(&self, descriptor: &ReleaseDescriptor, projects: &[ReleaseProject], result: &mut ReleaseResult) -> Result<()> {
        result.info("Cleaning up after release...");
        if let Err(e) = self.store.delete(descriptor) {
            result.warn(format!("Failed to remove release state: {}", e));
        }

        let mut seen = BTreeSet::new();
        for goal in [Goal::Prepare, Goal::Branch] {
            for name in self.strategies.resolve_phases(&descriptor.release_strategy_id, goal)? {
                if !seen.insert(name.clone()) {
                    continue;
                }
                match self.phases.get(&name) {
                    Some(phase) => result.merge(&phase.clean(descriptor, projects)),
                    None => log::debug!("No phase '{}' registered, nothing to clean", name),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ReleaseDescriptorBuilder;

    #[test]
    fn version_overrides_win_over_persisted_values() {
        let key = ModuleKey::new("acme", "app");
        let mut descriptor = ReleaseDescriptorBuilder::new("/work").build();
        descriptor.release_versions.insert(key.clone(), "1.0".to_string());

        let overrides = BTreeMap::from([
            ("release.acme:app".to_string(), "1.0.1".to_string()),
            ("development.acme:app".to_string(), "1.1-SNAPSHOT".to_string()),
            ("tag".to_string(), "ignored-here".to_string()),
            ("release.not-a-key".to_string(), "2.0".to_string()),
        ]);
        pin_version_overrides(&mut descriptor, &overrides);

        assert_eq!(descriptor.release_version(&key), Some("1.0.1"));
        assert_eq!(descriptor.development_version(&key), Some("1.1-SNAPSHOT"));
        assert_eq!(descriptor.release_versions.len(), 1);
        assert_eq!(descriptor.scm_release_label, None);
    }

    #[test]
    fn caller_listener_is_preferred() {
        let mut mine = LoggingListener::new();
        let mut fallback = LoggingListener::new();
        {
            let mut slot: Option<&mut dyn ReleaseListener> = Some(&mut mine);
            let chosen = listener(&mut slot, &mut fallback);
            chosen.goal_start("prepare", &["a".to_string()]);
            chosen.phase_start("b");
        }
        assert_eq!(mine.mismatches(), 1);
        assert_eq!(fallback.mismatches(), 0);
    }
}
