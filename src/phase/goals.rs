//! Build goal execution.

use super::{PhaseContext, ReleasePhase};
use crate::error::Result;
use crate::exec::{BuildExecutor, BuildRequest};
use crate::result::ReleaseResult;
use std::sync::Arc;

/// Which configured goals a [`RunGoalsPhase`] runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalsKind {
    /// Before the release commit, against the rewritten working copy
    Preparation,
    /// After the development rewrite
    Completion,
    /// Against the checked-out tag
    Perform,
}

/// Runs the descriptor's build goals through a [`BuildExecutor`]
///
/// Preparation and completion goals also run when simulating, since they
/// only build and test the working copy. Perform goals publish and are
/// skipped.
pub struct RunGoalsPhase {
    kind: GoalsKind,
    executor: Arc<dyn BuildExecutor>,
}

impl RunGoalsPhase {
    /// Create the phase
    pub fn new(kind: GoalsKind, executor: Arc<dyn BuildExecutor>) -> Self {
        Self { kind, executor }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            GoalsKind::Preparation => "preparation",
            GoalsKind::Completion => "completion",
            GoalsKind::Perform => "perform",
        }
    }

    fn goals<'d>(&self, ctx: &'d PhaseContext<'_>) -> &'d [String] {
        match self.kind {
            GoalsKind::Preparation => &ctx.descriptor.preparation_goals,
            GoalsKind::Completion => &ctx.descriptor.completion_goals,
            GoalsKind::Perform => &ctx.descriptor.perform_goals,
        }
    }
}

impl ReleasePhase for RunGoalsPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        let goals = self.goals(ctx);
        if goals.is_empty() {
            result.info(format!("No {} goals configured", self.label()));
            return Ok(());
        }

        let descriptor = &*ctx.descriptor;
        let working_dir = match self.kind {
            GoalsKind::Perform => &descriptor.checkout_directory,
            GoalsKind::Preparation | GoalsKind::Completion => &descriptor.working_directory,
        };
        result.info(format!("Executing {} goals '{}'...", self.label(), goals.join(", ")));

        let request = BuildRequest {
            working_dir,
            goals,
            build_tool: ctx
                .environment
                .build_tool
                .as_deref()
                .unwrap_or(descriptor.build_tool.as_str()),
            additional_arguments: descriptor.additional_arguments.as_deref(),
            profiles: &descriptor.active_profiles,
            interactive: descriptor.interactive,
            environment: &ctx.environment.environment_variables,
        };
        let mut output = String::new();
        let outcome = self.executor.execute(&request, &mut output);
        result.append_output(&output);
        outcome
    }

    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        if self.kind == GoalsKind::Perform {
            let goals = self.goals(ctx);
            result.info(format!(
                "Full run would execute perform goals '{}' in {}",
                goals.join(", "),
                ctx.descriptor.checkout_directory.display()
            ));
            return Ok(());
        }
        self.execute(ctx, result)
    }
}
