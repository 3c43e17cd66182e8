//! Release goal commands.

use crate::cli::{Args, Command, ConsoleListener, RuntimeConfig};
use crate::config::ReleaseSettings;
use crate::descriptor::ReleaseDescriptorBuilder;
use crate::manager::{BranchRequest, PerformRequest, PrepareRequest, ReleaseManager, ReleaseRequest};
use crate::phase::{PhaseRegistry, ReleaseToolkit};
use crate::prompt::DefaultsPrompter;
use crate::state::FileConfigStore;
use crate::workspace::load_reactor;
use anyhow::Context;
use path_absolutize::Absolutize;
use std::sync::Arc;

/// Run a release goal against the workspace in `--working-dir`
pub(super) fn execute_goal(args: &Args, config: &RuntimeConfig) -> anyhow::Result<()> {
    let working_dir = args
        .working_dir
        .absolutize()
        .with_context(|| format!("Failed to resolve {}", args.working_dir.display()))?
        .to_path_buf();

    let settings = ReleaseSettings::load(&working_dir)?;
    let projects = load_reactor(&working_dir)?;
    config.verbose_println(&format!("Loaded {} project(s) from {}", projects.len(), working_dir.display()));

    let mut builder = ReleaseDescriptorBuilder::new(&working_dir);
    settings.apply(&mut builder);
    builder.interactive = Some(!args.batch);

    let mut toolkit = ReleaseToolkit::system()?;
    if args.batch {
        toolkit.prompter = Arc::new(DefaultsPrompter);
    }
    let manager = ReleaseManager::new(
        settings.strategy_registry(),
        PhaseRegistry::with_defaults(&toolkit),
        FileConfigStore::new(),
    );

    let mut listener = ConsoleListener::new(config.output().clone());
    let base = ReleaseRequest::new(builder, &projects)
        .with_overrides(args.overrides())
        .with_listener(&mut listener);

    let result = match &args.command {
        Command::Prepare { dry_run, no_resume } => manager.prepare(PrepareRequest {
            base,
            dry_run: *dry_run,
            resume: Some(!*no_resume),
        })?,
        // A dry run keeps the state so a real perform can follow
        Command::Perform { dry_run, profiles } => manager.perform(PerformRequest {
            base,
            dry_run: *dry_run,
            clean: Some(!*dry_run),
            profiles: profiles.clone(),
        })?,
        Command::Rollback => manager.rollback(base)?,
        Command::Branch { dry_run } => manager.branch(BranchRequest {
            base,
            dry_run: *dry_run,
        })?,
        Command::UpdateVersions => manager.update_versions(base)?,
        Command::Clean => manager.clean(base)?,
        Command::Status { .. } => anyhow::bail!("'status' is not a release goal"),
    };

    config.output().result(&result);
    if matches!(args.command, Command::Prepare { dry_run: true, .. }) {
        config.warning_println("Dry run state was recorded; run 'clean' before a real prepare");
    }
    Ok(())
}
