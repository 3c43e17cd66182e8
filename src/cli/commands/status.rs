//! Status command implementation.
//!
//! Displays the persisted state of an in-progress release.

use crate::cli::{Args, RuntimeConfig};
use crate::descriptor::ReleaseDescriptorBuilder;
use crate::phase::END_RELEASE_PHASE;
use crate::state::{ConfigStore, FileConfigStore};
use anyhow::Context;
use path_absolutize::Absolutize;

/// Execute status command
pub(super) fn execute_status(args: &Args, config: &RuntimeConfig, json: bool) -> anyhow::Result<()> {
    let working_dir = args
        .working_dir
        .absolutize()
        .with_context(|| format!("Failed to resolve {}", args.working_dir.display()))?
        .to_path_buf();
    config.verbose_println("Checking release status...");

    let store = FileConfigStore::new();
    if !store.has_state(&working_dir) {
        if json {
            println!("{}", serde_json::json!({ "status": "no_active_release" }));
        } else {
            config.println("No release in progress");
        }
        return Ok(());
    }

    let descriptor = store.read(ReleaseDescriptorBuilder::new(&working_dir))?;
    let completed = descriptor.completed_phase.as_deref();
    let prepared = completed == Some(END_RELEASE_PHASE);

    if json {
        let releases: serde_json::Map<String, serde_json::Value> = descriptor
            .release_versions
            .iter()
            .map(|(key, version)| (key.to_string(), version.clone().into()))
            .collect();
        let status = serde_json::json!({
            "status": if prepared { "prepared" } else { "in_progress" },
            "completedPhase": completed,
            "tag": descriptor.scm_release_label,
            "strategy": descriptor.release_strategy_id,
            "releaseVersions": releases,
        });
        let rendered = serde_json::to_string_pretty(&status).context("Failed to render status")?;
        println!("{}", rendered);
        return Ok(());
    }

    config.println(&format!("📊 Completed phase: {}", completed.unwrap_or("<none>")));
    if let Some(tag) = &descriptor.scm_release_label {
        config.indent(&format!("Tag: {}", tag));
    }
    config.indent(&format!("Strategy: {}", descriptor.release_strategy_id));
    for (key, version) in &descriptor.release_versions {
        config.indent(&format!("{} -> {}", key, version));
    }
    if prepared {
        config.println("Preparation complete; run 'perform' to publish");
    } else {
        config.println("Preparation incomplete; run 'prepare' to resume");
    }
    Ok(())
}
