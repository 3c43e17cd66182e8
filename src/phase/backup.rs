//! Manifest backups taken before a release and restored by rollback.

use super::{PhaseContext, ReleasePhase, remove_if_exists, suffixed};
use crate::descriptor::ReleaseDescriptor;
use crate::error::{ExecutionError, ReleaseError, Result};
use crate::result::ReleaseResult;
use crate::workspace::{ReleaseProject, release_manifests};
use std::fs;

/// Suffix of manifest backups
pub const BACKUP_SUFFIX: &str = ".releaseBackup";

/// Copies every manifest to `Cargo.toml.releaseBackup`
///
/// Any previous backup is replaced, so re-running the phase is harmless.
#[derive(Debug, Default)]
pub struct CreateBackupManifestsPhase;

impl ReleasePhase for CreateBackupManifestsPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        result.info("Creating manifest backups...");
        for manifest in release_manifests(&ctx.descriptor.working_directory, ctx.projects) {
            let backup = suffixed(&manifest, BACKUP_SUFFIX);
            remove_if_exists(&backup, result);
            fs::copy(&manifest, &backup).map_err(|e| {
                ReleaseError::io(format!("Failed to back up {}", manifest.display()), e)
            })?;
            result.debug(format!("Backed up {}", manifest.display()));
        }
        Ok(())
    }

    fn clean(&self, descriptor: &ReleaseDescriptor, projects: &[ReleaseProject]) -> ReleaseResult {
        let mut result = ReleaseResult::new();
        for manifest in release_manifests(&descriptor.working_directory, projects) {
            remove_if_exists(&suffixed(&manifest, BACKUP_SUFFIX), &mut result);
        }
        result
    }
}

/// Puts the backed-up manifests back in place
#[derive(Debug, Default)]
pub struct RestoreBackupManifestsPhase;

impl RestoreBackupManifestsPhase {
    fn backups(ctx: &PhaseContext<'_>) -> Result<Vec<(std::path::PathBuf, std::path::PathBuf)>> {
        release_manifests(&ctx.descriptor.working_directory, ctx.projects)
            .into_iter()
            .map(|manifest| {
                let backup = suffixed(&manifest, BACKUP_SUFFIX);
                if backup.exists() {
                    Ok((manifest, backup))
                } else {
                    Err(ExecutionError::MissingBackup { path: backup }.into())
                }
            })
            .collect()
    }
}

impl ReleasePhase for RestoreBackupManifestsPhase {
    fn execute(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        for (manifest, backup) in Self::backups(ctx)? {
            fs::copy(&backup, &manifest).map_err(|e| {
                ReleaseError::io(format!("Failed to restore {}", manifest.display()), e)
            })?;
            result.info(format!("Restored {}", manifest.display()));
        }
        Ok(())
    }

    fn simulate(&self, ctx: &mut PhaseContext<'_>, result: &mut ReleaseResult) -> Result<()> {
        for (manifest, _) in Self::backups(ctx)? {
            result.info(format!("Full run would restore {}", manifest.display()));
        }
        Ok(())
    }
}
