//! Persistence of release progress between runs.
//!
//! The state file is written atomically (temp file + rename) after every
//! completed phase, so an interrupted run can always be resumed from the
//! last phase that was durably recorded.

use super::STATE_FILE_NAME;
use super::release_state::ReleaseState;
use crate::descriptor::{ReleaseDescriptor, ReleaseDescriptorBuilder};
use crate::error::{ExecutionError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable store for release progress
pub trait ConfigStore {
    /// Overlay persisted state onto `builder` and build the effective descriptor
    ///
    /// A missing state file is not an error: the builder is built as-is.
    fn read(&self, builder: ReleaseDescriptorBuilder) -> Result<ReleaseDescriptor>;

    /// Persist the descriptor, replacing any previous state
    fn write(&self, descriptor: &ReleaseDescriptor) -> Result<()>;

    /// Remove persisted state; succeeds when there is nothing to remove
    fn delete(&self, descriptor: &ReleaseDescriptor) -> Result<()>;
}

/// JSON state file colocated with the working directory
#[derive(Debug, Clone, Default)]
pub struct FileConfigStore {
    /// Overrides the state file location (defaults to `<working dir>/release.json`)
    state_file_path: Option<PathBuf>,
}

impl FileConfigStore {
    /// Create a store that keeps state next to each descriptor's working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pinned to a specific file
    pub fn at<P: AsRef<Path>>(state_file_path: P) -> Self {
        Self {
            state_file_path: Some(state_file_path.as_ref().to_path_buf()),
        }
    }

    /// State file used for a release of `working_directory`
    pub fn state_file(&self, working_directory: &Path) -> PathBuf {
        self.state_file_path
            .clone()
            .unwrap_or_else(|| working_directory.join(STATE_FILE_NAME))
    }

    /// Quick check if release state exists for `working_directory`
    pub fn has_state(&self, working_directory: &Path) -> bool {
        self.state_file(working_directory).exists()
    }

    fn temp_file(path: &Path) -> PathBuf {
        path.with_extension("json.tmp")
    }

    fn write_failed(path: &Path, reason: String) -> ExecutionError {
        ExecutionError::StateWrite {
            path: path.to_path_buf(),
            reason,
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn read(&self, mut builder: ReleaseDescriptorBuilder) -> Result<ReleaseDescriptor> {
        let path = self.state_file(&builder.working_directory);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{} not found - starting without saved state", path.display());
                return Ok(builder.build());
            }
            Err(e) => {
                return Err(ExecutionError::StateRead {
                    path,
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let state: ReleaseState = serde_json::from_str(&content).map_err(|e| ExecutionError::StateRead {
            path: path.clone(),
            reason: format!("Failed to parse state: {}", e),
        })?;
        state
            .overlay(&mut builder)
            .map_err(|reason| ExecutionError::StateRead { path: path.clone(), reason })?;

        log::debug!(
            "Loaded release state ({:?}) from {}",
            state.completed_phase,
            path.display()
        );
        Ok(builder.build())
    }

    fn write(&self, descriptor: &ReleaseDescriptor) -> Result<()> {
        let path = self.state_file(&descriptor.working_directory);
        let serialized = serde_json::to_string_pretty(&ReleaseState::capture(descriptor))
            .map_err(|e| Self::write_failed(&path, format!("Failed to serialize state: {}", e)))?;

        // Write to temporary file first (atomic operation)
        let temp_file_path = Self::temp_file(&path);
        {
            let mut file = fs::File::create(&temp_file_path).map_err(|e| {
                Self::write_failed(&path, format!("Failed to create temp file: {}", e))
            })?;
            file.write_all(serialized.as_bytes())
                .map_err(|e| Self::write_failed(&path, format!("Failed to write state: {}", e)))?;
            file.sync_all()
                .map_err(|e| Self::write_failed(&path, format!("Failed to sync file: {}", e)))?;
        }

        fs::rename(&temp_file_path, &path)
            .map_err(|e| Self::write_failed(&path, format!("Failed to rename temp file: {}", e)))?;

        log::debug!(
            "Saved release state ({:?}) to {}",
            descriptor.completed_phase,
            path.display()
        );
        Ok(())
    }

    fn delete(&self, descriptor: &ReleaseDescriptor) -> Result<()> {
        let path = self.state_file(&descriptor.working_directory);
        let temp_file_path = Self::temp_file(&path);

        let mut errors = Vec::new();
        for file in [&path, &temp_file_path] {
            match fs::remove_file(file) {
                Ok(()) => log::debug!("Removed {}", file.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => errors.push(format!("Failed to remove {}: {}", file.display(), e)),
            }
        }

        if !errors.is_empty() {
            return Err(Self::write_failed(&path, format!("Cleanup errors: {}", errors.join("; "))).into());
        }
        Ok(())
    }
}
