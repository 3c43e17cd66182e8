//! External build invocation.
//!
//! Preparation, completion and perform goals are run through a
//! [`BuildExecutor`]. The default implementation runs the configured build
//! tool once per goal (`cargo test`, `cargo publish`, ...).

use crate::error::{ExecutionError, ReleaseError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One build invocation
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    /// Directory to run in
    pub working_dir: &'a Path,
    /// Goals to run, in order
    pub goals: &'a [String],
    /// Build tool executable name or path
    pub build_tool: &'a str,
    /// Extra whitespace-separated arguments appended to every goal
    pub additional_arguments: Option<&'a str>,
    /// Profiles to activate (cargo features)
    pub profiles: &'a [String],
    /// Let the build read from the terminal
    pub interactive: bool,
    /// Extra environment variables for the build
    pub environment: &'a BTreeMap<String, String>,
}

/// Runs build goals
pub trait BuildExecutor: Send + Sync {
    /// Run every goal of `request`, appending the combined output to `output`
    ///
    /// Output of a failing goal is appended before the error is returned.
    fn execute(&self, request: &BuildRequest<'_>, output: &mut String) -> Result<()>;
}

/// [`BuildExecutor`] that spawns the build tool as a subprocess
#[derive(Debug, Clone, Default)]
pub struct CommandBuildExecutor;

impl CommandBuildExecutor {
    /// Create an executor
    pub fn new() -> Self {
        Self
    }

    fn locate(tool: &str) -> Result<PathBuf> {
        which::which(tool).map_err(|e| build_error(tool, format!("Build tool not found: {}", e)))
    }

    /// Command line for a single goal
    pub fn goal_arguments(request: &BuildRequest<'_>, goal: &str) -> Vec<String> {
        let mut args: Vec<String> = goal.split_whitespace().map(str::to_string).collect();
        if !request.profiles.is_empty() {
            args.push("--features".to_string());
            args.push(request.profiles.join(","));
        }
        if let Some(extra) = request.additional_arguments {
            args.extend(extra.split_whitespace().map(str::to_string));
        }
        args
    }
}

fn build_error(command: &str, reason: String) -> ReleaseError {
    ExecutionError::Build {
        command: command.to_string(),
        reason,
    }
    .into()
}

impl BuildExecutor for CommandBuildExecutor {
    fn execute(&self, request: &BuildRequest<'_>, combined: &mut String) -> Result<()> {
        if request.goals.is_empty() {
            return Ok(());
        }
        let tool = Self::locate(request.build_tool)?;

        for goal in request.goals {
            let args = Self::goal_arguments(request, goal);
            let command_line = format!("{} {}", request.build_tool, args.join(" "));
            log::info!("Executing: {}", command_line);

            let mut cmd = Command::new(&tool);
            cmd.args(&args)
                .current_dir(request.working_dir)
                .envs(request.environment);
            if !request.interactive {
                cmd.stdin(Stdio::null());
            }

            let output = cmd
                .output()
                .map_err(|e| build_error(&command_line, e.to_string()))?;
            combined.push_str(&String::from_utf8_lossy(&output.stdout));
            combined.push_str(&String::from_utf8_lossy(&output.stderr));

            if !output.status.success() {
                return Err(build_error(
                    &command_line,
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }
        }

        Ok(())
    }
}
