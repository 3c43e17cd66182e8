//! Command line argument parsing and validation.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Phased, resumable release tool for Cargo workspaces
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_release_manager",
    version,
    about = "Phased, resumable release tool for Cargo workspaces",
    long_about = "Prepare, perform and roll back releases of a Cargo workspace.

Usage:
  kodegen_release_manager prepare --batch
  kodegen_release_manager prepare --dry-run
  kodegen_release_manager perform
  kodegen_release_manager rollback
  kodegen_release_manager branch --tag release-1.x"
)]
pub struct Args {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Workspace to release
    #[arg(short = 'C', long, global = true, default_value = ".", value_name = "DIR")]
    pub working_dir: PathBuf,

    /// Never prompt; use suggested values
    #[arg(short = 'B', long, global = true, env = "RELEASE_BATCH")]
    pub batch: bool,

    /// Release strategy id
    #[arg(long, global = true)]
    pub strategy: Option<String>,

    /// Release tag or branch name
    #[arg(long, global = true)]
    pub tag: Option<String>,

    /// SCM URL of the project
    #[arg(long, global = true, env = "RELEASE_SCM_URL")]
    pub scm_url: Option<String>,

    /// Release property override (e.g. -D release.acme:core=1.0)
    #[arg(short = 'D', long = "define", global = true, value_name = "KEY=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Show debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Release goals and helpers
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Map versions, rewrite manifests, commit and tag
    Prepare {
        /// Simulate every phase
        #[arg(long)]
        dry_run: bool,

        /// Start over instead of resuming a previous run
        #[arg(long)]
        no_resume: bool,
    },

    /// Check out the tag, build and publish
    Perform {
        /// Simulate every phase; keeps release state
        #[arg(long)]
        dry_run: bool,

        /// Feature profile to activate (repeatable)
        #[arg(long = "profile", value_name = "NAME")]
        profiles: Vec<String>,
    },

    /// Undo the last prepare
    Rollback,

    /// Create a branch from the working copy
    Branch {
        /// Simulate every phase
        #[arg(long)]
        dry_run: bool,
    },

    /// Set the working copy to new development versions
    UpdateVersions,

    /// Remove release state, backups and shadow manifests
    Clean,

    /// Show the state of an in-progress release
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Prepare { .. } => "prepare",
            Command::Perform { .. } => "perform",
            Command::Rollback => "rollback",
            Command::Branch { .. } => "branch",
            Command::UpdateVersions => "update-versions",
            Command::Clean => "clean",
            Command::Status { .. } => "status",
        }
    }
}

fn parse_define(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => Ok((key.trim().to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", value)),
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if !self.working_dir.is_dir() {
            return Err(format!("Working directory {} does not exist", self.working_dir.display()));
        }
        if matches!(&self.tag, Some(tag) if tag.trim().is_empty()) {
            return Err("--tag must not be empty".to_string());
        }
        if matches!(&self.strategy, Some(id) if id.trim().is_empty()) {
            return Err("--strategy must not be empty".to_string());
        }
        Ok(())
    }

    /// Override properties from `-D` flags and `--tag`/`--scm-url`/`--strategy`
    pub fn overrides(&self) -> BTreeMap<String, String> {
        let mut overrides: BTreeMap<String, String> = self.defines.iter().cloned().collect();
        if let Some(tag) = &self.tag {
            overrides.insert("tag".to_string(), tag.clone());
        }
        if let Some(url) = &self.scm_url {
            overrides.insert("scm.url".to_string(), url.clone());
        }
        if let Some(strategy) = &self.strategy {
            overrides.insert("strategy".to_string(), strategy.clone());
        }
        overrides
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_and_flags_become_overrides() {
        let args = Args::try_parse_from([
            "kodegen_release_manager",
            "prepare",
            "--batch",
            "-D",
            "release.acme:core=1.0",
            "--tag",
            "core-1.0",
        ])
        .unwrap();

        assert!(args.batch);
        assert!(matches!(args.command, Command::Prepare { dry_run: false, no_resume: false }));
        let overrides = args.overrides();
        assert_eq!(overrides["release.acme:core"], "1.0");
        assert_eq!(overrides["tag"], "core-1.0");
    }

    #[test]
    fn malformed_define_is_rejected() {
        assert!(Args::try_parse_from(["kodegen_release_manager", "clean", "-D", "novalue"]).is_err());
    }
}
