//! [`ScmProvider`] backed by the system `git` executable.

use super::operations::{CommitInfo, ScmProvider};
use crate::error::{ExecutionError, ReleaseError, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Remote used for pushes and remote tag deletion
pub const DEFAULT_REMOTE: &str = "origin";

/// Git provider running `git` as a subprocess
#[derive(Debug, Clone)]
pub struct GitScmProvider {
    git: PathBuf,
    remote: String,
}

impl GitScmProvider {
    /// Locate `git` on `PATH`
    pub fn new() -> Result<Self> {
        let git = which::which("git").map_err(|e| ExecutionError::Scm {
            operation: "locate git".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            git,
            remote: DEFAULT_REMOTE.to_string(),
        })
    }

    /// Use a different remote name
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Create a git command for the repository at `dir`
    ///
    /// The caller's environment is inherited so SSH agents, askpass helpers
    /// and XDG configuration keep working for pushes and clones. Variables
    /// that would point git at another repository are dropped.
    fn git_cmd(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.arg("-C").arg(dir);

        cmd.env_clear();
        cmd.envs(git_environment(std::env::vars_os()));

        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd.arg("-c").arg("core.quotePath=false");
        cmd
    }

    fn run(&self, mut cmd: Command, operation: &str) -> Result<String> {
        log::debug!("Running {:?}", cmd);
        let output = cmd.output().map_err(|e| scm_error(operation, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(scm_error(operation, stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn git(&self, dir: &Path, args: &[&str], operation: &str) -> Result<String> {
        let mut cmd = self.git_cmd(dir);
        cmd.args(args);
        self.run(cmd, operation)
    }

    fn head(&self, dir: &Path) -> Result<String> {
        Ok(self.git(dir, &["rev-parse", "HEAD"], "rev-parse")?.trim().to_string())
    }
}

/// Variables that override which repository git operates on
const REPOSITORY_VARIABLES: [&str; 7] = [
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
    "GIT_COMMON_DIR",
    "GIT_NAMESPACE",
];

/// Environment handed to git: everything except repository overrides
fn git_environment<I>(vars: I) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter(|(key, _)| {
            !REPOSITORY_VARIABLES
                .iter()
                .any(|name| key.as_os_str() == OsStr::new(name))
        })
        .collect()
}

fn scm_error(operation: &str, reason: String) -> ReleaseError {
    ExecutionError::Scm {
        operation: operation.to_string(),
        reason,
    }
    .into()
}

impl ScmProvider for GitScmProvider {
    fn status(&self, dir: &Path) -> Result<Vec<String>> {
        let stdout = self.git(dir, &["status", "--porcelain", "--untracked-files=normal"], "status")?;
        Ok(stdout
            .lines()
            .filter(|line| line.len() > 3)
            .map(|line| {
                let path = &line[3..];
                // Renames are reported as "old -> new"
                path.rsplit(" -> ").next().unwrap_or(path).to_string()
            })
            .collect())
    }

    fn checkin(&self, dir: &Path, files: &[PathBuf], message: &str) -> Result<CommitInfo> {
        if !files.is_empty() {
            let mut add = self.git_cmd(dir);
            add.arg("add").arg("--").args(files);
            self.run(add, "add")?;
        }

        let staged = self
            .git_cmd(dir)
            .args(["diff", "--cached", "--quiet"])
            .status()
            .map_err(|e| scm_error("diff", e.to_string()))?;
        if staged.success() {
            log::info!("Nothing to commit in {}", dir.display());
            return Ok(CommitInfo {
                revision: self.head(dir)?,
                created: false,
            });
        }

        self.git(dir, &["commit", "-m", message], "commit")?;
        Ok(CommitInfo {
            revision: self.head(dir)?,
            created: true,
        })
    }

    fn tag(&self, dir: &Path, name: &str, message: &str) -> Result<()> {
        self.git(dir, &["tag", "-a", name, "-m", message], "tag")?;
        Ok(())
    }

    fn branch(&self, dir: &Path, name: &str) -> Result<()> {
        self.git(dir, &["branch", name], "branch")?;
        Ok(())
    }

    fn untag(&self, dir: &Path, name: &str, remote: bool) -> Result<()> {
        self.git(dir, &["tag", "-d", name], "untag")?;
        if remote {
            let tag_ref = format!("refs/tags/{}", name);
            self.git(dir, &["push", self.remote.as_str(), "--delete", tag_ref.as_str()], "untag")?;
        }
        Ok(())
    }

    fn push(&self, dir: &Path, refspec: Option<&str>) -> Result<()> {
        let refspec = refspec.unwrap_or("HEAD");
        self.git(dir, &["push", self.remote.as_str(), refspec], "push")?;
        Ok(())
    }

    fn checkout(&self, source: &str, label: &str, target: &Path) -> Result<()> {
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| ReleaseError::io(format!("Failed to create {}", parent.display()), e))?;

        let mut cmd = self.git_cmd(parent);
        cmd.args(["clone", "--depth", "1", "--branch", label, source]).arg(target);
        self.run(cmd, "checkout")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn provider_with_repo() -> Option<(GitScmProvider, tempfile::TempDir)> {
        let provider = GitScmProvider::new().ok()?;
        let dir = tempfile::tempdir().ok()?;
        provider.git(dir.path(), &["init", "-q"], "init").ok()?;
        provider.git(dir.path(), &["config", "user.name", "Release Bot"], "config").ok()?;
        provider.git(dir.path(), &["config", "user.email", "release@example.com"], "config").ok()?;
        provider.git(dir.path(), &["config", "commit.gpgsign", "false"], "config").ok()?;
        provider.git(dir.path(), &["config", "tag.gpgsign", "false"], "config").ok()?;
        Some((provider, dir))
    }

    #[test]
    fn credentials_helpers_reach_git() {
        let vars = [
            ("PATH", "/usr/bin"),
            ("SSH_AUTH_SOCK", "/tmp/agent.sock"),
            ("GIT_SSH_COMMAND", "ssh -i ~/.ssh/release"),
            ("GIT_ASKPASS", "/usr/libexec/askpass"),
            ("XDG_CONFIG_HOME", "/home/release/.config"),
            ("GIT_DIR", "/elsewhere/.git"),
            ("GIT_WORK_TREE", "/elsewhere"),
        ]
        .map(|(k, v)| (OsString::from(k), OsString::from(v)));

        let kept: Vec<String> = git_environment(vars)
            .into_iter()
            .map(|(k, _)| k.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            kept,
            vec!["PATH", "SSH_AUTH_SOCK", "GIT_SSH_COMMAND", "GIT_ASKPASS", "XDG_CONFIG_HOME"]
        );
    }

    #[test]
    fn git_command_inherits_process_environment() {
        let provider = GitScmProvider {
            git: PathBuf::from("git"),
            remote: DEFAULT_REMOTE.to_string(),
        };
        let cmd = provider.git_cmd(Path::new("."));
        let passed: Vec<&OsStr> = cmd.get_envs().filter(|(_, v)| v.is_some()).map(|(k, _)| k).collect();

        for (key, _) in std::env::vars_os() {
            let repository = REPOSITORY_VARIABLES.iter().any(|name| key.as_os_str() == OsStr::new(name));
            assert_eq!(passed.contains(&key.as_os_str()), !repository, "{:?}", key);
        }
    }

    #[test]
    fn commit_tag_and_untag() {
        let Some((git, dir)) = provider_with_repo() else {
            return;
        };
        let manifest = dir.path().join("Cargo.toml");
        fs::write(&manifest, "[package]\nname = \"app\"\nversion = \"1.0.0\"\n").unwrap();

        assert_eq!(git.status(dir.path()).unwrap(), vec!["Cargo.toml"]);

        let commit = git.checkin(dir.path(), &[manifest.clone()], "[release] prepare app-1.0.0").unwrap();
        assert!(commit.created);
        assert!(git.status(dir.path()).unwrap().is_empty());

        let again = git.checkin(dir.path(), &[manifest], "[release] nothing").unwrap();
        assert!(!again.created);
        assert_eq!(again.revision, commit.revision);

        git.tag(dir.path(), "app-1.0.0", "release").unwrap();
        let tags = git.git(dir.path(), &["tag", "--list"], "tag").unwrap();
        assert!(tags.contains("app-1.0.0"));

        git.untag(dir.path(), "app-1.0.0", false).unwrap();
        let tags = git.git(dir.path(), &["tag", "--list"], "tag").unwrap();
        assert!(tags.trim().is_empty());
    }

    #[test]
    fn failing_command_is_an_execution_error() {
        let Some((git, dir)) = provider_with_repo() else {
            return;
        };
        let err = git.untag(dir.path(), "missing-tag", false).unwrap_err();
        assert!(!err.is_failure());
        assert!(err.to_string().contains("untag"));
    }
}
