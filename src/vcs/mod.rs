// ABOUTME: Release tagging in version control before any host is touched.
// ABOUTME: `GitCli` drives the local git binary through tokio::process.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::types::{BranchName, ReleaseId};

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git {step} failed ({}): {stderr}", exit_label(.code))]
    CommandFailed {
        step: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit {}", code),
        None => "killed by signal".to_string(),
    }
}

/// Creates and publishes the tag a release is cloned from.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Bring `branch` up to date, tag its tip as `release` with `message`,
    /// and publish the tag to the shared remote.
    async fn create_release(
        &self,
        branch: &BranchName,
        release: &ReleaseId,
        message: &str,
    ) -> Result<(), VcsError>;
}

/// Git through the command line, run from the project checkout.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    remote: String,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            remote: "origin".to_string(),
        }
    }

    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn git(&self, step: &'static str, args: &[&str]) -> Result<String, VcsError> {
        tracing::info!(dir = %self.workdir.display(), "git {}", args.join(" "));
        let output = Command::new("git")
            .current_dir(&self.workdir)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                step,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn create_release(
        &self,
        branch: &BranchName,
        release: &ReleaseId,
        message: &str,
    ) -> Result<(), VcsError> {
        // The tag goes on the remote branch tip, not on whatever is checked out.
        self.git("fetch", &["fetch", &self.remote, branch.as_str()])
            .await?;
        self.git(
            "tag",
            &["tag", "-a", release.as_str(), "-m", message, "FETCH_HEAD"],
        )
        .await?;
        let tag_ref = format!("refs/tags/{}", release);
        self.git("push", &["push", &self.remote, &tag_ref]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_cli_defaults_to_origin() {
        let git = GitCli::new("/srv/checkout");
        assert_eq!(git.remote, "origin");
        assert_eq!(git.workdir(), Path::new("/srv/checkout"));
        assert_eq!(git.remote("upstream").remote, "upstream");
    }

    #[test]
    fn failure_names_the_step() {
        let err = VcsError::CommandFailed {
            step: "push",
            code: Some(1),
            stderr: "rejected".to_string(),
        };
        assert_eq!(err.to_string(), "git push failed (exit 1): rejected");
    }

    #[tokio::test]
    async fn missing_workdir_is_a_spawn_error() {
        let git = GitCli::new("/nonexistent/caravel/checkout");
        let branch = BranchName::new("main").unwrap();
        let release = ReleaseId::parse("2024-01-03_10-00-00_main").unwrap();

        let err = git
            .create_release(&branch, &release, "production")
            .await
            .unwrap_err();
        assert!(matches!(err, VcsError::Spawn(_)));
    }
}
