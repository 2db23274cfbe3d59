// ABOUTME: Copies local files and directories into a release on a target host.
// ABOUTME: `RsyncUpload` shells out to rsync, over ssh for remote hosts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::remote::shell;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("source does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("rsync exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("failed to run rsync: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Moves a local path to an absolute destination on one host.
///
/// Directories are copied by content into `destination`; files land at
/// `destination` itself. The destination's parent already exists.
#[async_trait]
pub trait UploadTransfer: Send + Sync {
    async fn upload(&self, source: &Path, destination: &str) -> Result<(), UploadError>;
}

/// SSH coordinates for a remote rsync destination.
#[derive(Debug, Clone)]
pub struct RsyncRemote {
    /// `user@host`
    pub destination: String,
    pub port: u16,
    pub key: Option<PathBuf>,
}

/// Upload through the rsync binary.
#[derive(Debug, Clone, Default)]
pub struct RsyncUpload {
    remote: Option<RsyncRemote>,
}

impl RsyncUpload {
    /// Copy on the local filesystem.
    pub fn local() -> Self {
        Self { remote: None }
    }

    pub fn remote(remote: RsyncRemote) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    /// Arguments passed to rsync for one upload.
    ///
    /// `--protect-args` keeps the remote path away from the remote shell;
    /// the `-e` command is split by rsync itself, so its key path is quoted.
    pub fn args(&self, source: &Path, destination: &str) -> Vec<String> {
        let mut args = vec!["-az".to_string(), "--protect-args".to_string()];

        let source = if source.is_dir() {
            // trailing slash = copy contents
            format!("{}/", source.display().to_string().trim_end_matches('/'))
        } else {
            source.display().to_string()
        };

        match &self.remote {
            Some(remote) => {
                let mut ssh = format!("ssh -p {}", remote.port);
                if let Some(key) = &remote.key {
                    ssh.push_str(&format!(" -i {}", shell::quote(&key.display().to_string())));
                }
                args.push("-e".to_string());
                args.push(ssh);
                args.push(source);
                args.push(format!("{}:{}", remote.destination, destination));
            }
            None => {
                args.push(source);
                args.push(destination.to_string());
            }
        }

        args
    }
}

#[async_trait]
impl UploadTransfer for RsyncUpload {
    async fn upload(&self, source: &Path, destination: &str) -> Result<(), UploadError> {
        if !source.exists() {
            return Err(UploadError::MissingSource(source.to_path_buf()));
        }

        let args = self.args(source, destination);
        tracing::debug!("rsync {}", args.join(" "));

        let output = Command::new("rsync")
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(UploadError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
