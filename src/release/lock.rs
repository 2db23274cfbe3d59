// ABOUTME: Per-host deploy lock preventing concurrent deploys into the same releases root.
// ABOUTME: Uses atomic file creation with lock info stored as JSON next to the releases.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::remote::{Invocation, RemoteExecutor, shell};

use super::{DeployError, LockHolderInfo};

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Release being deployed, or the operation holding the lock.
    #[serde(default)]
    pub release: Option<String>,
}

impl LockInfo {
    /// Lock info for the current process.
    pub fn new(release: Option<String>) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            release,
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        (Utc::now() - self.started_at).num_seconds() >= STALE_AFTER_SECS
    }

    fn holder_info(&self) -> LockHolderInfo {
        LockHolderInfo {
            holder: self.holder.clone(),
            pid: self.pid,
            started_at: self.started_at,
            release: self.release.clone(),
        }
    }
}

/// Locks older than this are abandoned and may be broken.
const STALE_AFTER_SECS: i64 = 60 * 60;

/// Holder of a lock whose content could not be read.
fn unknown_holder(since: DateTime<Utc>) -> LockHolderInfo {
    LockHolderInfo {
        holder: "unknown".to_string(),
        pid: 0,
        started_at: since,
        release: None,
    }
}

/// A lock file found in place when creation failed.
#[derive(Debug)]
struct ExistingLock {
    /// Seconds since the file was last modified.
    age_secs: i64,
    content: String,
}

impl ExistingLock {
    /// Parse `date +%s`, `stat -c %Y` and the file content, one after another.
    fn parse(stdout: &str) -> Option<Self> {
        let mut parts = stdout.splitn(3, '\n');
        let now: i64 = parts.next()?.trim().parse().ok()?;
        let modified: i64 = parts.next()?.trim().parse().ok()?;
        Some(Self {
            age_secs: now - modified,
            content: parts.next().unwrap_or("").to_string(),
        })
    }

    /// Holder that must be respected, or `None` when the lock may be broken.
    fn blocking_holder(&self, host: &str, force: bool) -> Option<LockHolderInfo> {
        match serde_json::from_str::<LockInfo>(self.content.trim()) {
            Ok(existing) if force => {
                tracing::warn!(
                    host,
                    "Breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) if existing.is_stale() => {
                tracing::warn!(
                    host,
                    "Auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) => Some(existing.holder_info()),
            Err(_) if force || self.age_secs >= STALE_AFTER_SECS => {
                tracing::warn!(host, "Lock info unreadable and {}s old, breaking lock", self.age_secs);
                None
            }
            Err(_) => Some(unknown_holder(
                Utc::now() - chrono::Duration::seconds(self.age_secs.max(0)),
            )),
        }
    }
}

/// A held deploy lock. Must be released explicitly.
pub struct DeployLock<'a> {
    exec: &'a dyn RemoteExecutor,
    path: String,
}

impl std::fmt::Debug for DeployLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployLock")
            .field("host", &self.exec.host())
            .field("path", &self.path)
            .finish()
    }
}

impl<'a> DeployLock<'a> {
    /// Acquire the lock at `path`.
    ///
    /// Uses shell noclobber mode so creation is atomic. A lock older than one
    /// hour, or any lock when `force` is set, is broken with a warning.
    /// Content that does not parse counts as held until the file itself is
    /// older than an hour, since a holder may still be writing it.
    pub async fn acquire(
        exec: &'a dyn RemoteExecutor,
        path: &str,
        info: LockInfo,
        force: bool,
    ) -> Result<Self, DeployError> {
        let host = exec.host();

        Self::ensure_parent_dir(exec, path).await?;

        let lock_json = serde_json::to_string(&info)
            .map_err(|e| DeployError::lock(host, path, format!("failed to serialize lock: {}", e)))?;

        // set -C makes > fail if the file already exists
        let acquire_cmd = format!(
            "(set -C; echo {} > {}) 2>/dev/null",
            shell::quote(&lock_json),
            shell::quote(path)
        );

        if Self::try_create(exec, path, &acquire_cmd).await? {
            return Ok(Self::held(exec, path));
        }

        match Self::read_existing(exec, path).await? {
            Some(existing) => {
                if let Some(holder) = existing.blocking_holder(host, force) {
                    return Err(DeployError::LockHeld {
                        host: host.to_string(),
                        path: path.to_string(),
                        holder,
                    });
                }
                Self::break_lock(exec, path, &existing, &info).await?;
            }
            // released between our create and read
            None => tracing::debug!(host, "Lock at {} vanished, retrying", path),
        }

        if !Self::try_create(exec, path, &acquire_cmd).await? {
            return Err(DeployError::lock(
                host,
                path,
                "lock acquired by another process during break",
            ));
        }

        Ok(Self::held(exec, path))
    }

    fn held(exec: &'a dyn RemoteExecutor, path: &str) -> Self {
        tracing::debug!(host = exec.host(), "Acquired deploy lock {}", path);
        Self {
            exec,
            path: path.to_string(),
        }
    }

    async fn try_create(
        exec: &dyn RemoteExecutor,
        path: &str,
        acquire_cmd: &str,
    ) -> Result<bool, DeployError> {
        let output = exec
            .run(&Invocation::new(acquire_cmd).quiet().warn_only())
            .await
            .map_err(|e| DeployError::lock(exec.host(), path, format!("failed to acquire lock: {}", e)))?;
        Ok(output.success())
    }

    async fn ensure_parent_dir(exec: &dyn RemoteExecutor, path: &str) -> Result<(), DeployError> {
        let parent = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(".");
        if parent.is_empty() {
            return Ok(());
        }
        exec.run(&Invocation::new(format!("mkdir -p {}", shell::quote(parent))).quiet())
            .await
            .map(|_| ())
            .map_err(|e| {
                DeployError::lock(exec.host(), path, format!("failed to create lock directory: {}", e))
            })
    }

    /// Content and file age of the lock at `path`, or `None` if it is gone.
    async fn read_existing(
        exec: &dyn RemoteExecutor,
        path: &str,
    ) -> Result<Option<ExistingLock>, DeployError> {
        let quoted = shell::quote(path);
        let output = exec
            .run(
                &Invocation::new(format!("date +%s && stat -c %Y {0} && cat {0}", quoted))
                    .quiet()
                    .warn_only(),
            )
            .await
            .map_err(|e| DeployError::lock(exec.host(), path, format!("failed to read lock info: {}", e)))?;

        if !output.success() {
            return Ok(None);
        }
        ExistingLock::parse(&output.stdout)
            .map(Some)
            .ok_or_else(|| DeployError::lock(exec.host(), path, "unexpected lock info output"))
    }

    /// Move the lock aside, then delete it only if it is still the one we
    /// judged breakable. A lock recreated in the meantime is put back.
    async fn break_lock(
        exec: &dyn RemoteExecutor,
        path: &str,
        existing: &ExistingLock,
        info: &LockInfo,
    ) -> Result<(), DeployError> {
        let host = exec.host();
        let aside = format!(
            "{}.broken.{}.{}",
            path,
            info.pid,
            info.started_at.timestamp_micros()
        );

        let moved = exec
            .run(
                &Invocation::new(format!("mv -- {} {}", shell::quote(path), shell::quote(&aside)))
                    .quiet()
                    .warn_only(),
            )
            .await
            .map_err(|e| DeployError::lock(host, path, format!("failed to break lock: {}", e)))?;
        if !moved.success() {
            // someone else broke it first
            return Ok(());
        }

        let taken = exec
            .run(&Invocation::new(format!("cat {}", shell::quote(&aside))).quiet().warn_only())
            .await
            .map_err(|e| DeployError::lock(host, path, format!("failed to read lock info: {}", e)))?;

        if taken.stdout.trim() != existing.content.trim() {
            tracing::warn!(host, "Lock at {} was replaced while breaking it, restoring", path);
            exec.run(
                &Invocation::new(format!(
                    "mv -n -- {0} {1}; rm -f {0}",
                    shell::quote(&aside),
                    shell::quote(path)
                ))
                .quiet()
                .warn_only(),
            )
            .await
            .map_err(|e| DeployError::lock(host, path, format!("failed to restore lock: {}", e)))?;

            let holder = serde_json::from_str::<LockInfo>(taken.stdout.trim())
                .map(|info| info.holder_info())
                .unwrap_or_else(|_| unknown_holder(Utc::now()));
            return Err(DeployError::LockHeld {
                host: host.to_string(),
                path: path.to_string(),
                holder,
            });
        }

        tracing::debug!(host, "Removing stale/forced lock at {}", path);
        Self::remove(exec, &aside).await
    }

    async fn remove(exec: &dyn RemoteExecutor, path: &str) -> Result<(), DeployError> {
        exec.run(&Invocation::new(format!("rm -f {}", shell::quote(path))).quiet())
            .await
            .map(|_| ())
            .map_err(|e| DeployError::lock(exec.host(), path, format!("failed to remove lock: {}", e)))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Release the lock.
    pub async fn release(self) -> Result<(), DeployError> {
        Self::remove(self.exec, &self.path).await
    }

    /// Run `work` while holding the lock at `path`.
    ///
    /// The lock is released whether `work` succeeds or not; a failed release
    /// is logged and does not mask the result of `work`.
    pub async fn with_lock<T, F>(
        exec: &'a dyn RemoteExecutor,
        path: &str,
        info: LockInfo,
        force: bool,
        work: F,
    ) -> Result<T, DeployError>
    where
        F: Future<Output = Result<T, DeployError>>,
    {
        let lock = Self::acquire(exec, path, info, force).await?;
        let result = work.await;
        if let Err(e) = lock.release().await {
            tracing::warn!(host = exec.host(), "Failed to release deploy lock: {}", e);
        }
        result
    }
}
