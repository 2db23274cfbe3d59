// ABOUTME: Error types for release building, activation, locking, and retention.
// ABOUTME: Each variant names the host and the path or step that failed.

use chrono::{DateTime, Utc};

use crate::remote::ExecError;
use crate::vcs::VcsError;

/// Category of deploy failure, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Vcs,
    Clone,
    Link,
    Upload,
    Permission,
    Retention,
    LockHeld,
    Lock,
    Remote,
    NoPreviousRelease,
}

/// Who holds a deploy lock that blocked us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolderInfo {
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub release: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("tagging release {release} failed: {error}")]
    Vcs {
        release: String,
        #[source]
        error: VcsError,
    },

    #[error("[{host}] cloning {release} into {path} failed: {reason}")]
    Clone {
        host: String,
        release: String,
        path: String,
        reason: String,
    },

    #[error("[{host}] linking {origin} -> {target} failed: {reason}")]
    Link {
        host: String,
        origin: String,
        target: String,
        reason: String,
    },

    #[error("[{host}] uploading {local} to {destination} failed: {reason}")]
    Upload {
        host: String,
        local: String,
        destination: String,
        reason: String,
    },

    #[error("[{host}] fixing permissions on {path} failed: {reason}")]
    Permission {
        host: String,
        path: String,
        reason: String,
    },

    #[error("[{host}] listing releases in {path} failed: {reason}")]
    Retention {
        host: String,
        path: String,
        reason: String,
    },

    #[error(
        "[{host}] deploy lock {path} held by {} (pid {}) since {}",
        .holder.holder, .holder.pid, .holder.started_at
    )]
    LockHeld {
        host: String,
        path: String,
        holder: LockHolderInfo,
    },

    #[error("[{host}] deploy lock {path}: {reason}")]
    Lock {
        host: String,
        path: String,
        reason: String,
    },

    #[error("[{host}] {operation} failed: {reason}")]
    Remote {
        host: String,
        operation: String,
        reason: String,
    },

    #[error("[{host}] no release older than the active one to roll back to")]
    NoPreviousRelease { host: String },
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Vcs { .. } => DeployErrorKind::Vcs,
            DeployError::Clone { .. } => DeployErrorKind::Clone,
            DeployError::Link { .. } => DeployErrorKind::Link,
            DeployError::Upload { .. } => DeployErrorKind::Upload,
            DeployError::Permission { .. } => DeployErrorKind::Permission,
            DeployError::Retention { .. } => DeployErrorKind::Retention,
            DeployError::LockHeld { .. } => DeployErrorKind::LockHeld,
            DeployError::Lock { .. } => DeployErrorKind::Lock,
            DeployError::Remote { .. } => DeployErrorKind::Remote,
            DeployError::NoPreviousRelease { .. } => DeployErrorKind::NoPreviousRelease,
        }
    }

    /// Host the failure happened on; `None` for the local VCS step.
    pub fn host(&self) -> Option<&str> {
        match self {
            DeployError::Vcs { .. } => None,
            DeployError::Clone { host, .. }
            | DeployError::Link { host, .. }
            | DeployError::Upload { host, .. }
            | DeployError::Permission { host, .. }
            | DeployError::Retention { host, .. }
            | DeployError::LockHeld { host, .. }
            | DeployError::Lock { host, .. }
            | DeployError::Remote { host, .. }
            | DeployError::NoPreviousRelease { host } => Some(host),
        }
    }

    pub fn lock_holder_info(&self) -> Option<&LockHolderInfo> {
        match self {
            DeployError::LockHeld { holder, .. } => Some(holder),
            _ => None,
        }
    }

    /// A remote step outside the named phases failed.
    pub(crate) fn remote(operation: impl Into<String>, err: ExecError) -> Self {
        DeployError::Remote {
            host: err.host().to_string(),
            operation: operation.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn lock(host: &str, path: &str, reason: impl Into<String>) -> Self {
        DeployError::Lock {
            host: host.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_held_message_names_holder() {
        let err = DeployError::LockHeld {
            host: "web1".to_string(),
            path: "/srv/shop/releases/.deploy.lock".to_string(),
            holder: LockHolderInfo {
                holder: "laptop".to_string(),
                pid: 42,
                started_at: Utc::now(),
                release: None,
            },
        };
        let message = err.to_string();
        assert!(message.contains("laptop"));
        assert!(message.contains("pid 42"));
        assert_eq!(err.kind(), DeployErrorKind::LockHeld);
        assert_eq!(err.lock_holder_info().map(|h| h.pid), Some(42));
    }

    #[test]
    fn remote_error_carries_host() {
        let err = DeployError::remote(
            "setup",
            ExecError::Transport {
                host: "web2".to_string(),
                reason: "connection reset".to_string(),
            },
        );
        assert_eq!(err.host(), Some("web2"));
        assert!(err.to_string().starts_with("[web2] setup failed"));
    }
}
