// ABOUTME: Diagnostics accumulator for non-fatal warnings during a command.
// ABOUTME: Collects warnings that shouldn't fail a deploy but should be summarized for users.

use crate::hooks::HookError;
use crate::release::RetentionFailure;

/// Collects non-fatal warnings during deploy operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning. Already shown as an event, so only traced at debug.
    pub fn warn(&mut self, warning: Warning) {
        tracing::debug!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of warnings of `kind`.
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// One-line summary such as `2 hook failure(s), 1 retention failure(s)`.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<String> = [
            (WarningKind::Hook, "hook failure(s)"),
            (WarningKind::Retention, "retention failure(s)"),
            (WarningKind::LockRelease, "lock release failure(s)"),
            (WarningKind::SshDisconnect, "disconnect failure(s)"),
        ]
        .into_iter()
        .filter_map(|(kind, label)| match self.count(kind) {
            0 => None,
            n => Some(format!("{} {}", n, label)),
        })
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// A non-fatal warning collected during a command.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a lock release warning.
    pub fn lock_release(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LockRelease,
            message: message.into(),
        }
    }

    /// Create an SSH disconnect warning.
    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }

    pub fn hook(error: &HookError) -> Self {
        Self {
            kind: WarningKind::Hook,
            message: error.to_string(),
        }
    }

    pub fn retention(host: &str, failure: &RetentionFailure) -> Self {
        Self {
            kind: WarningKind::Retention,
            message: format!("[{}] could not remove {}: {}", host, failure.path, failure.reason),
        }
    }
}

/// Categories of warnings that can occur during a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to release deploy lock (lock file may remain).
    LockRelease,
    /// Failed to cleanly disconnect SSH session.
    SshDisconnect,
    /// A restart, reload, or after-deploy command failed.
    Hook,
    /// A stale release could not be deleted.
    Retention,
}
