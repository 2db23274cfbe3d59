// ABOUTME: Error types for remote command execution.
// ABOUTME: Distinguishes transport failures from commands that ran and exited non-zero.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command exited with status {exit_code}: {command}{}", stderr_suffix(.stderr))]
    NonZeroExit {
        host: String,
        command: String,
        exit_code: u32,
        stderr: String,
    },

    #[error("failed to run command: {reason}")]
    Transport { host: String, reason: String },

    #[error("command timed out after {timeout:?}")]
    Timeout {
        host: String,
        timeout: std::time::Duration,
    },
}

impl ExecError {
    /// Host the failing command was sent to.
    pub fn host(&self) -> &str {
        match self {
            ExecError::NonZeroExit { host, .. }
            | ExecError::Transport { host, .. }
            | ExecError::Timeout { host, .. } => host,
        }
    }

    /// Exit status if the command ran to completion.
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            ExecError::NonZeroExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ({})", trimmed)
    }
}
