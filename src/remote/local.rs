// ABOUTME: Executor that runs commands on the local machine through `sh -c`.
// ABOUTME: Used for `local: true` servers and to drive real filesystem trees in tests.

use async_trait::async_trait;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{CommandOutput, ExecError, Privilege, RemoteExecutor, elevate};

#[derive(Debug, Clone)]
pub struct LocalExecutor {
    host: String,
    sudo: String,
    timeout: Duration,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalExecutor {
    /// Local executor without a privilege-escalation prefix.
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            sudo: String::new(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn host_name(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn sudo(mut self, prefix: impl Into<String>) -> Self {
        self.sudo = prefix.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    fn host(&self) -> &str {
        &self.host
    }

    async fn execute(&self, command: &str, privilege: Privilege) -> Result<CommandOutput, ExecError> {
        let line = match privilege {
            Privilege::Normal => command.to_string(),
            Privilege::Elevated => elevate(command, &self.sudo),
        };

        let child = Command::new("sh")
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result.map_err(|e| ExecError::Transport {
                host: self.host.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                return Err(ExecError::Timeout {
                    host: self.host.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let exit_code = match (output.status.code(), output.status.signal()) {
            (Some(code), _) => code as u32,
            (None, Some(signal)) => 128 + signal as u32,
            (None, None) => u32::MAX,
        };

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Invocation;

    #[tokio::test]
    async fn captures_stdout_and_status() {
        let exec = LocalExecutor::new();
        let output = exec.run_command("echo hello").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let exec = LocalExecutor::new();
        let err = exec.run_command("echo boom >&2; exit 3").await.unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn warn_only_returns_failed_output() {
        let exec = LocalExecutor::new();
        let output = exec
            .run(&Invocation::new("exit 2").warn_only())
            .await
            .unwrap();
        assert_eq!(output.exit_code, 2);
    }

    #[tokio::test]
    async fn quiet_does_not_hide_failures() {
        let exec = LocalExecutor::new();
        let result = exec.run(&Invocation::new("echo ok; exit 1").quiet()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn elevated_without_prefix_runs_directly() {
        let exec = LocalExecutor::new();
        let output = exec
            .run(&Invocation::new("echo elevated").elevated())
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "elevated");
    }

    #[tokio::test]
    async fn elevated_uses_prefix() {
        // `env` stands in for sudo: it runs its arguments unchanged.
        let exec = LocalExecutor::new().sudo("env");
        let output = exec
            .run(&Invocation::new("echo 'quoted arg'").elevated())
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "quoted arg");
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let exec = LocalExecutor::new().timeout(Duration::from_millis(50));
        let err = exec.run_command("sleep 5").await.unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }
}
