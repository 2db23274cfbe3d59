// ABOUTME: Remote command execution primitive shared by every deploy component.
// ABOUTME: Implementations run over SSH or locally; callers only see exit status and output.

mod error;
mod local;
pub mod shell;
mod ssh;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use ssh::SshExecutor;

use async_trait::async_trait;

/// Privilege level a command runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Privilege {
    /// The connecting user.
    #[default]
    Normal,
    /// Wrapped in the configured privilege-escalation prefix.
    Elevated,
}

/// Exit status and captured output of a command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Non-empty trimmed lines of stdout.
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A command plus how it should be run.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub privilege: Privilege,
    /// Log at trace level instead of info.
    pub quiet: bool,
    /// Return the output instead of an error on non-zero exit.
    pub warn_only: bool,
}

impl Invocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            privilege: Privilege::Normal,
            quiet: false,
            warn_only: false,
        }
    }

    pub fn elevated(mut self) -> Self {
        self.privilege = Privilege::Elevated;
        self
    }

    pub fn privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn warn_only(mut self) -> Self {
        self.warn_only = true;
        self
    }
}

/// Runs commands on one target host.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Host name used in logs and errors.
    fn host(&self) -> &str;

    /// Run a command and return its output whatever the exit status.
    /// Errors only when the command could not be run at all.
    async fn execute(&self, command: &str, privilege: Privilege) -> Result<CommandOutput, ExecError>;

    /// Run an invocation. Failure is decided by exit status alone.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        if invocation.quiet {
            tracing::trace!(host = self.host(), privilege = ?invocation.privilege, "{}", invocation.command);
        } else {
            tracing::info!(host = self.host(), privilege = ?invocation.privilege, "{}", invocation.command);
        }

        let output = self.execute(&invocation.command, invocation.privilege).await?;

        if !invocation.quiet {
            if !output.stdout.trim().is_empty() {
                tracing::debug!(host = self.host(), "stdout: {}", output.stdout.trim_end());
            }
            if !output.stderr.trim().is_empty() {
                tracing::debug!(host = self.host(), "stderr: {}", output.stderr.trim_end());
            }
        }

        if output.success() || invocation.warn_only {
            if !output.success() && !invocation.quiet {
                tracing::warn!(
                    host = self.host(),
                    exit_code = output.exit_code,
                    "tolerated failure: {}",
                    invocation.command
                );
            }
            return Ok(output);
        }

        Err(ExecError::NonZeroExit {
            host: self.host().to_string(),
            command: invocation.command.clone(),
            exit_code: output.exit_code,
            stderr: output.stderr,
        })
    }

    /// Shorthand for a normal-privilege invocation that must succeed.
    async fn run_command(&self, command: &str) -> Result<CommandOutput, ExecError> {
        self.run(&Invocation::new(command)).await
    }
}

/// Wrap a command for elevated execution with the given prefix.
///
/// An empty prefix runs the command unchanged.
pub fn elevate(command: &str, sudo: &str) -> String {
    let sudo = sudo.trim();
    if sudo.is_empty() {
        return command.to_string();
    }
    format!("{} sh -c {}", sudo, shell::quote(command))
}
