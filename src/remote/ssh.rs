// ABOUTME: Executor that runs commands over an established SSH session.
// ABOUTME: Elevated commands are wrapped in the configured sudo prefix before sending.

use async_trait::async_trait;

use super::{CommandOutput, ExecError, Privilege, RemoteExecutor, elevate};
use crate::ssh::{Error as SshError, Session};

#[derive(Debug)]
pub struct SshExecutor {
    session: Session,
    sudo: String,
}

impl SshExecutor {
    pub fn new(session: Session, sudo: impl Into<String>) -> Self {
        Self {
            session,
            sudo: sudo.into(),
        }
    }

    /// Close the underlying session.
    pub async fn disconnect(self) -> Result<(), SshError> {
        self.session.disconnect().await
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    fn host(&self) -> &str {
        self.session.host()
    }

    async fn execute(&self, command: &str, privilege: Privilege) -> Result<CommandOutput, ExecError> {
        let line = match privilege {
            Privilege::Normal => command.to_string(),
            Privilege::Elevated => elevate(command, &self.sudo),
        };

        self.session.exec(&line).await.map_err(|e| match e {
            SshError::CommandTimeout(timeout) => ExecError::Timeout {
                host: self.host().to_string(),
                timeout,
            },
            other => ExecError::Transport {
                host: self.host().to_string(),
                reason: other.to_string(),
            },
        })
    }
}
