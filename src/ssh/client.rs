// ABOUTME: SSH session to one deploy host, built on russh.
// ABOUTME: Verifies host keys, tries each available credential in turn, and runs commands.

use super::error::{Error, Result};
use crate::remote::CommandOutput;
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// Key files tried when neither a key nor a usable agent is configured.
const DEFAULT_KEYS: [&str; 3] = ["id_ed25519", "id_ecdsa", "id_rsa"];

/// How to reach and authenticate to a host.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Only this key is offered when set; otherwise the agent, then the
    /// default keys under `~/.ssh`.
    pub key_path: Option<PathBuf>,
    /// Accept and record a host key never seen before.
    pub trust_on_first_use: bool,
    /// Defaults to `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
    /// Upper bound for a single remote command.
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(300),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// russh callback handler. Only host key verification is customised.
pub(crate) struct HostKeyCheck {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl HostKeyCheck {
    fn new(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }

    fn lookup(&self, key: &ssh_key::PublicKey) -> std::result::Result<bool, russh::keys::Error> {
        match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, key, path),
            None => check_known_hosts(&self.host, self.port, key),
        }
    }

    fn learn(&self, key: &ssh_key::PublicKey) {
        let learned = match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            tracing::warn!(host = %self.host, "could not record host key: {}", e);
        }
    }
}

impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.lookup(server_public_key) {
            Ok(true) => Ok(true),
            Err(russh::keys::Error::KeyChanged { line }) => {
                tracing::error!(
                    host = %self.host,
                    "host key differs from known_hosts line {}; refusing to connect",
                    line
                );
                Ok(false)
            }
            Ok(false) | Err(_) if self.trust_on_first_use => {
                tracing::warn!(host = %self.host, port = self.port, "accepting new host key");
                self.learn(server_public_key);
                Ok(true)
            }
            _ => {
                tracing::error!(host = %self.host, "unknown host key and trust_first_connection is off");
                Ok(false)
            }
        }
    }
}

/// One way of proving who we are.
enum Credential {
    Agent(AgentClient<UnixStream>),
    Key {
        path: PathBuf,
        key: Arc<ssh_key::PrivateKey>,
    },
}

impl Credential {
    fn label(&self) -> String {
        match self {
            Credential::Agent(_) => "ssh-agent".to_string(),
            Credential::Key { path, .. } => path.display().to_string(),
        }
    }
}

/// An authenticated SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<HostKeyCheck>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("user", &self.config.user)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connect, verify the host key, and authenticate.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let credentials = Self::credentials(&config).await?;

        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            HostKeyCheck::new(&config),
        )
        .await
        .map_err(|e| match e {
            russh::Error::UnknownKey => Error::HostKeyRejected(config.host.clone()),
            other => Error::Connect {
                host: config.host.clone(),
                port: config.port,
                reason: other.to_string(),
            },
        })?;

        Self::authenticate(&mut handle, &config, credentials).await?;

        tracing::debug!(host = %config.host, user = %config.user, "SSH session established");
        Ok(Self { config, handle })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Credentials to offer, in order.
    async fn credentials(config: &SessionConfig) -> Result<Vec<Credential>> {
        if let Some(path) = &config.key_path {
            let key = load_secret_key(path, None).map_err(|e| Error::KeyLoad {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            return Ok(vec![Credential::Key {
                path: path.clone(),
                key: Arc::new(key),
            }]);
        }

        let mut credentials = Vec::new();
        if let Ok(agent) = AgentClient::connect_env().await {
            credentials.push(Credential::Agent(agent));
        }

        if let Some(home) = std::env::var_os("HOME") {
            let ssh_dir = PathBuf::from(home).join(".ssh");
            for name in DEFAULT_KEYS {
                let path = ssh_dir.join(name);
                if let Ok(key) = load_secret_key(&path, None) {
                    credentials.push(Credential::Key {
                        path,
                        key: Arc::new(key),
                    });
                }
            }
        }

        if credentials.is_empty() {
            return Err(Error::NoCredentials(
                "no SSH agent and no key under ~/.ssh; set `key` on the server".to_string(),
            ));
        }
        Ok(credentials)
    }

    async fn authenticate(
        handle: &mut Handle<HostKeyCheck>,
        config: &SessionConfig,
        credentials: Vec<Credential>,
    ) -> Result<()> {
        let mut tried = Vec::with_capacity(credentials.len());

        for credential in credentials {
            tried.push(credential.label());
            let accepted = match credential {
                Credential::Agent(mut agent) => {
                    Self::try_agent(handle, &config.user, &mut agent).await
                }
                Credential::Key { key, .. } => Self::try_key(handle, &config.user, key).await?,
            };
            if accepted {
                return Ok(());
            }
        }

        Err(Error::AuthenticationFailed {
            user: config.user.clone(),
            host: config.host.clone(),
            tried: tried.join(", "),
        })
    }

    async fn try_agent(
        handle: &mut Handle<HostKeyCheck>,
        user: &str,
        agent: &mut AgentClient<UnixStream>,
    ) -> bool {
        let keys = match agent.request_identities().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::debug!("ssh-agent listing failed: {}", e);
                return false;
            }
        };

        for key in keys {
            if let Ok(result) = handle
                .authenticate_publickey_with(user, key, None, agent)
                .await
                && result.success()
            {
                return true;
            }
        }
        false
    }

    async fn try_key(
        handle: &mut Handle<HostKeyCheck>,
        user: &str,
        key: Arc<ssh_key::PrivateKey>,
    ) -> Result<bool> {
        let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
        let result = handle
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
            .await?;
        Ok(result.success())
    }

    /// Run `command` and collect its output, bounded by the command timeout.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let timeout = self.config.command_timeout;
        tokio::time::timeout(timeout, self.run_channel(command))
            .await
            .unwrap_or(Err(Error::CommandTimeout(timeout)))
    }

    async fn run_channel(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(format!("open: {}", e)))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::Channel(format!("exec: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;
        let mut eof = false;

        // Output may still arrive after the exit status; stop once both are in.
        while let Some(message) = channel.wait().await {
            match message {
                ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                ChannelMsg::Eof => eof = true,
                ChannelMsg::Close => break,
                _ => {}
            }
            if eof && exit_code.is_some() {
                break;
            }
        }

        Ok(CommandOutput {
            exit_code: exit_code.ok_or(Error::ChannelClosed)?,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
