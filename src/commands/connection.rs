// ABOUTME: Opens an executor and uploader for each configured server.
// ABOUTME: Local servers run through the shell; everything else through an SSH session.

use caravel::config::{Config, ServerConfig};
use caravel::diagnostics::{Diagnostics, Warning};
use caravel::error::{Error, Result};
use caravel::output::Output;
use caravel::release::HostTarget;
use caravel::remote::{LocalExecutor, RemoteExecutor, SshExecutor};
use caravel::ssh::Session;
use caravel::upload::{RsyncRemote, RsyncUpload};

enum Executor {
    Local(LocalExecutor),
    Ssh(SshExecutor),
}

/// A connected server.
pub struct HostConnection {
    exec: Executor,
    upload: RsyncUpload,
}

impl HostConnection {
    pub async fn open(config: &Config, server: &ServerConfig) -> Result<Self> {
        if server.local {
            let exec = LocalExecutor::new()
                .host_name(&server.host)
                .sudo(&config.sudo)
                .timeout(config.command_timeout);
            return Ok(Self {
                exec: Executor::Local(exec),
                upload: RsyncUpload::local(),
            });
        }

        let session = Session::connect(server.ssh_session_config(config.command_timeout)).await?;
        Ok(Self {
            exec: Executor::Ssh(SshExecutor::new(session, &config.sudo)),
            upload: RsyncUpload::remote(RsyncRemote {
                destination: server.rsync_destination(),
                port: server.port,
                key: server.key.clone(),
            }),
        })
    }

    pub fn executor(&self) -> &dyn RemoteExecutor {
        match &self.exec {
            Executor::Local(exec) => exec,
            Executor::Ssh(exec) => exec,
        }
    }

    pub fn target(&self) -> HostTarget<'_> {
        HostTarget {
            exec: self.executor(),
            upload: &self.upload,
        }
    }

    /// Disconnect (non-fatal if it fails).
    pub async fn close(self, diag: &mut Diagnostics) {
        if let Executor::Ssh(exec) = self.exec {
            let host = exec.host().to_string();
            if let Err(e) = exec.disconnect().await {
                diag.warn(Warning::ssh_disconnect(format!(
                    "SSH disconnect failed for {}: {}",
                    host, e
                )));
            }
        }
    }
}

/// Servers that could be reached, and those that could not.
pub struct Connections {
    pub connected: Vec<HostConnection>,
    pub failed: Vec<(String, Error)>,
}

impl Connections {
    /// Report unreachable servers through `output`.
    pub fn report_failures(&self, output: &Output) {
        for (host, e) in &self.failed {
            output.warning(Some(host), &format!("connection failed: {}", e));
        }
    }

    /// Disconnect everything, collecting disconnect failures.
    pub async fn close(self, diag: &mut Diagnostics) {
        for connection in self.connected {
            connection.close(diag).await;
        }
    }
}

/// Connect to every configured server. An unreachable server does not stop
/// the others from being connected.
pub async fn connect_all(config: &Config, output: &Output) -> Connections {
    let mut connections = Connections {
        connected: Vec::with_capacity(config.servers.len()),
        failed: Vec::new(),
    };
    for server in config.servers.iter() {
        output.progress(&format!("  → Connecting to {}...", server.host));
        match HostConnection::open(config, server).await {
            Ok(connection) => connections.connected.push(connection),
            Err(e) => connections.failed.push((server.host.clone(), e)),
        }
    }
    connections
}
