// ABOUTME: Post-deploy hooks: service restarts, reloads, and after-deploy command lists.
// ABOUTME: Failures are collected into a report and never abort the deploy.

use std::collections::BTreeMap;
use std::fmt;

use crate::remote::{Invocation, RemoteExecutor, shell};
use crate::types::{AppName, ReleaseId};

/// Kind of post-deploy side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Restart,
    Reload,
    Command,
}

impl HookKind {
    pub fn label(&self) -> &'static str {
        match self {
            HookKind::Restart => "restart",
            HookKind::Reload => "reload",
            HookKind::Command => "command",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hook configuration carried in the deploy context.
#[derive(Debug, Clone, Default)]
pub struct HookSettings {
    pub restart: Vec<String>,
    pub reload: Vec<String>,
    pub after_deploy: Vec<String>,
    /// Halt the after-deploy list at its first failure.
    pub stop_on_error: bool,
    /// Extra variables exported to after-deploy commands.
    pub environment: BTreeMap<String, String>,
}

/// Facts about the release exported to after-deploy commands.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub application: AppName,
    pub release: ReleaseId,
    pub release_dir: String,
    pub host: String,
    pub previous_release: Option<String>,
}

impl HookContext {
    /// Convert context to environment variables.
    pub fn to_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("CARAVEL_APPLICATION".to_string(), self.application.to_string());
        env.insert("CARAVEL_RELEASE".to_string(), self.release.to_string());
        env.insert("CARAVEL_RELEASE_DIR".to_string(), self.release_dir.clone());
        env.insert("CARAVEL_BRANCH".to_string(), self.release.branch().to_string());
        env.insert("CARAVEL_HOST".to_string(), self.host.clone());
        if let Some(ref prev) = self.previous_release {
            env.insert("CARAVEL_PREVIOUS_RELEASE".to_string(), prev.clone());
        }
        env
    }
}

/// A failed restart, reload, or command.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{host}] {kind} '{subject}' failed: {reason}")]
pub struct HookError {
    pub host: String,
    pub kind: HookKind,
    pub subject: String,
    pub exit_code: Option<u32>,
    pub reason: String,
}

/// Outcome of a hook phase.
#[derive(Debug, Clone, Default)]
pub struct HookReport {
    /// Hooks that were attempted.
    pub attempted: usize,
    pub failures: Vec<HookError>,
    /// Commands never attempted because an earlier one failed.
    pub skipped: Vec<String>,
}

impl HookReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    fn record(&mut self, result: Result<(), HookError>) {
        self.attempted += 1;
        if let Err(e) = result {
            self.failures.push(e);
        }
    }

    fn merge(&mut self, other: HookReport) {
        self.attempted += other.attempted;
        self.failures.extend(other.failures);
        self.skipped.extend(other.skipped);
    }
}

/// Runs hooks on one host through its executor.
pub struct HookRunner<'a> {
    exec: &'a dyn RemoteExecutor,
}

impl<'a> HookRunner<'a> {
    pub fn new(exec: &'a dyn RemoteExecutor) -> Self {
        Self { exec }
    }

    pub async fn restart(&self, service: &str) -> Result<(), HookError> {
        tracing::info!(host = self.exec.host(), "Restarting {}", service);
        self.service(HookKind::Restart, service).await
    }

    pub async fn reload(&self, service: &str) -> Result<(), HookError> {
        tracing::info!(host = self.exec.host(), "Reloading {}", service);
        self.service(HookKind::Reload, service).await
    }

    async fn service(&self, kind: HookKind, service: &str) -> Result<(), HookError> {
        let command = format!("service {} {}", shell::quote(service), kind.label());
        self.exec
            .run(&Invocation::new(command).elevated())
            .await
            .map(|_| ())
            .map_err(|e| HookError {
                host: self.exec.host().to_string(),
                kind,
                subject: service.to_string(),
                exit_code: e.exit_code(),
                reason: e.to_string(),
            })
    }

    /// Run `commands` in order from `working_dir` with `env` exported.
    ///
    /// With `stop_on_error` the first failure ends the list and the rest are
    /// reported as skipped; otherwise every command is attempted.
    pub async fn run_command_list(
        &self,
        commands: &[String],
        working_dir: &str,
        env: &BTreeMap<String, String>,
        stop_on_error: bool,
    ) -> HookReport {
        let mut report = HookReport::default();
        let exports: String = env
            .iter()
            .map(|(k, v)| format!("export {}={} && ", k, shell::quote(v)))
            .collect();

        for (index, command) in commands.iter().enumerate() {
            tracing::info!(host = self.exec.host(), dir = working_dir, "Running: {}", command);
            let line = format!(
                "cd {} && {}sh -c {}",
                shell::quote(working_dir),
                exports,
                shell::quote(command)
            );

            let result = self
                .exec
                .run(&Invocation::new(line))
                .await
                .map(|_| ())
                .map_err(|e| HookError {
                    host: self.exec.host().to_string(),
                    kind: HookKind::Command,
                    subject: command.clone(),
                    exit_code: e.exit_code(),
                    reason: e.to_string(),
                });

            let failed = result.is_err();
            report.record(result);

            if failed && stop_on_error {
                report.skipped = commands[index + 1..].to_vec();
                break;
            }
        }

        report
    }

    /// Restart, then reload, then run the after-deploy list inside the release.
    pub async fn after_deploy(&self, settings: &HookSettings, context: &HookContext) -> HookReport {
        let mut report = HookReport::default();

        for service in &settings.restart {
            report.record(self.restart(service).await);
        }

        for service in &settings.reload {
            report.record(self.reload(service).await);
        }

        let mut env = settings.environment.clone();
        env.extend(context.to_env());
        report.merge(
            self.run_command_list(
                &settings.after_deploy,
                &context.release_dir,
                &env,
                settings.stop_on_error,
            )
            .await,
        );

        report
    }
}
