// ABOUTME: Orchestrates one deploy: confirmation, tagging, then a pipeline per host.
// ABOUTME: Each host pipeline runs under that host's deploy lock.

use std::future::Future;

use futures::future::join_all;

use crate::confirm::Confirm;
use crate::hooks::HookReport;
use crate::remote::RemoteExecutor;
use crate::types::{BranchName, ReleaseId, ReleaseIdGenerator};
use crate::upload::UploadTransfer;
use crate::vcs::VersionControl;

use super::staged::Release;
use super::state::Cloned;
use super::{
    DeployContext, DeployError, DeployEvent, DeployLock, DeployObserver, LinkResolver, LockInfo,
    Phase, PruneReport, RetentionPolicy,
};

/// One host to deploy to: how to run commands there and how to copy files.
#[derive(Clone, Copy)]
pub struct HostTarget<'a> {
    pub exec: &'a dyn RemoteExecutor,
    pub upload: &'a dyn UploadTransfer,
}

impl HostTarget<'_> {
    pub fn host(&self) -> &str {
        self.exec.host()
    }
}

/// What happened on one host.
#[derive(Debug)]
pub struct HostReport {
    pub host: String,
    pub result: Result<HostSummary, DeployError>,
}

/// A host whose release was built and activated.
#[derive(Debug, Clone)]
pub struct HostSummary {
    pub release_dir: String,
    pub previous_release: Option<String>,
    pub hooks: HookReport,
    pub prune: PruneReport,
}

#[derive(Debug)]
pub struct DeployReport {
    pub release: ReleaseId,
    pub hosts: Vec<HostReport>,
}

impl DeployReport {
    pub fn failed(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts.iter().filter(|h| h.result.is_err())
    }

    pub fn succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

#[derive(Debug)]
pub enum DeployOutcome {
    /// The operator declined; nothing was changed.
    Declined,
    Deployed(DeployReport),
}

/// Runs deploys for one application and destination.
pub struct ReleaseCoordinator<'a> {
    context: &'a DeployContext,
    vcs: &'a dyn VersionControl,
    confirm: &'a dyn Confirm,
    observer: &'a dyn DeployObserver,
    ids: ReleaseIdGenerator,
    destination: String,
    parallel: bool,
    force_lock: bool,
}

impl<'a> ReleaseCoordinator<'a> {
    pub fn new(
        context: &'a DeployContext,
        vcs: &'a dyn VersionControl,
        confirm: &'a dyn Confirm,
        observer: &'a dyn DeployObserver,
    ) -> Self {
        Self {
            context,
            vcs,
            confirm,
            observer,
            ids: ReleaseIdGenerator::new(),
            destination: "production".to_string(),
            parallel: false,
            force_lock: false,
        }
    }

    /// Name used in the confirmation prompt and the tag message.
    pub fn destination(mut self, name: impl Into<String>) -> Self {
        self.destination = name.into();
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Break a deploy lock held by someone else.
    pub fn force_lock(mut self, force: bool) -> Self {
        self.force_lock = force;
        self
    }

    /// Ask the operator whether to deploy `branch` to `host_count` hosts.
    ///
    /// Needs no connection, so callers can ask before reaching any host.
    pub fn confirm(&self, branch: &BranchName, host_count: usize) -> bool {
        let question = format!(
            "Deploy branch '{}' of {} to {} ({} host(s))?",
            branch, self.context.application, self.destination, host_count
        );
        let confirmed = self.confirm.confirm(&question);
        if !confirmed {
            tracing::info!("Deploy declined");
        }
        confirmed
    }

    /// Confirm, then deploy `branch` to every host in `hosts`.
    pub async fn deploy(
        &self,
        branch: &BranchName,
        hosts: &[HostTarget<'_>],
    ) -> Result<DeployOutcome, DeployError> {
        if !self.confirm(branch, hosts.len()) {
            return Ok(DeployOutcome::Declined);
        }
        self.deploy_confirmed(branch, hosts)
            .await
            .map(DeployOutcome::Deployed)
    }

    /// Deploy `branch` to every host in `hosts` without asking.
    ///
    /// Tagging happens once, before any host is touched; if it fails no host
    /// is contacted. After that each host succeeds or fails on its own.
    pub async fn deploy_confirmed(
        &self,
        branch: &BranchName,
        hosts: &[HostTarget<'_>],
    ) -> Result<DeployReport, DeployError> {
        let release = self.ids.next(branch);
        tracing::info!(release = %release, "Deploying {}", release);

        self.phase(None, Phase::Tag, async {
            self.vcs
                .create_release(branch, &release, &self.destination)
                .await
                .map_err(|error| DeployError::Vcs {
                    release: release.to_string(),
                    error,
                })
        })
        .await?;

        let reports = if self.parallel {
            join_all(hosts.iter().map(|host| self.deploy_host(&release, *host))).await
        } else {
            let mut reports = Vec::with_capacity(hosts.len());
            for host in hosts {
                reports.push(self.deploy_host(&release, *host).await);
            }
            reports
        };

        Ok(DeployReport {
            release,
            hosts: reports,
        })
    }

    async fn deploy_host(&self, release: &ReleaseId, target: HostTarget<'_>) -> HostReport {
        let exec = target.exec;
        let host = exec.host().to_string();
        let lock_path = self.context.layout.lock_path();

        let lock = self
            .phase(
                Some(&host),
                Phase::Lock,
                DeployLock::acquire(
                    exec,
                    &lock_path,
                    LockInfo::new(Some(release.to_string())),
                    self.force_lock,
                ),
            )
            .await;

        let result = match lock {
            Ok(lock) => {
                let result = self.pipeline(release, target).await;
                if let Err(e) = lock.release().await {
                    self.warn(&host, format!("failed to release deploy lock: {}", e));
                }
                result
            }
            Err(e) => Err(e),
        };

        HostReport { host, result }
    }

    async fn pipeline(
        &self,
        release: &ReleaseId,
        target: HostTarget<'_>,
    ) -> Result<HostSummary, DeployError> {
        let exec = target.exec;
        let host = exec.host();
        let ctx = self.context;

        let previous_release = LinkResolver::new(exec, &ctx.layout)
            .current_release_name()
            .await?;

        let cloned = self
            .phase(
                Some(host),
                Phase::Clone,
                Release::<Cloned>::clone_into(exec, ctx, release.clone()),
            )
            .await?;
        let linked = self
            .phase(Some(host), Phase::LinkShared, cloned.link_shared(exec, ctx))
            .await?;
        let uploaded = self
            .phase(
                Some(host),
                Phase::Upload,
                linked.upload(exec, target.upload, ctx),
            )
            .await?;

        self.emit(DeployEvent::PhaseStarted {
            host: Some(host.to_string()),
            phase: Phase::Hooks,
        });
        let hooks = uploaded
            .run_hooks(exec, ctx, previous_release.clone())
            .await;
        for failure in &hooks.failures {
            self.warn(host, failure.to_string());
        }
        if !hooks.skipped.is_empty() {
            self.warn(
                host,
                format!("skipped after failure: {}", hooks.skipped.join(", ")),
            );
        }
        self.emit(DeployEvent::PhaseFinished {
            host: Some(host.to_string()),
            phase: Phase::Hooks,
        });

        let active = self
            .phase(Some(host), Phase::Activate, uploaded.activate(exec, ctx))
            .await?;
        self.phase(
            Some(host),
            Phase::Permissions,
            active.fix_permissions(exec, ctx),
        )
        .await?;

        let prune = self
            .phase(
                Some(host),
                Phase::Prune,
                RetentionPolicy::new(exec, &ctx.layout).prune(ctx.keep_releases),
            )
            .await?;
        for failure in &prune.failures {
            self.warn(
                host,
                format!("could not remove {}: {}", failure.path, failure.reason),
            );
        }

        Ok(HostSummary {
            release_dir: active.dir().to_string(),
            previous_release,
            hooks,
            prune,
        })
    }

    /// Run `work` bracketed by started and finished/failed events.
    async fn phase<T, F>(&self, host: Option<&str>, phase: Phase, work: F) -> Result<T, DeployError>
    where
        F: Future<Output = Result<T, DeployError>>,
    {
        let host = host.map(str::to_string);
        self.emit(DeployEvent::PhaseStarted {
            host: host.clone(),
            phase,
        });

        let result = work.await;
        match &result {
            Ok(_) => self.emit(DeployEvent::PhaseFinished { host, phase }),
            Err(e) => self.emit(DeployEvent::PhaseFailed {
                host,
                phase,
                error: e.to_string(),
            }),
        }
        result
    }

    fn warn(&self, host: &str, message: String) {
        self.emit(DeployEvent::Warning {
            host: Some(host.to_string()),
            message,
        });
    }

    fn emit(&self, event: DeployEvent) {
        self.observer.on_event(&event);
    }
}
