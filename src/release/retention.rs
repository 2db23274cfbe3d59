// ABOUTME: Release enumeration and pruning down to a retention count.
// ABOUTME: The active release is never deleted, even when it falls outside the window.

use crate::remote::{Invocation, RemoteExecutor, shell};
use crate::types::ReleaseId;

use super::{DeployError, LinkResolver, ReleaseLayout};

/// A release directory that could not be deleted.
#[derive(Debug, Clone)]
pub struct RetentionFailure {
    pub release: ReleaseId,
    pub path: String,
    pub reason: String,
}

/// Outcome of a prune pass.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// Newest first.
    pub kept: Vec<ReleaseId>,
    pub removed: Vec<ReleaseId>,
    /// Active release retained outside the window.
    pub protected: Option<ReleaseId>,
    pub failures: Vec<RetentionFailure>,
}

/// Which releases survive a prune.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    pub keep: Vec<ReleaseId>,
    pub delete: Vec<ReleaseId>,
    pub protected: Option<ReleaseId>,
}

/// Split `releases` into the newest `keep` and the rest, sparing `active`.
pub fn plan_retention(releases: &[ReleaseId], keep: usize, active: Option<&str>) -> RetentionPlan {
    let mut sorted = releases.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));
    sorted.dedup();

    let delete_from = keep.min(sorted.len());
    let mut delete = sorted.split_off(delete_from);
    let mut protected = None;

    if let Some(active) = active
        && let Some(pos) = delete.iter().position(|id| id.as_str() == active)
    {
        protected = Some(delete.remove(pos));
    }

    RetentionPlan {
        keep: sorted,
        delete,
        protected,
    }
}

/// Lists and prunes releases on one host.
pub struct RetentionPolicy<'a> {
    exec: &'a dyn RemoteExecutor,
    layout: &'a ReleaseLayout,
}

impl<'a> RetentionPolicy<'a> {
    pub fn new(exec: &'a dyn RemoteExecutor, layout: &'a ReleaseLayout) -> Self {
        Self { exec, layout }
    }

    /// Release directories on the host, newest first.
    ///
    /// Entries whose names are not release identifiers are ignored.
    pub async fn list_releases(&self) -> Result<Vec<ReleaseId>, DeployError> {
        let root = self.layout.releases_root();
        let output = self
            .exec
            .run(&Invocation::new(format!("ls -1 {}", shell::quote(root))).quiet())
            .await
            .map_err(|e| DeployError::Retention {
                host: self.exec.host().to_string(),
                path: root.to_string(),
                reason: e.to_string(),
            })?;

        let mut releases: Vec<ReleaseId> = output
            .lines()
            .into_iter()
            .filter_map(|name| match ReleaseId::parse(&name) {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::debug!(host = self.exec.host(), "ignoring {} in {}", name, root);
                    None
                }
            })
            .collect();
        releases.sort_by(|a, b| b.cmp(a));
        Ok(releases)
    }

    /// Delete all but the newest `keep` releases.
    ///
    /// Deletion is best-effort: a release that cannot be removed is recorded
    /// in the report and the remaining ones are still attempted.
    pub async fn prune(&self, keep: usize) -> Result<PruneReport, DeployError> {
        let releases = self.list_releases().await?;
        let active = LinkResolver::new(self.exec, self.layout)
            .current_release_name()
            .await?;

        let plan = plan_retention(&releases, keep, active.as_deref());
        if let Some(ref id) = plan.protected {
            tracing::warn!(
                host = self.exec.host(),
                "keeping active release {} outside the retention window",
                id
            );
        }

        let mut report = PruneReport {
            kept: plan.keep,
            protected: plan.protected,
            ..Default::default()
        };

        for id in plan.delete {
            let path = self.layout.release_dir(&id);
            let command = format!("rm -rf {}", shell::quote(&path));
            match self.exec.run(&Invocation::new(command).elevated()).await {
                Ok(_) => report.removed.push(id),
                Err(e) => report.failures.push(RetentionFailure {
                    release: id,
                    path,
                    reason: e.to_string(),
                }),
            }
        }

        Ok(report)
    }
}
