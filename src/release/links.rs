// ABOUTME: Symbolic link management: shared-path links and the active-release link.
// ABOUTME: Activation builds a new link beside `current` and renames it over the old one.

use crate::remote::{Invocation, RemoteExecutor, shell};

use super::{DeployError, ReleaseLayout};

/// Creates and inspects links on one host.
pub struct LinkResolver<'a> {
    exec: &'a dyn RemoteExecutor,
    layout: &'a ReleaseLayout,
}

impl<'a> LinkResolver<'a> {
    pub fn new(exec: &'a dyn RemoteExecutor, layout: &'a ReleaseLayout) -> Self {
        Self { exec, layout }
    }

    /// Make `origin` a symbolic link to `target`.
    ///
    /// Whatever sits at `origin` is removed first: a link is unlinked, a file
    /// or directory is deleted recursively.
    pub async fn link(&self, origin: &str, target: &str) -> Result<(), DeployError> {
        let o = shell::quote(origin);
        let command = format!(
            "if [ -L {o} ]; then unlink {o}; elif [ -e {o} ]; then rm -rf {o}; fi && ln -s {} {o}",
            shell::quote(target),
        );

        self.exec
            .run(&Invocation::new(command))
            .await
            .map(|_| ())
            .map_err(|e| DeployError::Link {
                host: self.exec.host().to_string(),
                origin: origin.to_string(),
                target: target.to_string(),
                reason: e.to_string(),
            })
    }

    /// Point the current link at `release_dir`.
    ///
    /// The new link is created under a temporary name and renamed over the
    /// old one, so `current` is never missing. A directory left at `current`
    /// from a non-link layout is removed first.
    pub async fn activate(&self, release_dir: &str) -> Result<(), DeployError> {
        let current = self.layout.current_path();
        let cur = shell::quote(current);
        let tmp = shell::quote(&format!("{}.next", current));
        let command = format!(
            "rm -rf {tmp} && ln -s {} {tmp} && \
             if [ -d {cur} ] && [ ! -L {cur} ]; then rm -rf {cur}; fi && \
             mv -Tf {tmp} {cur}",
            shell::quote(release_dir),
        );

        self.exec
            .run(&Invocation::new(command).elevated())
            .await
            .map(|_| ())
            .map_err(|e| DeployError::Link {
                host: self.exec.host().to_string(),
                origin: current.to_string(),
                target: release_dir.to_string(),
                reason: e.to_string(),
            })
    }

    /// Target of the current link, or `None` when there is no link yet.
    pub async fn current_target(&self) -> Result<Option<String>, DeployError> {
        let command = format!("readlink {}", shell::quote(self.layout.current_path()));
        let output = self
            .exec
            .run(&Invocation::new(command).quiet().warn_only())
            .await
            .map_err(|e| DeployError::remote("reading the current link", e))?;

        let target = output.stdout.trim();
        if !output.success() || target.is_empty() {
            return Ok(None);
        }
        Ok(Some(target.to_string()))
    }

    /// Directory name of the active release, if any.
    pub async fn current_release_name(&self) -> Result<Option<String>, DeployError> {
        Ok(self
            .current_target()
            .await?
            .map(|target| shell::basename(&target).to_string()))
    }
}
