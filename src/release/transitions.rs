// ABOUTME: State transition methods for building and activating a release.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::marker::PhantomData;

use crate::hooks::{HookContext, HookReport, HookRunner};
use crate::remote::{Invocation, RemoteExecutor, shell};
use crate::types::ReleaseId;
use crate::upload::UploadTransfer;

use super::staged::Release;
use super::state::{Active, Cloned, Linked, Uploaded};
use super::{DeployContext, DeployError, LinkResolver, fix_permissions};

// =============================================================================
// -> Cloned
// =============================================================================

impl Release<Cloned> {
    /// Clone the repository at tag `id` into a fresh release directory.
    pub async fn clone_into(
        exec: &dyn RemoteExecutor,
        ctx: &DeployContext,
        id: ReleaseId,
    ) -> Result<Self, DeployError> {
        let dir = ctx.layout.release_dir(&id);
        let command = format!(
            "git clone --quiet --branch {} {} {}",
            shell::quote(id.as_str()),
            shell::quote(&ctx.repository),
            shell::quote(&dir)
        );

        exec.run(&Invocation::new(command))
            .await
            .map_err(|e| DeployError::Clone {
                host: exec.host().to_string(),
                release: id.to_string(),
                path: dir.clone(),
                reason: e.to_string(),
            })?;

        Ok(Release {
            id,
            dir,
            _state: PhantomData,
        })
    }

    /// Link every shared mapping into the release.
    pub async fn link_shared(
        self,
        exec: &dyn RemoteExecutor,
        ctx: &DeployContext,
    ) -> Result<Release<Linked>, DeployError> {
        let links = LinkResolver::new(exec, &ctx.layout);
        for mapping in &ctx.shared {
            let origin = shell::join(&self.dir, mapping.origin());
            let target = ctx.layout.shared_path(mapping.target());
            links.link(&origin, &target).await?;
        }
        Ok(self.transition())
    }
}

// =============================================================================
// Linked -> Uploaded
// =============================================================================

impl Release<Linked> {
    /// Copy each local upload into the release.
    pub async fn upload(
        self,
        exec: &dyn RemoteExecutor,
        uploader: &dyn UploadTransfer,
        ctx: &DeployContext,
    ) -> Result<Release<Uploaded>, DeployError> {
        for mapping in &ctx.uploads {
            let local = ctx.upload_root.join(mapping.origin());
            let destination = shell::join(&self.dir, mapping.target());
            let upload_error = |reason: String| DeployError::Upload {
                host: exec.host().to_string(),
                local: local.display().to_string(),
                destination: destination.clone(),
                reason,
            };

            if !local.exists() {
                return Err(upload_error("local path does not exist".to_string()));
            }

            let parent = if local.is_dir() {
                destination.as_str()
            } else {
                destination
                    .rsplit_once('/')
                    .map(|(dir, _)| dir)
                    .unwrap_or(&self.dir)
            };
            exec.run(&Invocation::new(format!("mkdir -p {}", shell::quote(parent))).quiet())
                .await
                .map_err(|e| upload_error(e.to_string()))?;

            tracing::info!(host = exec.host(), "Uploading {} to {}", local.display(), destination);
            uploader
                .upload(&local, &destination)
                .await
                .map_err(|e| upload_error(e.to_string()))?;
        }
        Ok(self.transition())
    }
}

// =============================================================================
// Uploaded -> Active
// =============================================================================

impl Release<Uploaded> {
    /// Run restarts, reloads, and after-deploy commands. Never fails.
    pub async fn run_hooks(
        &self,
        exec: &dyn RemoteExecutor,
        ctx: &DeployContext,
        previous_release: Option<String>,
    ) -> HookReport {
        let context = HookContext {
            application: ctx.application.clone(),
            release: self.id.clone(),
            release_dir: self.dir.clone(),
            host: exec.host().to_string(),
            previous_release,
        };
        HookRunner::new(exec).after_deploy(&ctx.hooks, &context).await
    }

    /// Point the current link at this release.
    pub async fn activate(
        self,
        exec: &dyn RemoteExecutor,
        ctx: &DeployContext,
    ) -> Result<Release<Active>, DeployError> {
        LinkResolver::new(exec, &ctx.layout)
            .activate(&self.dir)
            .await?;
        Ok(self.transition())
    }
}

// =============================================================================
// Active
// =============================================================================

impl Release<Active> {
    /// Apply configured ownership and modes to the release directory.
    pub async fn fix_permissions(
        &self,
        exec: &dyn RemoteExecutor,
        ctx: &DeployContext,
    ) -> Result<(), DeployError> {
        fix_permissions(exec, &self.dir, &ctx.owner).await
    }
}
