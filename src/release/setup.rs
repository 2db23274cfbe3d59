// ABOUTME: First-time preparation of the project directory on a host.
// ABOUTME: Creates the releases and shared roots, then fixes ownership.

use crate::remote::{Invocation, RemoteExecutor, shell};

use super::{DeployContext, DeployError, fix_permissions};

/// Placeholder created in the shared root on first setup.
pub const SHARED_PLACEHOLDER: &str = "robots.txt";

/// Create the directory skeleton and apply ownership to the project root.
pub async fn prepare_host(exec: &dyn RemoteExecutor, ctx: &DeployContext) -> Result<(), DeployError> {
    let layout = &ctx.layout;
    let dirs = [
        layout.releases_root().to_string(),
        layout.shared_root().to_string(),
        layout.shared_path("uploads"),
    ];
    let mkdir = format!(
        "mkdir -p {}",
        dirs.iter().map(|d| shell::quote(d)).collect::<Vec<_>>().join(" ")
    );
    exec.run(&Invocation::new(mkdir).elevated())
        .await
        .map_err(|e| DeployError::remote("creating directories", e))?;

    let touch = format!("touch {}", shell::quote(&layout.shared_path(SHARED_PLACEHOLDER)));
    exec.run(&Invocation::new(touch).elevated())
        .await
        .map_err(|e| DeployError::remote("creating shared placeholder", e))?;

    fix_permissions(exec, layout.project_root(), &ctx.owner).await
}
