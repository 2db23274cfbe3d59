// ABOUTME: Manual rollback to the release immediately older than the active one.
// ABOUTME: Only the current link moves; nothing is cloned or deleted.

use crate::remote::RemoteExecutor;
use crate::types::ReleaseId;

use super::{DeployError, LinkResolver, ReleaseLayout, RetentionPolicy};

/// Where the current link pointed before and after a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOutcome {
    pub host: String,
    pub from: ReleaseId,
    pub to: ReleaseId,
}

/// The release just older than `active` in `releases` (newest first).
pub fn previous_release<'r>(releases: &'r [ReleaseId], active: &str) -> Option<&'r ReleaseId> {
    releases
        .iter()
        .position(|id| id.as_str() == active)
        .and_then(|pos| releases.get(pos + 1))
}

/// Point the current link at the release preceding the active one.
pub async fn rollback(
    exec: &dyn RemoteExecutor,
    layout: &ReleaseLayout,
) -> Result<RollbackOutcome, DeployError> {
    let no_previous = || DeployError::NoPreviousRelease {
        host: exec.host().to_string(),
    };

    let releases = RetentionPolicy::new(exec, layout).list_releases().await?;
    let links = LinkResolver::new(exec, layout);
    let active = links.current_release_name().await?.ok_or_else(no_previous)?;

    let from = releases
        .iter()
        .find(|id| id.as_str() == active)
        .cloned()
        .ok_or_else(no_previous)?;
    let to = previous_release(&releases, &active)
        .cloned()
        .ok_or_else(no_previous)?;

    tracing::info!(host = exec.host(), "Rolling back from {} to {}", from, to);
    links.activate(&layout.release_dir(&to)).await?;

    Ok(RollbackOutcome {
        host: exec.host().to_string(),
        from,
        to,
    })
}
