// ABOUTME: Resolved, per-destination settings handed to every deploy component.
// ABOUTME: Built once from configuration before any host is contacted.

use std::path::PathBuf;

use crate::hooks::HookSettings;
use crate::types::{AppName, LinkMapping};

use super::ReleaseLayout;

pub use crate::config::Owner;

/// Everything a host pipeline needs to build and activate a release.
#[derive(Debug, Clone)]
pub struct DeployContext {
    pub application: AppName,
    /// Clone URL, as reachable from the target hosts.
    pub repository: String,
    pub layout: ReleaseLayout,
    /// `origin` inside the release, `target` under the shared root.
    pub shared: Vec<LinkMapping>,
    /// `origin` on the local machine, `target` inside the release.
    pub uploads: Vec<LinkMapping>,
    /// Directory upload origins are resolved against.
    pub upload_root: PathBuf,
    pub keep_releases: usize,
    pub hooks: HookSettings,
    pub owner: Owner,
}

impl DeployContext {
    /// Minimal context for `application` rooted at `project_root`.
    pub fn new(application: AppName, repository: impl Into<String>, project_root: &str) -> Self {
        Self {
            application,
            repository: repository.into(),
            layout: ReleaseLayout::under(project_root),
            shared: Vec::new(),
            uploads: Vec::new(),
            upload_root: PathBuf::from("."),
            keep_releases: 5,
            hooks: HookSettings::default(),
            owner: Owner::default(),
        }
    }
}
