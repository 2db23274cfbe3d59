// ABOUTME: Remote directory layout: releases root, shared root, and the current link.
// ABOUTME: All paths are absolute strings as the remote shell sees them.

use crate::remote::shell;
use crate::types::ReleaseId;

/// Name of the lock file kept inside the releases root.
pub const LOCK_FILENAME: &str = ".deploy.lock";

/// Where releases, shared files, and the active-release link live on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLayout {
    project_root: String,
    releases: String,
    shared: String,
    current: String,
}

impl ReleaseLayout {
    pub fn new(
        project_root: impl Into<String>,
        releases: impl Into<String>,
        shared: impl Into<String>,
        current: impl Into<String>,
    ) -> Self {
        Self {
            project_root: trim_slash(project_root.into()),
            releases: trim_slash(releases.into()),
            shared: trim_slash(shared.into()),
            current: trim_slash(current.into()),
        }
    }

    /// Conventional layout: `releases/`, `shared/` and `current` under `root`.
    pub fn under(root: &str) -> Self {
        Self::new(
            root,
            shell::join(root, "releases"),
            shell::join(root, "shared"),
            shell::join(root, "current"),
        )
    }

    pub fn project_root(&self) -> &str {
        &self.project_root
    }

    pub fn releases_root(&self) -> &str {
        &self.releases
    }

    pub fn shared_root(&self) -> &str {
        &self.shared
    }

    /// Path of the symbolic link naming the active release.
    pub fn current_path(&self) -> &str {
        &self.current
    }

    pub fn release_dir(&self, id: &ReleaseId) -> String {
        self.release_dir_named(id.as_str())
    }

    pub fn release_dir_named(&self, name: &str) -> String {
        shell::join(&self.releases, name)
    }

    pub fn shared_path(&self, relative: &str) -> String {
        shell::join(&self.shared, relative)
    }

    pub fn lock_path(&self) -> String {
        shell::join(&self.releases, LOCK_FILENAME)
    }
}

fn trim_slash(path: String) -> String {
    match path.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BranchName;
    use chrono::{TimeZone, Utc};

    #[test]
    fn conventional_layout() {
        let layout = ReleaseLayout::under("/srv/shop");
        assert_eq!(layout.project_root(), "/srv/shop");
        assert_eq!(layout.releases_root(), "/srv/shop/releases");
        assert_eq!(layout.shared_root(), "/srv/shop/shared");
        assert_eq!(layout.current_path(), "/srv/shop/current");
        assert_eq!(layout.lock_path(), "/srv/shop/releases/.deploy.lock");
    }

    #[test]
    fn trailing_slashes_are_dropped() {
        let layout = ReleaseLayout::new("/srv/shop/", "/data/releases/", "/data/shared", "/srv/live/");
        assert_eq!(layout.project_root(), "/srv/shop");
        assert_eq!(layout.releases_root(), "/data/releases");
        assert_eq!(layout.current_path(), "/srv/live");
    }

    #[test]
    fn release_and_shared_paths() {
        let layout = ReleaseLayout::under("/srv/shop");
        let branch = BranchName::new("main").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        let id = ReleaseId::new(at, &branch);

        assert_eq!(
            layout.release_dir(&id),
            "/srv/shop/releases/2024-01-03_10-00-00_main"
        );
        assert_eq!(layout.shared_path("uploads"), "/srv/shop/shared/uploads");
    }
}
