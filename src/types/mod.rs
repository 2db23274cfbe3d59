// ABOUTME: Validated domain types for release deployments.
// ABOUTME: Application names, branch names, release identifiers and link mappings.

mod app_name;
mod branch;
mod link_mapping;
mod release_id;

pub use app_name::{AppName, AppNameError};
pub use branch::{BranchName, BranchNameError};
pub use link_mapping::{LinkMapping, LinkMappingError};
pub use release_id::{ReleaseId, ReleaseIdError, ReleaseIdGenerator, TIMESTAMP_FORMAT};
