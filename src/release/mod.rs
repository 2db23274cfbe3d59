// ABOUTME: Release lifecycle: build a release directory, activate it, retire old ones.
// ABOUTME: Exports the coordinator, its collaborators, and the type-state release.

mod context;
mod coordinator;
mod error;
mod events;
mod layout;
mod links;
mod lock;
mod permissions;
mod retention;
mod rollback;
mod setup;
mod staged;
mod state;
mod transitions;

pub use context::{DeployContext, Owner};
pub use coordinator::{
    DeployOutcome, DeployReport, HostReport, HostSummary, HostTarget, ReleaseCoordinator,
};
pub use error::{DeployError, DeployErrorKind, LockHolderInfo};
pub use events::{DeployEvent, DeployObserver, Phase, TracingObserver};
pub use layout::{LOCK_FILENAME, ReleaseLayout};
pub use links::LinkResolver;
pub use lock::{DeployLock, LockInfo};
pub use permissions::fix_permissions;
pub use retention::{PruneReport, RetentionFailure, RetentionPlan, RetentionPolicy, plan_retention};
pub use rollback::{RollbackOutcome, previous_release, rollback};
pub use setup::{SHARED_PLACEHOLDER, prepare_host};
pub use staged::Release;
pub use state::{Active, Cloned, Linked, Uploaded};
