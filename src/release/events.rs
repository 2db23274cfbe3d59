// ABOUTME: Progress events emitted while a release is built and activated.
// ABOUTME: Observers receive them synchronously; the default observer logs via tracing.

use serde::Serialize;
use std::fmt;

/// Named step of a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Tag,
    Lock,
    Clone,
    LinkShared,
    Upload,
    Hooks,
    Activate,
    Permissions,
    Prune,
}

impl Phase {
    pub fn description(&self) -> &'static str {
        match self {
            Phase::Tag => "Tagging release",
            Phase::Lock => "Acquiring deploy lock",
            Phase::Clone => "Cloning release",
            Phase::LinkShared => "Linking shared paths",
            Phase::Upload => "Uploading files",
            Phase::Hooks => "Running post-deploy hooks",
            Phase::Activate => "Activating release",
            Phase::Permissions => "Fixing permissions",
            Phase::Prune => "Pruning old releases",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Something an observer may want to report. `host` is `None` for local steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    PhaseStarted {
        host: Option<String>,
        phase: Phase,
    },
    PhaseFinished {
        host: Option<String>,
        phase: Phase,
    },
    PhaseFailed {
        host: Option<String>,
        phase: Phase,
        error: String,
    },
    /// A tolerated failure, e.g. a hook or a single release deletion.
    Warning {
        host: Option<String>,
        message: String,
    },
}

impl DeployEvent {
    pub fn host(&self) -> Option<&str> {
        match self {
            DeployEvent::PhaseStarted { host, .. }
            | DeployEvent::PhaseFinished { host, .. }
            | DeployEvent::PhaseFailed { host, .. }
            | DeployEvent::Warning { host, .. } => host.as_deref(),
        }
    }
}

/// Receives deploy progress.
pub trait DeployObserver: Send + Sync {
    fn on_event(&self, event: &DeployEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DeployObserver for TracingObserver {
    fn on_event(&self, event: &DeployEvent) {
        let host = event.host().unwrap_or("local");
        match event {
            DeployEvent::PhaseStarted { phase, .. } => {
                tracing::info!(host, phase = ?phase, "{}", phase.description());
            }
            DeployEvent::PhaseFinished { phase, .. } => {
                tracing::debug!(host, phase = ?phase, "done");
            }
            DeployEvent::PhaseFailed { phase, error, .. } => {
                tracing::error!(host, phase = ?phase, "{}", error);
            }
            DeployEvent::Warning { message, .. } => {
                tracing::warn!(host, "{}", message);
            }
        }
    }
}
