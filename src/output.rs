// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes, driven by deploy events.

use serde::Serialize;
use std::time::Instant;

use crate::release::{DeployEvent, DeployObserver, Phase, TracingObserver};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a line of command output that is the result itself, e.g. a listing.
    pub fn line(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit_json(&JsonEvent {
                event: "line",
                message: Some(message),
                ..JsonEvent::default()
            }),
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => self.emit_json(&JsonEvent {
                event: "success",
                message: Some(message),
                duration_secs: self.duration(),
                ..JsonEvent::default()
            }),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, host: Option<&str>, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => match host {
                Some(host) => eprintln!("Warning: [{host}] {message}"),
                None => eprintln!("Warning: {message}"),
            },
            OutputMode::Json => self.emit_json_err(&JsonEvent {
                event: "warning",
                host,
                message: Some(message),
                ..JsonEvent::default()
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.emit_json_err(&JsonEvent {
                event: "error",
                message: Some(message),
                duration_secs: self.duration(),
                ..JsonEvent::default()
            }),
        }
    }

    fn phase(&self, event: &'static str, host: Option<&str>, phase: Phase, error: Option<&str>) {
        match self.mode {
            OutputMode::Normal => {
                let prefix = host.map(|h| format!("[{h}] ")).unwrap_or_default();
                match (event, error) {
                    ("phase_started", _) => println!("{prefix}{}...", phase.description()),
                    (_, Some(error)) => eprintln!("{} failed: {error}", phase.description()),
                    _ => {}
                }
            }
            OutputMode::Quiet => {
                if let Some(error) = error {
                    eprintln!("Error: {error}");
                }
            }
            OutputMode::Json => self.emit_json(&JsonEvent {
                event,
                host,
                phase: Some(phase),
                message: error,
                duration_secs: self.duration(),
            }),
        }
    }

    fn emit_json(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{json}");
        }
    }

    fn emit_json_err(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            eprintln!("{json}");
        }
    }
}

impl DeployObserver for Output {
    fn on_event(&self, event: &DeployEvent) {
        TracingObserver.on_event(event);
        match event {
            DeployEvent::PhaseStarted { host, phase } => {
                self.phase("phase_started", host.as_deref(), *phase, None)
            }
            DeployEvent::PhaseFinished { host, phase } => {
                self.phase("phase_finished", host.as_deref(), *phase, None)
            }
            DeployEvent::PhaseFailed { host, phase, error } => {
                self.phase("phase_failed", host.as_deref(), *phase, Some(error.as_str()))
            }
            DeployEvent::Warning { host, message } => self.warning(host.as_deref(), message),
        }
    }
}

#[derive(Serialize, Default)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_event_skips_empty_fields() {
        let event = JsonEvent {
            event: "phase_started",
            host: Some("web1"),
            phase: Some(Phase::Activate),
            ..JsonEvent::default()
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"phase_started","host":"web1","phase":"activate"}"#
        );
    }

    #[test]
    fn elapsed_is_zero_without_timer() {
        let output = Output::new(OutputMode::Quiet);
        assert_eq!(output.elapsed_secs(), 0.0);
    }
}
