// ABOUTME: Test support utilities.
// ABOUTME: Provides a temp project tree and scripted doubles for every deploy collaborator.

#![allow(dead_code)]

use async_trait::async_trait;
use caravel::confirm::Confirm;
use caravel::release::{DeployContext, DeployEvent, DeployObserver, ReleaseLayout};
use caravel::remote::{CommandOutput, ExecError, LocalExecutor, Privilege, RemoteExecutor};
use caravel::types::{AppName, BranchName, ReleaseId};
use caravel::upload::{UploadError, UploadTransfer};
use caravel::vcs::{VcsError, VersionControl};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("caravel=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const A: &str = "2024-01-01_10-00-00_main";
pub const B: &str = "2024-01-02_10-00-00_main";
pub const C: &str = "2024-01-03_10-00-00_main";

/// A project root in a temp directory with `releases/` and `shared/`.
pub struct Fixture {
    pub dir: TempDir,
    pub layout: ReleaseLayout,
    pub context: DeployContext,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("app");
        fs::create_dir_all(root.join("releases")).unwrap();
        fs::create_dir_all(root.join("shared")).unwrap();
        fs::create_dir_all(dir.path().join("local")).unwrap();

        let root = root.to_str().unwrap().to_string();
        let layout = ReleaseLayout::under(&root);
        let mut context = DeployContext::new(
            AppName::new("shop").unwrap(),
            "git@example.com:shop.git",
            &root,
        );
        context.upload_root = dir.path().join("local");

        Self {
            dir,
            layout,
            context,
        }
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(self.layout.project_root())
    }

    pub fn releases_root(&self) -> PathBuf {
        PathBuf::from(self.layout.releases_root())
    }

    pub fn shared_root(&self) -> PathBuf {
        PathBuf::from(self.layout.shared_root())
    }

    pub fn local_root(&self) -> PathBuf {
        self.context.upload_root.clone()
    }

    pub fn current(&self) -> PathBuf {
        PathBuf::from(self.layout.current_path())
    }

    /// Create an empty release directory.
    pub fn add_release(&self, name: &str) -> PathBuf {
        let path = self.releases_root().join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Point `current` at release `name`.
    pub fn point_current(&self, name: &str) {
        let _ = fs::remove_file(self.current());
        std::os::unix::fs::symlink(self.releases_root().join(name), self.current()).unwrap();
    }

    /// Target of `current`, if it is a link.
    pub fn current_target(&self) -> Option<PathBuf> {
        fs::read_link(self.current()).ok()
    }

    /// Names under the releases root, sorted, dot-files excluded.
    pub fn release_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.releases_root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }
}

/// Runs commands through a real local shell, except for the ones a test
/// machine cannot run: `git clone` becomes `mkdir -p` of the destination,
/// `service` calls succeed without doing anything, `chown` is skipped.
/// Any command containing a `fail_on` pattern exits 1 instead.
pub struct ScriptedExecutor {
    inner: LocalExecutor,
    fail_on: Vec<String>,
    commands: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(host: &str) -> Self {
        Self {
            inner: LocalExecutor::new().host_name(host),
            fail_on: Vec::new(),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_on.push(pattern.to_string());
        self
    }

    /// Every command received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

fn ok() -> CommandOutput {
    CommandOutput {
        exit_code: 0,
        stdout: String::new(),
        stderr: String::new(),
    }
}

/// Last single-quoted argument of a command line built with `shell::quote`.
fn last_quoted(command: &str) -> &str {
    command
        .split('\'')
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, s)| s)
        .last()
        .unwrap_or("")
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    fn host(&self) -> &str {
        self.inner.host()
    }

    async fn execute(&self, command: &str, privilege: Privilege) -> Result<CommandOutput, ExecError> {
        self.commands.lock().push(command.to_string());

        if self.fail_on.iter().any(|p| command.contains(p.as_str())) {
            return Ok(CommandOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: "scripted failure".to_string(),
            });
        }

        if command.starts_with("git clone") {
            let dir = last_quoted(command);
            return self
                .inner
                .execute(&format!("mkdir -p '{}'", dir), privilege)
                .await;
        }

        if command.starts_with("service ") || command.starts_with("chown ") {
            return Ok(ok());
        }

        self.inner.execute(command, privilege).await
    }
}

/// Version control double that records calls and optionally fails.
#[derive(Default)]
pub struct StubVcs {
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl StubVcs {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Release identifiers tagged so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl VersionControl for StubVcs {
    async fn create_release(
        &self,
        _branch: &BranchName,
        release: &ReleaseId,
        _message: &str,
    ) -> Result<(), VcsError> {
        self.calls.lock().push(release.to_string());
        if self.fail {
            return Err(VcsError::CommandFailed {
                step: "push",
                code: Some(1),
                stderr: "remote rejected".to_string(),
            });
        }
        Ok(())
    }
}

/// Upload double that copies files with std::fs and records each call.
#[derive(Default)]
pub struct RecordingUpload {
    uploads: Mutex<Vec<(PathBuf, String)>>,
}

impl RecordingUpload {
    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().clone()
    }
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        fs::create_dir_all(destination)?;
        for entry in fs::read_dir(source)? {
            let entry = entry?;
            copy_tree(&entry.path(), &destination.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(source, destination).map(|_| ())
    }
}

#[async_trait]
impl UploadTransfer for RecordingUpload {
    async fn upload(&self, source: &Path, destination: &str) -> Result<(), UploadError> {
        self.uploads
            .lock()
            .push((source.to_path_buf(), destination.to_string()));
        copy_tree(source, Path::new(destination))?;
        Ok(())
    }
}

/// Confirmation double with a fixed answer.
pub struct ScriptedConfirm {
    answer: bool,
    questions: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn yes() -> Self {
        Self {
            answer: true,
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn no() -> Self {
        Self {
            answer: false,
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> bool {
        self.questions.lock().push(question.to_string());
        self.answer
    }
}

/// Observer that keeps every event.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DeployEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<DeployEvent> {
        self.events.lock().clone()
    }
}

impl DeployObserver for RecordingObserver {
    fn on_event(&self, event: &DeployEvent) {
        self.events.lock().push(event.clone());
    }
}
