use crate::model::{Shortcut, ShortcutKind};
use crate::notify::Notifier;
use crate::window::WindowControl;
use log::{debug, error, info, warn};
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search?q=";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{source}")]
    Spawn { target: String, source: io::Error },
    #[error("{source}")]
    Open { target: String, source: io::Error },
    #[error("Command failed: {command}{}", exit_detail(.code, .stderr))]
    Exit { command: String, code: Option<i32>, stderr: String },
}

impl LaunchError {
    /// The URL, path or command line that failed.
    pub fn target(&self) -> &str {
        match self {
            LaunchError::Spawn { target, .. } | LaunchError::Open { target, .. } => target,
            LaunchError::Exit { command, .. } => command,
        }
    }
}

fn exit_detail(code: &Option<i32>, stderr: &str) -> String {
    let mut detail = match code {
        Some(code) => format!(" (exit code {})", code),
        None => " (terminated by signal)".to_string(),
    };
    if !stderr.is_empty() {
        detail.push('\n');
        detail.push_str(stderr);
    }
    detail
}

/// Invoked once a detached command finishes. Runs on the task's own thread.
pub type CompletionHandler = Box<dyn FnOnce(Result<(), LaunchError>) + Send + 'static>;

/// OS launch primitives.
pub trait Launcher: Send + Sync {
    fn open_url(&self, url: &str) -> Result<(), LaunchError>;
    fn launch_app(&self, path: &str) -> Result<(), LaunchError>;
    /// Returns immediately; `on_exit` receives the outcome later.
    fn run_command(&self, command: &str, on_exit: CompletionHandler);
    fn open_folder(&self, path: &str) -> Result<(), LaunchError>;
}

const DRAIN_POLL: Duration = Duration::from_millis(20);

pub struct SystemLauncher {
    shell: Option<String>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl SystemLauncher {
    pub fn new(shell: Option<String>) -> Self {
        Self {
            shell,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Blocks until every detached command has finished and reported.
    pub fn drain(&self) {
        self.drain_for(None);
    }

    /// Waits up to `limit` for detached commands, joining those that finish.
    /// Commands still running at the deadline are left detached and their
    /// completion handlers never run in this process. Returns how many were
    /// left behind.
    pub fn drain_for(&self, limit: Option<Duration>) -> usize {
        let mut handles: Vec<_> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return 0,
        };
        let deadline = limit.map(|limit| Instant::now() + limit);

        loop {
            let (finished, running): (Vec<_>, Vec<_>) =
                handles.into_iter().partition(|h| h.is_finished() || deadline.is_none());
            for handle in finished {
                let _ = handle.join();
            }
            handles = running;

            if handles.is_empty() {
                return 0;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                info!("Leaving {} command(s) running in the background", handles.len());
                return handles.len();
            }
            thread::sleep(DRAIN_POLL);
        }
    }

    fn shell_command(&self, line: &str) -> Command {
        match self.shell.as_deref().map(|s| s.split_whitespace().collect::<Vec<_>>()) {
            Some(parts) if !parts.is_empty() => {
                let mut command = Command::new(parts[0]);
                command.args(&parts[1..]).arg(line);
                command
            }
            _ => default_shell_command(line),
        }
    }
}

impl Launcher for SystemLauncher {
    fn open_url(&self, url: &str) -> Result<(), LaunchError> {
        open::that_detached(url).map_err(|source| LaunchError::Open {
            target: url.to_string(),
            source,
        })
    }

    fn launch_app(&self, path: &str) -> Result<(), LaunchError> {
        let mut command = app_command(path);
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        spawn_reaped(&mut command)
            .map(|_| ())
            .map_err(|source| LaunchError::Spawn {
                target: path.to_string(),
                source,
            })
    }

    fn run_command(&self, line: &str, on_exit: CompletionHandler) {
        let mut command = self.shell_command(line);
        command.stdin(Stdio::null());
        let line = line.to_string();

        let handle = thread::spawn(move || {
            let result = match command.output() {
                Ok(output) if output.status.success() => Ok(()),
                Ok(output) => Err(LaunchError::Exit {
                    command: line,
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                }),
                Err(source) => Err(LaunchError::Spawn { target: line, source }),
            };
            on_exit(result);
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    fn open_folder(&self, path: &str) -> Result<(), LaunchError> {
        open::that_detached(path).map_err(|source| LaunchError::Open {
            target: path.to_string(),
            source,
        })
    }
}

/// Spawns `command` and waits for it on a detached thread so the exited
/// child is collected instead of lingering as a zombie.
fn spawn_reaped(command: &mut Command) -> io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = command.spawn()?;
    debug!("Spawned process {}", child.id());
    Ok(thread::spawn(move || match child.wait() {
        Ok(status) => {
            debug!("Process {} exited with {}", child.id(), status);
            Some(status)
        }
        Err(e) => {
            warn!("Failed to wait for process {}: {}", child.id(), e);
            None
        }
    }))
}

#[cfg(target_os = "windows")]
pub fn app_command(path: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", path]);
    command
}

#[cfg(target_os = "macos")]
pub fn app_command(path: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(path);
    command
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub fn app_command(path: &str) -> Command {
    Command::new(path)
}

#[cfg(target_os = "windows")]
fn default_shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", line]);
    command
}

#[cfg(not(target_os = "windows"))]
fn default_shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.args(["-c", line]);
    command
}

/// Percent-encodes `query` into `template`, replacing `{query}` when present
/// and appending otherwise.
pub fn search_url(template: &str, query: &str) -> String {
    let encoded = urlencoding::encode(query);
    if template.contains("{query}") {
        template.replace("{query}", &encoded)
    } else {
        format!("{}{}", template, encoded)
    }
}

/// Turns a shortcut's type into the matching OS action. Holds no per-call
/// state; overlapping invocations are independent.
pub struct Dispatcher {
    launcher: Arc<dyn Launcher>,
    notifier: Arc<dyn Notifier>,
    window: Arc<dyn WindowControl>,
    search_template: String,
}

impl Dispatcher {
    pub fn new(
        launcher: Arc<dyn Launcher>,
        notifier: Arc<dyn Notifier>,
        window: Arc<dyn WindowControl>,
        search_template: String,
    ) -> Self {
        Self {
            launcher,
            notifier,
            window,
            search_template,
        }
    }

    /// Failures are reported through the notifier; the window is hidden
    /// whatever the outcome.
    pub fn execute(&self, shortcut: &Shortcut) {
        info!("Executing shortcut: {} ({})", shortcut.name, shortcut.kind);

        match &shortcut.kind {
            ShortcutKind::Url => self.open_url(&shortcut.path),
            ShortcutKind::App => {
                if let Err(e) = self.launcher.launch_app(&shortcut.path) {
                    self.report_launch_failure(&e);
                }
            }
            ShortcutKind::Command => self.run_command(&shortcut.path),
            ShortcutKind::Folder => {
                if let Err(e) = self.launcher.open_folder(&shortcut.path) {
                    self.report_launch_failure(&e);
                }
            }
            ShortcutKind::Unknown(tag) => warn!("Unknown shortcut type: {:?}", tag),
        }

        self.window.hide();
    }

    pub fn search_fallback(&self, query: &str) {
        info!("Executing web search for: {}", query);
        let url = search_url(&self.search_template, query);
        debug!("Opening URL: {}", url);
        self.open_url(&url);
        self.window.hide();
    }

    fn open_url(&self, url: &str) {
        if let Err(e) = self.launcher.open_url(url) {
            self.report_launch_failure(&e);
        }
    }

    fn run_command(&self, line: &str) {
        let notifier = Arc::clone(&self.notifier);
        self.launcher.run_command(
            line,
            Box::new(move |result| {
                if let Err(e) = result {
                    error!("Command execution error: {}", e);
                    notifier.error("Command Failed", &e.to_string());
                }
            }),
        );
    }

    fn report_launch_failure(&self, e: &LaunchError) {
        error!("Failed to launch {}: {}", e.target(), e);
        self.notifier
            .error("Error", &format!("Failed to launch {}: {}", e.target(), e));
    }
}
