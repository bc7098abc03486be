//! Recording stand-ins for the OS and UI collaborators.

use crate::executor::{CompletionHandler, LaunchError, Launcher};
use crate::notify::Notifier;
use crate::window::WindowControl;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    OpenUrl(String),
    LaunchApp(String),
    RunCommand(String),
    OpenFolder(String),
}

#[derive(Clone, Default)]
pub struct RecordingLauncher {
    calls: Arc<Mutex<Vec<Call>>>,
    failing: bool,
}

impl RecordingLauncher {
    pub fn failing() -> Self {
        Self { failing: true, ..Default::default() }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call, target: &str) -> Result<(), LaunchError> {
        self.calls.lock().unwrap().push(call);
        if self.failing {
            Err(LaunchError::Spawn {
                target: target.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            })
        } else {
            Ok(())
        }
    }
}

impl Launcher for RecordingLauncher {
    fn open_url(&self, url: &str) -> Result<(), LaunchError> {
        self.record(Call::OpenUrl(url.to_string()), url)
    }

    fn launch_app(&self, path: &str) -> Result<(), LaunchError> {
        self.record(Call::LaunchApp(path.to_string()), path)
    }

    // Completes synchronously so tests can observe the handler's effect.
    fn run_command(&self, command: &str, on_exit: CompletionHandler) {
        self.calls.lock().unwrap().push(Call::RunCommand(command.to_string()));
        let result = if self.failing {
            Err(LaunchError::Exit {
                command: command.to_string(),
                code: Some(127),
                stderr: "sh: 1: nope: not found".to_string(),
            })
        } else {
            Ok(())
        };
        on_exit(result);
    }

    fn open_folder(&self, path: &str) -> Result<(), LaunchError> {
        self.record(Call::OpenFolder(path.to_string()), path)
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    errors: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, title: &str, message: &str) {
        self.errors.lock().unwrap().push((title.to_string(), message.to_string()));
    }
}

#[derive(Clone, Default)]
pub struct RecordingWindow {
    hides: Arc<AtomicUsize>,
}

impl RecordingWindow {
    pub fn hides(&self) -> usize {
        self.hides.load(Ordering::SeqCst)
    }
}

impl WindowControl for RecordingWindow {
    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }
}
