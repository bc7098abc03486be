use crate::model::{self, Settings, SettingsPatch, Shortcut, ShortcutInput, ShortcutPatch};
use crate::notify::Notifier;
use chrono::Utc;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct StorePaths {
    pub shortcuts: PathBuf,
    pub settings: PathBuf,
}

impl StorePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            shortcuts: dir.join("shortcuts.json"),
            settings: dir.join("settings.json"),
        }
    }
}

/// Sole owner of the in-memory shortcuts and settings. Every mutation is
/// written through to disk before it returns.
pub struct RecordStore {
    paths: StorePaths,
    shortcuts: Vec<Shortcut>,
    settings: Settings,
    notifier: Arc<dyn Notifier>,
}

impl RecordStore {
    pub fn new(paths: StorePaths, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            paths,
            shortcuts: Vec::new(),
            settings: Settings::default(),
            notifier,
        }
    }

    /// Constructs the store and loads both files.
    pub fn open(paths: StorePaths, notifier: Arc<dyn Notifier>) -> Self {
        let mut store = Self::new(paths, notifier);
        store.load_settings();
        store.load_shortcuts();
        store
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn shortcuts(&self) -> &[Shortcut] {
        &self.shortcuts
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load_shortcuts(&mut self) -> &[Shortcut] {
        info!("Loading shortcuts from: {:?}", self.paths.shortcuts);
        if let Err(e) = self.try_load_shortcuts() {
            error!("Critical error loading shortcuts: {}", e);
            self.shortcuts = Vec::new();
        }
        &self.shortcuts
    }

    fn try_load_shortcuts(&mut self) -> Result<(), StoreError> {
        let data = match fs::read(&self.paths.shortcuts) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Shortcuts file not found, creating with defaults");
                self.reset_to_defaults();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // Only a non-list counts as corrupt; elements are taken as they are.
        match serde_json::from_slice::<Vec<Value>>(&data) {
            Ok(records) => {
                info!("Successfully loaded {} shortcuts", records.len());
                self.shortcuts = records.into_iter().map(Shortcut::from_value).collect();
            }
            Err(e) => {
                error!("Failed to parse shortcuts file: {}", e);
                warn!("Creating new shortcuts file with defaults");
                self.backup_shortcuts();
                self.reset_to_defaults();
            }
        }
        Ok(())
    }

    fn reset_to_defaults(&mut self) {
        self.shortcuts = model::default_shortcuts(Utc::now());
        self.save_shortcuts();
    }

    // Best effort; the unreadable file is about to be overwritten.
    fn backup_shortcuts(&self) {
        let backup = backup_path(&self.paths.shortcuts);
        match fs::copy(&self.paths.shortcuts, &backup) {
            Ok(_) => info!("Created backup of corrupted shortcuts at {:?}", backup),
            Err(e) => error!("Failed to create backup: {}", e),
        }
    }

    pub fn save_shortcuts(&self) {
        match write_json(&self.paths.shortcuts, &self.shortcuts) {
            Ok(()) => info!("Saved {} shortcuts to {:?}", self.shortcuts.len(), self.paths.shortcuts),
            Err(e) => {
                error!("Failed to save shortcuts: {}", e);
                self.notifier.error(
                    "Error Saving Shortcuts",
                    &format!("Failed to save shortcuts: {}", e),
                );
            }
        }
    }

    pub fn load_settings(&mut self) -> &Settings {
        match fs::read(&self.paths.settings) {
            Ok(data) => match serde_json::from_slice::<Settings>(&data) {
                Ok(settings) => {
                    self.settings = settings;
                    info!("Settings loaded successfully");
                }
                Err(e) => error!("Error loading settings: {}", e),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.save_settings();
                info!("Default settings created");
            }
            Err(e) => error!("Error loading settings: {}", e),
        }
        &self.settings
    }

    pub fn save_settings(&self) {
        match write_json(&self.paths.settings, &self.settings) {
            Ok(()) => debug!("Saved settings to {:?}", self.paths.settings),
            Err(e) => {
                error!("Error saving settings: {}", e);
                self.notifier.error(
                    "Error Saving Settings",
                    &format!("Failed to save settings: {}", e),
                );
            }
        }
    }

    pub fn add(&mut self, input: ShortcutInput) -> &[Shortcut] {
        self.shortcuts.push(Shortcut::create(input, Utc::now()));
        self.save_shortcuts();
        &self.shortcuts
    }

    /// Out-of-range indices leave the list untouched.
    pub fn delete(&mut self, index: usize) -> &[Shortcut] {
        if index < self.shortcuts.len() {
            let removed = self.shortcuts.remove(index);
            debug!("Deleted shortcut {} at {}", removed.name, index);
            self.save_shortcuts();
        }
        &self.shortcuts
    }

    pub fn update(&mut self, index: usize, patch: ShortcutPatch) -> &[Shortcut] {
        if let Some(shortcut) = self.shortcuts.get_mut(index) {
            shortcut.merge(patch, Utc::now());
            self.save_shortcuts();
        }
        &self.shortcuts
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> &Settings {
        self.settings.merge(patch);
        self.save_settings();
        &self.settings
    }
}

/// `<file>.bak` next to the original.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(OsString::from(".bak"));
    PathBuf::from(name)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}
