use crate::executor::DEFAULT_SEARCH_URL;
use anyhow::Result;
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
    /// Where shortcuts.json and settings.json live.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// Prefix for command shortcuts, e.g. "bash -lc".
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default = "default_true")]
    pub dialogs: bool,
}

fn default_search_url() -> String { DEFAULT_SEARCH_URL.to_string() }
fn default_true() -> bool { true }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            search_url: default_search_url(),
            shell: None,
            dialogs: true,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "launchpad", "launchpad")
}

impl Config {
    /// Per-user application data directory unless overridden.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.general.data_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

pub fn load_config() -> Result<Config> {
    let config_path = if let Some(dirs) = project_dirs() {
        dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("config.toml")
    };

    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(config_path)?;
    parse_config(&content)
}
