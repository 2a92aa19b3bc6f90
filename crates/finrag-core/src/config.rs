use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::context::FileStore;
use crate::controller::DEFAULT_SUGGESTIONS;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub state_path: Option<PathBuf>,
    pub suggestions: Option<Vec<String>>,
    pub log_level: Option<String>,
}

impl Config {
    /// The config written by `finrag config --init`
    pub fn new() -> Self {
        Self {
            api_url: Some(DEFAULT_API_URL.to_string()),
            state_path: None,
            suggestions: None,
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Base URL to talk to. `flag` is the command-line or environment value,
    /// which beats the file.
    pub fn api_url(&self, flag: Option<&str>) -> String {
        flag.filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn state_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_path {
            Some(path) => Ok(path.clone()),
            None => FileStore::default_path().map_err(|_| ConfigError::NoConfigDir),
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match &self.suggestions {
            Some(list) if !list.is_empty() => list.clone(),
            _ => DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("finrag"))
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn log_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("finrag.log"))
    }
}
