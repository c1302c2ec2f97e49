//! Application settings, read from `config.toml`.
//!
//! Lookup order: `$VKDECK_CONFIG`, then `<config_dir>/vkdeck/config.toml`, then built-in
//! defaults. `$VKDECK_BACKEND` replaces the backend command after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const CONFIG_ENV: &str = "VKDECK_CONFIG";
pub const BACKEND_ENV: &str = "VKDECK_BACKEND";

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Program followed by its arguments.
    pub command: Vec<String>,
    /// Per-call limit; `0` waits forever.
    pub timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            backend: BackendConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: vec!["vkdeck-backend".to_owned()],
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vkdeck").join("config.toml"))
    }

    pub fn resolve() -> Result<Self, AppError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(Self::default_path);
        let mut config = match path {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        if let Ok(command) = std::env::var(BACKEND_ENV) {
            config.override_backend(&command);
        }
        Ok(config)
    }

    /// A missing file yields defaults; an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| AppError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| AppError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn override_backend(&mut self, command: &str) {
        let parts: Vec<String> = command.split_whitespace().map(str::to_owned).collect();
        if !parts.is_empty() {
            self.backend.command = parts;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.backend.timeout_ms > 0).then(|| Duration::from_millis(self.backend.timeout_ms))
    }
}
