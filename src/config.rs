//! Server configuration.
//!
//! Resolved in three layers, later ones winning: `config.json` in the user's
//! config directory, `LEARNPATH_*` environment variables, then CLI flags
//! (applied by the binary).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "learnpath";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for the HTTP API.
    pub port: u16,
    /// SQLite database file. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Shared secret the identity gateway must send as a bearer token.
    /// `None` disables the check (local development).
    pub api_key: Option<String>,
    /// Allowed CORS origins. `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: None,
            api_key: None,
            cors_origins: None,
        }
    }
}

impl ServerConfig {
    /// Load from the user's config directory and the process environment.
    /// Falls back to defaults if the file is missing or unreadable.
    pub fn load() -> Self {
        let base = match get_config_path().and_then(|p| Self::from_file(&p)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply `LEARNPATH_PORT`, `LEARNPATH_DATABASE`, `LEARNPATH_API_KEY` and
    /// `LEARNPATH_CORS_ORIGINS` (comma-separated) from `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(port) = lookup("LEARNPATH_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid LEARNPATH_PORT: {}", port),
            }
        }
        if let Some(path) = lookup("LEARNPATH_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(key) = lookup("LEARNPATH_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(origins) = lookup("LEARNPATH_CORS_ORIGINS") {
            self.cors_origins = Some(origins.split(',').map(|s| s.trim().to_string()).collect());
        }
        self
    }
}

fn get_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}
