//! Persistent CLI configuration and settings resolution.
//!
//! Each setting is taken from the first source that has it: command-line
//! flag, environment (including `.env`), config file, built-in default.

use std::path::{Path, PathBuf};

use milkbook_core::config::{ENDPOINT_ENV, REQUEST_TIMEOUT_ENV};
use milkbook_core::util::normalize_text_option;
use milkbook_core::SyncConfig;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";
pub const DB_PATH_ENV: &str = "MILKBOOK_DB_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("milkbook").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("milkbook")
        .join("milkbook.db")
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    fn normalize(&mut self) {
        self.version = default_config_version();
        self.endpoint = normalize_text_option(self.endpoint.take())
            .map(|endpoint| endpoint.trim_end_matches('/').to_string());
        self.request_timeout_secs = self.request_timeout_secs.filter(|secs| *secs > 0);
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub offline: bool,
}

/// Everything a command needs to open the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub sync: SyncConfig,
    pub offline: bool,
}

impl Settings {
    pub fn resolve(overrides: Overrides, file: &CliConfig) -> Result<Self, CliError> {
        Self::resolve_with(overrides, file, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(overrides: Overrides, file: &CliConfig, env: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut sync = SyncConfig::from_lookup(|key| {
            normalize_text_option(env(key)).or_else(|| match key {
                ENDPOINT_ENV => file.endpoint.clone(),
                REQUEST_TIMEOUT_ENV => file.request_timeout_secs.map(|secs| secs.to_string()),
                _ => None,
            })
        })?;

        if let Some(endpoint) = normalize_text_option(overrides.endpoint) {
            sync.endpoint = Some(SyncConfig::validate_endpoint("--endpoint", &endpoint)?);
        }

        let db_path = overrides
            .db_path
            .or_else(|| normalize_text_option(env(DB_PATH_ENV)).map(PathBuf::from))
            .or_else(|| file.db_path.clone())
            .unwrap_or_else(default_db_path);

        Ok(Self {
            db_path,
            sync,
            offline: overrides.offline,
        })
    }

    /// Whether commands should try the network at all
    pub const fn wants_network(&self) -> bool {
        !self.offline && self.sync.endpoint.is_some()
    }
}
