//! Persistent CLI configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tend_core::config::ServiceConfig;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub remote_path: Option<PathBuf>,
    #[serde(default)]
    pub sync_on_mutation: Option<bool>,
    #[serde(default)]
    pub prune_remote_deletions: Option<bool>,
    #[serde(default)]
    pub remote_latency_ms: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    if let Some(path) = std::env::var_os("TEND_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("tend").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    tend_core::util::normalize_text_option(value)
}

fn normalize_path_option(value: Option<PathBuf>) -> Option<PathBuf> {
    normalize_text_option(value.map(|path| path.to_string_lossy().into_owned())).map(PathBuf::from)
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

    /// Service options for this run; `offline` comes from the command line.
    pub fn service_config(&self, offline: bool) -> ServiceConfig {
        let defaults = ServiceConfig::default();
        ServiceConfig {
            sync_on_mutation: self.sync_on_mutation.unwrap_or(defaults.sync_on_mutation),
            prune_remote_deletions: self
                .prune_remote_deletions
                .unwrap_or(defaults.prune_remote_deletions),
            start_online: !offline,
        }
    }

    pub fn remote_latency(&self) -> Option<Duration> {
        self.remote_latency_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    fn normalize(&mut self) {
        self.remote_path = normalize_path_option(self.remote_path.take());
        if self.remote_latency_ms == Some(0) {
            self.remote_latency_ms = None;
        }
    }
}
