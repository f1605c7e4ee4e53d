use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const APP_DIR_NAME: &str = "dbx";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/db";
pub const DEFAULT_EXPORT_PREFIX: &str = "dbx_export";
pub const MIN_COLUMN_WIDTH: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkbenchConfig {
    pub scroll_acceleration: usize,
    pub scroll_repeat_threshold: u32,
    pub scroll_repeat_timeout_ms: u64,
    pub page_scroll_step: usize,
    pub max_history_entries: usize,
    pub connection_check_sec: u64,
    pub max_column_width: usize,
    pub endpoint: String,
    pub export_prefix: String,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            scroll_acceleration: 3,
            scroll_repeat_threshold: 3,
            scroll_repeat_timeout_ms: 150,
            page_scroll_step: 10,
            max_history_entries: 200,
            connection_check_sec: 5,
            max_column_width: 40,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            export_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
        }
    }
}

impl WorkbenchConfig {
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max_column_width = self.max_column_width.max(MIN_COLUMN_WIDTH);
        self.max_history_entries = self.max_history_entries.max(1);
        self.connection_check_sec = self.connection_check_sec.max(1);
        self.page_scroll_step = self.page_scroll_step.max(1);
        self.scroll_acceleration = self.scroll_acceleration.max(1);
        if self.endpoint.trim().is_empty() {
            self.endpoint = DEFAULT_ENDPOINT.to_string();
        }
        if self.export_prefix.trim().is_empty() {
            self.export_prefix = DEFAULT_EXPORT_PREFIX.to_string();
        }
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to create config directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn in_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join(CONFIG_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn load_or_init(&self) -> WorkbenchConfig {
        if !self.path.exists() {
            let config = WorkbenchConfig::default();
            if let Err(error) = self.persist(&config) {
                warn!(%error, "could not write default config");
            }
            return config;
        }

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "config unreadable, using defaults");
                return WorkbenchConfig::default();
            }
        };

        match serde_json::from_str::<WorkbenchConfig>(&raw) {
            Ok(config) => {
                debug!(path = %self.path.display(), "loaded config");
                config.normalized()
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "config corrupt, using defaults");
                WorkbenchConfig::default()
            }
        }
    }

    pub fn persist(&self, config: &WorkbenchConfig) -> Result<(), ConfigError> {
        if let Some(parent_dir) = self.path.parent() {
            fs::create_dir_all(parent_dir).map_err(|source| ConfigError::CreateDir {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }

        let rendered = serde_json::to_string_pretty(config)
            .map_err(|source| ConfigError::Serialize { source })?;

        fs::write(&self.path, rendered).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(custom) = env::var_os("DBX_CONFIG_DIR") {
        return Ok(PathBuf::from(custom));
    }

    let base_dir = if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ConfigError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join(APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{ConfigStore, WorkbenchConfig, DEFAULT_ENDPOINT, MIN_COLUMN_WIDTH};

    #[test]
    fn missing_config_is_written_back_with_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = ConfigStore::in_dir(&temp_dir.path().join("dbx"));

        let config = store.load_or_init();
        assert_eq!(config, WorkbenchConfig::default());
        assert!(store.path().exists());

        let raw = fs::read_to_string(store.path()).expect("config should be readable");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("invalid json");
        assert_eq!(parsed["max_history_entries"], 200);
        assert_eq!(parsed["connection_check_sec"], 5);
    }

    #[test]
    fn corrupt_config_falls_back_to_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = ConfigStore::in_dir(temp_dir.path());
        fs::write(store.path(), "{ not json").expect("failed to seed config");

        assert_eq!(store.load_or_init(), WorkbenchConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_options() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = ConfigStore::in_dir(temp_dir.path());
        fs::write(store.path(), r#"{"max_column_width": 25, "page_scroll_step": 4}"#)
            .expect("failed to seed config");

        let config = store.load_or_init();
        assert_eq!(config.max_column_width, 25);
        assert_eq!(config.page_scroll_step, 4);
        assert_eq!(config.max_history_entries, 200);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn normalization_clamps_values_that_break_invariants() {
        let config = WorkbenchConfig {
            max_column_width: 2,
            max_history_entries: 0,
            connection_check_sec: 0,
            page_scroll_step: 0,
            scroll_acceleration: 0,
            endpoint: "  ".to_string(),
            ..WorkbenchConfig::default()
        }
        .normalized();

        assert_eq!(config.max_column_width, MIN_COLUMN_WIDTH);
        assert_eq!(config.max_history_entries, 1);
        assert_eq!(config.connection_check_sec, 1);
        assert_eq!(config.page_scroll_step, 1);
        assert_eq!(config.scroll_acceleration, 1);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }
}
