//! Application configuration
//!
//! Layers, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. TOML file (`~/.config/klept/config.toml`, or `KLEPT_CONFIG`)
//! 3. `KLEPT_*` environment variables
//!
//! This is deployment configuration (where data lives, which endpoints to
//! talk to). The user's sync credentials and theme are [`crate::Settings`],
//! persisted by the local store alongside the bookmarks.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "KLEPT";

/// Default GitHub REST API base
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default name of the bookmark file inside the gist
pub const DEFAULT_GIST_FILE: &str = "bookmarks.json";

/// Default CORS relay used to fetch page titles
pub const DEFAULT_TITLE_PROXY_URL: &str = "https://api.allorigins.win/get";

/// Application configuration
///
/// Keys missing from the file take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding bookmarks.json and settings.json
    pub data_dir: PathBuf,
    /// GitHub API base URL
    pub api_url: String,
    /// File inside the gist that holds the bookmark collection
    pub gist_file: String,
    /// Relay used for title lookups
    pub title_proxy_url: String,
    /// How long a successful sync is shown before returning to idle
    pub status_display_ms: u64,
    pub http_timeout_secs: u64,
    /// Log file path (used when KLEPT_LOG is set)
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("klept"),
            api_url: DEFAULT_API_URL.to_string(),
            gist_file: DEFAULT_GIST_FILE.to_string(),
            title_proxy_url: DEFAULT_TITLE_PROXY_URL.to_string(),
            status_display_ms: 3000,
            http_timeout_secs: 30,
            log_file: None,
        }
    }
}

impl Config {
    /// Load from the default config file plus environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit `--config` path if given, else the default file
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load from a file (defaults if it is absent) and create the data dir
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file: {:?}", path))
            }
        };

        config.apply_env_overrides();
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", config.data_dir))?;
        Ok(config)
    }

    /// Parse TOML and apply environment overrides, without touching disk
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults rooted at a specific data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Non-empty `KLEPT_*` variables replace the matching key
    fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_value("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        let string_keys = [
            ("API_URL", &mut self.api_url),
            ("GIST_FILE", &mut self.gist_file),
            ("TITLE_PROXY_URL", &mut self.title_proxy_url),
        ];
        for (name, slot) in string_keys {
            if let Some(value) = env_value(name) {
                *slot = value;
            }
        }
    }

    /// Write to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Write to a specific file, creating its directory
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))
    }

    /// `KLEPT_CONFIG`, or `klept/config.toml` in the platform config dir
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_value("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("klept")
            .join("config.toml")
    }

    pub fn bookmarks_path(&self) -> PathBuf {
        self.data_dir.join("bookmarks.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn default_log_path(&self) -> PathBuf {
        self.data_dir.join("debug.log")
    }

    pub fn status_display_interval(&self) -> Duration {
        Duration::from_millis(self.status_display_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, name))
        .ok()
        .filter(|v| !v.is_empty())
}
