//! Configuration management for Analyst
//!
//! Handles loading and saving the TOML configuration: where the agent
//! backend lives, where the form hand-off blob is stored and where reports
//! are written.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Defaults shared by the config types and the CLI
pub mod defaults {
    pub const BASE_URL: &str = "http://localhost:8000";
    pub const BASE_URL_ENV: &str = "ANALYST_API_URL";
    pub const ENDPOINT_PATH: &str = "/agent/";
    pub const CONNECT_TIMEOUT_MS: u64 = 5000;
    pub const LOG_LEVEL: &str = "warn";
    pub const APP_DIR: &str = "analyst";
    pub const HANDOFF_FILE: &str = "form_data.json";
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent backend settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Form hand-off settings
    #[serde(default)]
    pub handoff: HandoffConfig,
    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,
    /// General application settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Agent backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP(S) base URL of the backend
    pub base_url: String,
    /// Environment variable that overrides `base_url`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url_env: Option<String>,
    /// Path of the session endpoint under the base URL
    pub endpoint_path: String,
    /// How long to wait for the connection to open
    pub connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            base_url_env: Some(defaults::BASE_URL_ENV.to_string()),
            endpoint_path: defaults::ENDPOINT_PATH.to_string(),
            connect_timeout_ms: defaults::CONNECT_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Base URL, preferring the environment variable when it is set
    pub fn resolve_base_url(&self) -> String {
        self.resolve_base_url_with(|name| std::env::var(name).ok())
    }

    /// Base URL with a custom environment lookup
    pub fn resolve_base_url_with<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env_name) = &self.base_url_env {
            if let Some(value) = lookup(env_name) {
                if !value.trim().is_empty() {
                    return value.trim().to_string();
                }
            }
        }
        self.base_url.clone()
    }

    /// WebSocket URL of the session endpoint
    pub fn endpoint_url(&self) -> Result<Url> {
        endpoint_url(&self.resolve_base_url(), &self.endpoint_path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Upgrade an HTTP(S) base URL to its WebSocket equivalent and append `path`
pub fn endpoint_url(base_url: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::Config(format!(
                "Unsupported URL scheme '{}' in '{}'",
                other, base_url
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| Error::Config(format!("Cannot use scheme '{}' for '{}'", scheme, base_url)))?;

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    Ok(url)
}

/// Form hand-off configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Location of the hand-off blob (defaults to the data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl HandoffConfig {
    pub fn resolve_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(defaults::APP_DIR)
                .join(defaults::HANDOFF_FILE)
        })
    }
}

/// Report output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory for downloaded reports (defaults to the working directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl ReportConfig {
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log filter used without `--verbose`
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::LOG_LEVEL.to_string(),
        }
    }
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join(defaults::APP_DIR).join("config.toml"))
    }

    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}
