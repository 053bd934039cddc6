//! Configuration Module
//!
//! Handles application configuration loading, validation, and management.

pub mod credential;

pub use credential::{API_KEY_ENV, ApiKey};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::speech::AudioFormat;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Synthesis output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// cantonese.ai API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL (default: https://paid-api.cantonese.ai)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (the environment variable takes priority)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Text-to-speech request timeout in seconds
    #[serde(default = "default_synthesis_timeout")]
    pub synthesis_timeout_secs: u64,

    /// Speech-to-text request timeout in seconds
    #[serde(default = "default_transcription_timeout")]
    pub transcription_timeout_secs: u64,
}

pub const DEFAULT_BASE_URL: &str = "https://paid-api.cantonese.ai";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_synthesis_timeout() -> u64 {
    60
}

fn default_transcription_timeout() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            synthesis_timeout_secs: default_synthesis_timeout(),
            transcription_timeout_secs: default_transcription_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_secs)
    }

    /// Resolve the credential once (env wins over the config file).
    pub fn resolve_api_key(&self) -> Option<ApiKey> {
        ApiKey::resolve(self.api_key.as_deref())
    }
}

/// Where synthesized audio lands when the caller gives no path
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Output directory (default: system temp directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Format used when a synthesis call does not name one
    #[serde(default)]
    pub default_format: AudioFormat,
}

impl OutputConfig {
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log to file
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/cantonese-mcp/config.toml
    /// 3. Local config: ./cantonese-mcp.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::merge_from_file(&system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::merge_from_file(&local_config_path)?;
        }

        config = Self::apply_env_overrides(config);

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let config = Self::merge_from_file(path)?;

        Ok(Self::apply_env_overrides(config))
    }

    /// Get the system config path: ~/.config/cantonese-mcp/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cantonese-mcp").join("config.toml"))
    }

    /// Get the local config path: ./cantonese-mcp.toml
    fn local_config_path() -> PathBuf {
        PathBuf::from("./cantonese-mcp.toml")
    }

    /// A file that exists replaces the lower layer wholesale; missing
    /// sections fall back to their defaults through serde.
    fn merge_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn apply_env_overrides(config: Self) -> Self {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the process environment in production)
    fn apply_overrides_from(mut config: Self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base_url) = lookup("CANTONESE_AI_BASE_URL") {
            config.api.base_url = base_url;
        }

        // A template placeholder in the environment counts as unset
        if let Some(api_key) = lookup(API_KEY_ENV) {
            if ApiKey::parse(&api_key).is_some() {
                config.api.api_key = Some(api_key);
            } else {
                tracing::debug!("Ignoring placeholder {} from the environment", API_KEY_ENV);
            }
        }

        if let Some(dir) = lookup("CANTONESE_MCP_OUTPUT_DIR") {
            config.output.directory = Some(PathBuf::from(dir));
        }

        if let Some(log_level) = lookup("CANTONESE_MCP_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Some(log_file) = lookup("CANTONESE_MCP_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(log_file));
        }

        config
    }

    /// Check if a usable API key is configured (env or config file).
    pub fn has_api_key(&self) -> bool {
        self.api.resolve_api_key().is_some()
    }

    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        let base_url = self.api.base_url.as_str();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!("api.base_url must be an http(s) URL, got: {}", base_url);
        }

        if self.api.synthesis_timeout_secs == 0 || self.api.transcription_timeout_secs == 0 {
            anyhow::bail!("API timeouts must be greater than zero");
        }

        if let Some(dir) = &self.output.directory
            && dir.exists()
            && !dir.is_dir()
        {
            anyhow::bail!("output.directory is not a directory: {:?}", dir);
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}
