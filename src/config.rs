//! Application configuration storage

use crate::complexity::DifficultyTier;
use crate::error::{GestureVaultError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable pointing at the vault's data directory
pub const HOME_ENV: &str = "GESTURE_VAULT_HOME";

const DEFAULT_HOME: &str = ".gesture-vault";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Quiet period before re-classifying after DOM mutations
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Budget for one request to the page context
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
    /// Re-inject the page agent once when a request times out
    #[serde(default = "default_true")]
    pub reinject_on_timeout: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,
    /// Weakest tier accepted when creating a pattern
    #[serde(default = "default_minimum_tier")]
    pub minimum_tier: DifficultyTier,
    /// Pattern store file name, relative to the data directory
    #[serde(default = "default_store_file")]
    pub store_file: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_highlight_style")]
    pub style: String,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_message_timeout_ms() -> u64 {
    1500
}

fn default_true() -> bool {
    true
}

fn default_minimum_tier() -> DifficultyTier {
    DifficultyTier::Normal
}

fn default_store_file() -> String {
    "patterns.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stagger_ms() -> u64 {
    200
}

fn default_duration_ms() -> u64 {
    1000
}

fn default_highlight_style() -> String {
    "outline: 2px solid #4caf50; background-color: #e8f5e9".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            message_timeout_ms: default_message_timeout_ms(),
            reinject_on_timeout: true,
            highlight: HighlightConfig::default(),
            minimum_tier: default_minimum_tier(),
            store_file: default_store_file(),
            log_level: default_log_level(),
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            stagger_ms: default_stagger_ms(),
            duration_ms: default_duration_ms(),
            style: default_highlight_style(),
        }
    }
}

impl AppConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    /// Full path of the pattern store file
    pub fn store_path(&self) -> Result<PathBuf> {
        Ok(data_dir()?.join(&self.store_file))
    }

    /// Parse the configured log level, falling back to INFO
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// Data directory, created on demand
pub fn data_dir() -> Result<PathBuf> {
    let dir = std::env::var(HOME_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_HOME));

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| GestureVaultError::ConfigError(e.to_string()))?;
    }

    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("config.json"))
}

pub fn load_config() -> Result<AppConfig> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content =
        fs::read_to_string(&path).map_err(|e| GestureVaultError::ConfigError(e.to_string()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig> {
    serde_json::from_str(content).map_err(|e| GestureVaultError::ConfigError(e.to_string()))
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let path = config_path()?;

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| GestureVaultError::ConfigError(e.to_string()))?;

    fs::write(&path, content).map_err(|e| GestureVaultError::ConfigError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.message_timeout_ms, 1500);
        assert!(config.reinject_on_timeout);
        assert_eq!(config.highlight.stagger_ms, 200);
        assert_eq!(config.highlight.duration_ms, 1000);
        assert_eq!(config.minimum_tier, DifficultyTier::Normal);
    }

    #[test]
    fn test_partial_override() {
        let config =
            parse_config(r#"{"debounce_ms": 250, "minimum_tier": "hard", "highlight": {"stagger_ms": 50}}"#)
                .unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.minimum_tier, DifficultyTier::Hard);
        assert_eq!(config.highlight.stagger_ms, 50);
        assert_eq!(config.highlight.duration_ms, 1000);
    }

    #[test]
    fn test_bad_log_level_falls_back() {
        let config = AppConfig {
            log_level: "chatty".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
    }
}
