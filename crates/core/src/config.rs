//! Application Configuration
//!
//! Manages editor settings including:
//! - Editing preferences (tabs, quit key, scratch buffer name)
//! - Input decoding (escape timeout, read chunk size)
//! - Logging (filter level, log file)

use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::{EditorError, Result};

/// Editing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Name given to a buffer opened without a file
    pub scratch_name: String,
    /// Tab size
    pub tab_width: usize,
    /// Use spaces instead of tabs
    pub soft_tabs: bool,
    /// Key that ends the session, e.g. `q`, `C-q` or `f10`
    pub quit_key: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            scratch_name: "scratch".to_string(),
            tab_width: 4,
            soft_tabs: true,
            quit_key: "q".to_string(),
        }
    }
}

/// Terminal input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// How long a partial escape sequence may wait for its next byte
    pub escape_timeout_ms: u64,
    /// Bytes requested per terminal read
    pub read_chunk: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            escape_timeout_ms: 50,
            read_chunk: 256,
        }
    }
}

impl InputConfig {
    pub fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.escape_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub level: String,
    /// Log file; the terminal is in raw mode so stderr is a poor default
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Editing settings
    pub editor: EditorConfig,
    /// Input decoding settings
    pub input: InputConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            editor: EditorConfig::default(),
            input: InputConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "eklitzke", "e")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from file
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| EditorError::Config("Cannot determine config path".into()))?;

        if config_file.exists() {
            debug!("Loading config from {:?}", config_file);
            let contents = tokio::fs::read_to_string(&config_file).await?;
            Self::from_toml_str(&contents)
        } else {
            info!("Config file not found, using defaults");
            let config = AppConfig::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_file = Self::config_file()
            .ok_or_else(|| EditorError::Config("Cannot determine config path".into()))?;

        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(&config_file, contents).await?;

        debug!("Config saved to {:?}", config_file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.editor.scratch_name, "scratch");
        assert_eq!(config.editor.quit_key, "q");
        assert_eq!(config.input.escape_timeout(), Duration::from_millis(50));
        assert!(config.log.file.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            "[editor]\nquit_key = \"C-q\"\n\n[input]\nescape_timeout_ms = 10\n",
        )
        .unwrap();
        assert_eq!(config.editor.quit_key, "C-q");
        assert_eq!(config.editor.tab_width, 4);
        assert_eq!(config.input.escape_timeout_ms, 10);
        assert_eq!(config.input.read_chunk, 256);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = AppConfig::default();
        config.log.file = Some(PathBuf::from("/tmp/e.log"));
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = AppConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.log.file, config.log.file);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = AppConfig::from_toml_str("[editor\n").unwrap_err();
        assert!(matches!(err, EditorError::TomlParse(_)));
    }
}
