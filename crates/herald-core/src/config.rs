//! Herald configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HeraldError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeraldConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl HeraldConfig {
    /// Load config from the default path (~/.herald/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HeraldError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| HeraldError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| HeraldError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".herald")
            .join("config.toml")
    }
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_poll_interval() -> u64 {
    1
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl TelegramConfig {
    /// Effective bot token: the HERALD_BOT_TOKEN environment variable
    /// overrides the config file.
    pub fn token(&self) -> String {
        std::env::var("HERALD_BOT_TOKEN").unwrap_or_else(|_| self.bot_token.clone())
    }
}

/// Daily notification time-of-day, in UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

fn default_notify_hour() -> u32 {
    10
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            hour: default_notify_hour(),
            minute: 0,
        }
    }
}

/// Durable file locations. Relative paths resolve against the working
/// directory the bot was started in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_subscriptions_file")]
    pub subscriptions_file: PathBuf,
    #[serde(default = "default_thematic_dates_file")]
    pub thematic_dates_file: PathBuf,
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

fn default_subscriptions_file() -> PathBuf {
    PathBuf::from("subscriptions.json")
}

fn default_thematic_dates_file() -> PathBuf {
    PathBuf::from("thematic_dates.json")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            subscriptions_file: default_subscriptions_file(),
            thematic_dates_file: default_thematic_dates_file(),
            media_dir: default_media_dir(),
        }
    }
}
