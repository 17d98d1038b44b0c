//! Configuration types for the board server and client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KanbanError, Result};
use crate::task::ClientZone;

/// `RUST_LOG` filter the binaries fall back to.
pub const DEFAULT_LOG_FILTER: &str = "kanban=info";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KanbanConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Task database settings.
    pub store: StoreConfig,
    /// Board client settings.
    pub client: ClientConfig,
    /// Due-date reminder settings.
    pub reminders: ReminderConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port (0 = auto-assign).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5000,
        }
    }
}

/// Task database configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file; `None` uses `data_dir()/kanban.db`.
    pub database_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn effective_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::paths::database_file)
    }
}

/// Board client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the task API, including the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Fixed UTC offset in minutes used for due dates. `None` uses the
    /// system zone, daylight-saving rules included.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_owned(),
            request_timeout_secs: 10,
            utc_offset_minutes: None,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the configured zone.
    ///
    /// # Errors
    ///
    /// Returns [`KanbanError::Config`] when the offset is out of range.
    pub fn zone(&self) -> Result<ClientZone> {
        match self.utc_offset_minutes {
            None => Ok(ClientZone::local()),
            Some(minutes) => ClientZone::from_offset_minutes(minutes).ok_or_else(|| {
                KanbanError::Config(format!("utc_offset_minutes out of range: {minutes}"))
            }),
        }
    }
}

/// Due-date reminder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Master switch for reminder scheduling.
    pub enabled: bool,
    /// How long before the due date a reminder fires.
    pub lead_minutes: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lead_minutes: 15,
        }
    }
}

impl ReminderConfig {
    pub fn lead(&self) -> Duration {
        Duration::from_secs(u64::from(self.lead_minutes) * 60)
    }
}

impl KanbanConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| KanbanError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| KanbanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `config_dir()/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::paths::config_file()
    }
}
