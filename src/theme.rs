//! Light/dark theme preference, persisted in a key-value preferences file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{KanbanError, Result};

/// Preferences key holding the theme.
pub const THEME_KEY: &str = "kanban-theme";

/// Board theme.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

/// String key-value store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PreferenceStore {
    /// Load preferences from `path`. A missing file is an empty store; an
    /// unreadable one is logged and treated as empty.
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), "ignoring corrupt preferences: {e}");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), "cannot read preferences: {e}");
                BTreeMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    /// Open the default preferences file.
    pub fn open_default() -> Self {
        Self::open(&crate::paths::preferences_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set `key` and write the file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_owned(), value.to_owned());
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)
            .map_err(|e| KanbanError::Config(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Stored theme; unknown or missing values mean light.
    pub fn theme(&self) -> Theme {
        self.get(THEME_KEY).and_then(Theme::parse).unwrap_or_default()
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.set(THEME_KEY, &theme.to_string())
    }

    /// Flip and persist the theme; returns the new value.
    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.theme().toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }
}
