//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate locations:
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data (database, preferences) | `~/Library/Application Support/kanban/` | `~/.local/share/kanban/` |
//! | Config | `~/Library/Application Support/kanban/` | `~/.config/kanban/` |
//!
//! # Environment Overrides
//!
//! - `KANBAN_DATA_DIR` overrides [`data_dir`]
//! - `KANBAN_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

const APP_DIR: &str = "kanban";

/// Application data root directory.
///
/// Resolves to `dirs::data_dir()/kanban/` unless `KANBAN_DATA_DIR` is set.
#[must_use]
pub fn data_dir() -> PathBuf {
    resolve("KANBAN_DATA_DIR", ::dirs::data_dir(), "/tmp/kanban-data")
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/kanban/` unless `KANBAN_CONFIG_DIR` is set.
#[must_use]
pub fn config_dir() -> PathBuf {
    resolve("KANBAN_CONFIG_DIR", ::dirs::config_dir(), "/tmp/kanban-config")
}

/// Task database path (`data_dir()/kanban.db`).
#[must_use]
pub fn database_file() -> PathBuf {
    data_dir().join(crate::store::DB_FILENAME)
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Key-value preferences file (`data_dir()/preferences.json`).
#[must_use]
pub fn preferences_file() -> PathBuf {
    data_dir().join("preferences.json")
}

fn resolve(var: &str, base: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Some(override_dir) = std::env::var_os(var) {
        return PathBuf::from(override_dir);
    }
    base.map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_appends_app_dir_to_platform_base() {
        let dir = resolve("KANBAN_TEST_UNSET_DIR", Some(PathBuf::from("/base")), "/tmp/x");
        assert_eq!(dir, PathBuf::from("/base/kanban"));
    }

    #[test]
    fn resolve_falls_back_without_platform_base() {
        let dir = resolve("KANBAN_TEST_UNSET_DIR", None, "/tmp/kanban-data");
        assert_eq!(dir, PathBuf::from("/tmp/kanban-data"));
    }

    #[test]
    fn files_live_under_their_directories() {
        assert!(database_file().ends_with("kanban.db"));
        assert!(config_file().ends_with("config.toml"));
        assert!(preferences_file().ends_with("preferences.json"));
    }

    #[test]
    fn override_via_env() {
        let key = "KANBAN_TEST_OVERRIDE_DIR";

        // SAFETY: the variable is private to this test.
        unsafe { std::env::set_var(key, "/custom/data") };
        let result = resolve(key, Some(PathBuf::from("/base")), "/tmp/x");
        unsafe { std::env::remove_var(key) };

        assert_eq!(result, PathBuf::from("/custom/data"));
    }
}
