//! Default paths for bbtimer components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/bbtimer/config.toml` or `~/.config/bbtimer/config.toml`
//! - Data: `$XDG_DATA_HOME/bbtimer` or `~/.local/share/bbtimer`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const BBTIMER_DATA_DIR_ENV: &str = "BBTIMER_DATA_DIR";

/// Environment variable for overriding the config file
pub const BBTIMER_CONFIG_ENV: &str = "BBTIMER_CONFIG";

/// Application subdirectory name
const APP_DIR: &str = "bbtimer";

/// Database filename within the data directory
const DB_FILENAME: &str = "bbtimer.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/bbtimer/config.toml`
/// 2. `~/.config/bbtimer/config.toml`
/// 3. `/etc/bbtimer/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$BBTIMER_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/bbtimer` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/bbtimer` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(BBTIMER_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the BBTIMER_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Path of the SQLite database inside a data directory
pub fn database_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join(DB_FILENAME)
}
