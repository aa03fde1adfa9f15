//! Default paths for gigclock components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/gigclock/config.toml` or `~/.config/gigclock/config.toml`
//! - Data: `$XDG_DATA_HOME/gigclock` or `~/.local/share/gigclock`

use std::path::PathBuf;

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "attendance.db";

/// Application subdirectory name
const APP_DIR: &str = "gigclock";

/// Get the default configuration file path.
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

/// Get the data directory without checking GIGCLOCK_DATA_DIR env var.
/// Used for default values in configs where the env var is checked separately.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_toml_under_app_dir() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("gigclock"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
    }

    #[test]
    fn data_dir_contains_gigclock() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("gigclock"));
    }
}
