//! Cross-platform directory path resolution
//!
//! Provides functions to resolve platform-appropriate paths for configuration
//! and the snapshot cache.
//! - Linux/macOS: XDG Base Directory specification (~/.config, ~/.cache)
//! - Windows: Known Folder API (AppData\Roaming, AppData\Local)

use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "CLOUDPATH_CONFIG_DIR";

/// Get the configuration directory path
///
/// Checks CLOUDPATH_CONFIG_DIR environment variable first, then falls back to:
/// - Unix (Linux/macOS): XDG_CONFIG_HOME/cloudpath or ~/.config/cloudpath
/// - Windows: %APPDATA%\cloudpath\config
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(windows)]
            {
                use directories::ProjectDirs;
                ProjectDirs::from("", "", "cloudpath")
                    .map(|dirs| dirs.config_dir().to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join("cloudpath"))
            }
            #[cfg(not(windows))]
            {
                use directories::BaseDirs;
                std::env::var("XDG_CONFIG_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        BaseDirs::new()
                            .map(|dirs| dirs.home_dir().join(".config"))
                            .unwrap_or_else(|| PathBuf::from(".").join(".config"))
                    })
                    .join("cloudpath")
            }
        })
}

/// Platform cache directory for snapshots
///
/// - Unix (Linux/macOS): XDG_CACHE_HOME/cloudpath or ~/.cache/cloudpath
/// - Windows: %LOCALAPPDATA%\cloudpath\cache
pub fn default_cache_dir() -> PathBuf {
    #[cfg(windows)]
    {
        use directories::ProjectDirs;
        ProjectDirs::from("", "", "cloudpath")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".").join(".cache").join("cloudpath"))
    }
    #[cfg(not(windows))]
    {
        use directories::BaseDirs;
        std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                BaseDirs::new()
                    .map(|dirs| dirs.home_dir().join(".cache"))
                    .unwrap_or_else(|| PathBuf::from(".").join(".cache"))
            })
            .join("cloudpath")
    }
}

/// Get the root configuration file path
pub fn root_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_namespaced() {
        assert!(
            config_dir().to_string_lossy().contains("cloudpath")
                || std::env::var(CONFIG_DIR_ENV).is_ok()
        );
        assert!(default_cache_dir().to_string_lossy().contains("cloudpath"));
    }

    #[test]
    fn test_root_config_path() {
        assert!(root_config_path().ends_with("config.yaml"));
    }
}
