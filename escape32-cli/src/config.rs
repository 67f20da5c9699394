//! Configuration file support for escape32-update.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (ESCAPE32_*)
//! 3. Local config file (./escape32.toml)
//! 4. Global config file (~/.config/escape32-update/config.toml)

use directories::ProjectDirs;
use log::{debug, warn};
use serde::Deserialize;
use std::{fs, io};
use std::path::{Path, PathBuf};

/// Name of the local configuration file.
pub const LOCAL_CONFIG: &str = "escape32.toml";

/// Connection configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionConfig {
    /// Serial device (e.g., "/dev/ttyUSB0" or "COM3").
    pub device: Option<String>,
    /// Baud rate.
    pub baud: Option<u32>,
    /// Serial timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Connection configuration.
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG)) {
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from the file given with `--config`.
    pub fn load_from_path(path: &Path) -> Self {
        let config = Self::load_from_file(path);
        if config.is_none() {
            warn!("No usable config at {}, using defaults", path.display());
        }
        config.unwrap_or_default()
    }

    /// Parse one config file. A missing file is not an error.
    fn load_from_file(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read {}: {e}", path.display());
                return None;
            },
        };

        toml::from_str::<Self>(&content)
            .inspect(|_| debug!("Loaded config from {}", path.display()))
            .inspect_err(|e| warn!("Ignoring {}: {e}", path.display()))
            .ok()
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "escape32-update").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        if other.connection.device.is_some() {
            self.connection.device = other.connection.device;
        }
        if other.connection.baud.is_some() {
            self.connection.baud = other.connection.baud;
        }
        if other.connection.timeout_ms.is_some() {
            self.connection.timeout_ms = other.connection.timeout_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.connection.device.is_none());
        assert!(config.connection.baud.is_none());
        assert!(config.connection.timeout_ms.is_none());
    }

    #[test]
    fn test_config_merge_overrides() {
        let mut base = Config::default();
        base.connection.device = Some("/dev/ttyUSB0".to_string());
        base.connection.baud = Some(38400);

        let mut other = Config::default();
        other.connection.device = Some("/dev/ttyACM0".to_string());
        other.connection.timeout_ms = Some(5000);

        base.merge(other);

        assert_eq!(base.connection.device.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(base.connection.baud, Some(38400));
        assert_eq!(base.connection.timeout_ms, Some(5000));
    }

    #[test]
    fn test_config_merge_does_not_overwrite_with_none() {
        let mut base = Config::default();
        base.connection.device = Some("/dev/ttyUSB0".to_string());
        base.connection.baud = Some(115200);

        base.merge(Config::default());

        assert_eq!(base.connection.device.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(base.connection.baud, Some(115200));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[connection]
device = "/dev/ttyUSB1"
baud = 115200
timeout_ms = 3000
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.connection.device.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.connection.baud, Some(115200));
        assert_eq!(config.connection.timeout_ms, Some(3000));
    }

    #[test]
    fn test_config_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.connection.device.is_none());
    }

    #[test]
    fn test_load_from_path_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escape32.toml");
        fs::write(&path, "[connection]\ndevice = \"COM7\"\n").unwrap();

        let config = Config::load_from_path(&path);
        assert_eq!(config.connection.device.as_deref(), Some("COM7"));
    }

    #[test]
    fn test_load_from_path_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escape32.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        let config = Config::load_from_path(&path);
        assert!(config.connection.device.is_none());
    }

    #[test]
    fn test_load_from_path_nonexistent() {
        let config = Config::load_from_path(Path::new("/nonexistent/path/config.toml"));
        assert!(config.connection.device.is_none());
    }

    #[test]
    fn test_load_from_file_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_file(&dir.path().join("absent.toml")).is_none());
    }

    #[test]
    fn test_load_from_file_directory_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_file(dir.path()).is_none());
    }

    #[test]
    fn test_load_from_file_unknown_section_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escape32.toml");
        fs::write(&path, "[other]\nkey = 1\n\n[connection]\nbaud = 57600\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.connection.baud, Some(57600));
    }

    #[test]
    fn test_global_config_path() {
        if let Some(p) = Config::global_config_path() {
            assert!(p.to_str().unwrap().contains("escape32-update"));
            assert!(p.to_str().unwrap().ends_with("config.toml"));
        }
    }
}
