//! Connection settings for the host bridge.
//!
//! Stored as JSON in the platform config directory. A missing file is written
//! out with defaults pointing at the extension's local listener.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::BridgeError;

const SETTINGS_FILE: &str = "bridge.json";

/// How commands are encoded in request frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireEncoding {
    /// Typed command objects.
    #[default]
    Json,
    /// Commands rendered to Lua statements for hosts that only run script text.
    Lua,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// `host:port` of the extension's command listener.
    pub address: String,
    pub encoding: WireEncoding,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:4444".to_string(),
            encoding: WireEncoding::Json,
        }
    }
}

impl BridgeSettings {
    /// Default settings file location, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("io.github", "BetterVSL", "bettervsl-panel")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Load settings from `path`, creating it with defaults when it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, BridgeError> {
        if !path.exists() {
            debug!("No bridge settings at {}, writing defaults", path.display());
            let settings = Self::default();
            settings.save(path)?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path)?;
        let settings: BridgeSettings =
            serde_json::from_str(&content).map_err(|e| BridgeError::Settings {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        info!("Loaded bridge settings from {}", path.display());
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), BridgeError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let settings = BridgeSettings::load_or_create(&path).unwrap();
        assert_eq!(settings, BridgeSettings::default());
        assert!(path.exists());
        assert_eq!(BridgeSettings::load_or_create(&path).unwrap(), settings);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let settings = BridgeSettings {
            address: "10.0.0.5:9000".to_string(),
            encoding: WireEncoding::Lua,
        };
        settings.save(&path).unwrap();
        assert_eq!(BridgeSettings::load_or_create(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"encoding": "lua"}"#).unwrap();
        let settings = BridgeSettings::load_or_create(&path).unwrap();
        assert_eq!(settings.address, "127.0.0.1:4444");
        assert_eq!(settings.encoding, WireEncoding::Lua);
    }

    #[test]
    fn garbage_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "not json").unwrap();
        let err = BridgeSettings::load_or_create(&path).unwrap_err();
        assert!(matches!(err, BridgeError::Settings { .. }));
    }
}
