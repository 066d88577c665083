//! TOML configuration file.
//!
//! Looked up at `<config dir>/image-labeler/config.toml` unless a path is
//! given on the command line. A missing file means defaults; any field left
//! out of the file takes its default too.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{Profile, DEFAULT_SURFACE};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter string understood by `env_logger`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub profile: Profile,
    /// Labels available at startup. Unset means the profile's defaults.
    pub labels: Option<Vec<String>>,
    pub surface_width: f32,
    pub surface_height: f32,
    /// Zoom change per zoom-in / zoom-out button press.
    pub zoom_step: f32,
    pub log_level: LogLevel,
    /// Directory the export dialog starts in.
    pub export_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            profile: Profile::default(),
            labels: None,
            surface_width: DEFAULT_SURFACE.x,
            surface_height: DEFAULT_SURFACE.y,
            zoom_step: 0.1,
            log_level: LogLevel::default(),
            export_dir: None,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("image-labeler").join("config.toml"))
    }

    /// Read a config file; a file that does not exist yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, text).map_err(io_err)
    }

    pub fn initial_labels(&self) -> Vec<String> {
        match &self.labels {
            Some(labels) => labels.clone(),
            None => self
                .profile
                .default_labels()
                .iter()
                .map(|l| l.to_string())
                .collect(),
        }
    }

    pub fn surface_size(&self) -> egui::Vec2 {
        egui::vec2(self.surface_width, self.surface_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.initial_labels(), vec!["person", "car", "object"]);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "profile = \"labeler\"\nlog_level = \"debug\"\n").unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.profile, Profile::Labeler);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.zoom_step, 0.1);
        assert!(config.initial_labels().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig {
            labels: Some(vec!["tree".into(), "rock".into()]),
            surface_width: 1024.0,
            export_dir: Some(dir.path().to_path_buf()),
            ..AppConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "profile = \"painter\"").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
