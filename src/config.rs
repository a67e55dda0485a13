//! User configuration loaded from `XDG_CONFIG_HOME/gallery-pager/config.toml`.
//!
//! Every field has a default, so a missing file or a partial file is valid.
//! The `GALLERY_API_URL` environment variable overrides `api_base_url`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const CONFIG_FILE: &str = "config.toml";
const API_URL_ENV: &str = "GALLERY_API_URL";

/// Page writes to the location are coalesced over at least this window.
pub const MIN_PAGE_SYNC_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to determine project directories")]
    NoProjectDirs,
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the gallery server, without the `/api` suffix.
    pub api_base_url: String,
    /// Items requested per page (`limit` query parameter).
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub page_sync_debounce_ms: u64,
    pub search_debounce_ms: u64,
    /// Distance from the bottom of the content that triggers the next page.
    pub bottom_threshold_px: f64,
    /// Number of fetched image details kept for the overlay.
    pub detail_cache_size: usize,
    pub tile_size_px: f32,
    pub viewport_width_px: f32,
    pub viewport_height_px: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            page_size: 50,
            request_timeout_secs: 30,
            page_sync_debounce_ms: MIN_PAGE_SYNC_DEBOUNCE_MS,
            search_debounce_ms: 500,
            bottom_threshold_px: 100.0,
            detail_cache_size: 64,
            tile_size_px: 220.0,
            viewport_width_px: 1280.0,
            viewport_height_px: 800.0,
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            debug!(?path, "No config file, using defaults");
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Returns the default config path based on XDG directories.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let proj_dirs =
            ProjectDirs::from("", "", "gallery-pager").ok_or(ConfigError::NoProjectDirs)?;
        Ok(proj_dirs.config_dir().join(CONFIG_FILE))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(?path, "Loaded config");
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                debug!(url, "Using API URL from environment");
                self.api_base_url = url.to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.page_sync_debounce_ms < MIN_PAGE_SYNC_DEBOUNCE_MS {
            return Err(ConfigError::Invalid {
                field: "page_sync_debounce_ms",
                reason: format!("must be at least {} ms", MIN_PAGE_SYNC_DEBOUNCE_MS),
            });
        }
        if self.detail_cache_size == 0 {
            return Err(ConfigError::Invalid {
                field: "detail_cache_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.bottom_threshold_px.is_nan() || self.bottom_threshold_px < 0.0 {
            return Err(ConfigError::Invalid {
                field: "bottom_threshold_px",
                reason: "must be a non-negative number".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_sync_debounce(&self) -> Duration {
        Duration::from_millis(self.page_sync_debounce_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_sync_debounce(), Duration::from_millis(300));
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            api_base_url: "http://gallery.lan:9000".to_string(),
            page_size: 20,
            ..Config::default()
        };

        config.save_to_path(&path).unwrap();
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "page_size = 10\n").unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.page_size, 10);
        assert_eq!(loaded.api_base_url, Config::default().api_base_url);
        assert_eq!(loaded.detail_cache_size, 64);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "not = valid = toml").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_rejects_short_page_sync_debounce() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "page_sync_debounce_ms = 50\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "page_sync_debounce_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = Config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
