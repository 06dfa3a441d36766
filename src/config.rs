//! Configuration file support.
//!
//! Settings are stored as JSON in the user's config directory and loaded at
//! startup. Missing fields fall back to their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_STAMP_WIDTH, DEFAULT_UNDO_HISTORY, DEFAULT_ZOOM, ZOOM_STEP,
};
use crate::session::SessionOptions;
use crate::transform::clamp_zoom;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Get all log levels in order from least to most verbose.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

    /// The level `steps` notches more verbose, saturating at `Trace`.
    pub fn raised(self, steps: u8) -> LogLevel {
        let all = Self::all();
        let index = all.iter().position(|level| *level == self).unwrap_or(0);
        all[(index + steps as usize).min(all.len() - 1)]
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,
}

/// User preferences section of the config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Zoom applied when a document is opened
    #[serde(default = "default_zoom")]
    pub default_zoom: f32,

    /// Factor used by zoom in/out
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    /// Width of dropped stamps, in screen pixels
    #[serde(default = "default_stamp_width")]
    pub default_stamp_width: f32,

    /// Number of scaled stamp bitmaps kept in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Number of undoable actions kept
    #[serde(default = "default_undo_history")]
    pub undo_history: usize,

    /// Directory holding the stamp and signature libraries.
    /// Empty means the platform data directory.
    #[serde(default)]
    pub library_root: String,
}

fn default_zoom() -> f32 {
    DEFAULT_ZOOM
}

fn default_zoom_step() -> f32 {
    ZOOM_STEP
}

fn default_stamp_width() -> f32 {
    DEFAULT_STAMP_WIDTH
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_undo_history() -> usize {
    DEFAULT_UNDO_HISTORY
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            default_zoom: default_zoom(),
            zoom_step: default_zoom_step(),
            default_stamp_width: default_stamp_width(),
            cache_capacity: default_cache_capacity(),
            undo_history: default_undo_history(),
            library_root: String::new(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Session settings derived from the preferences.
    ///
    /// Out-of-range values are clamped rather than rejected.
    pub fn session_options(&self) -> SessionOptions {
        let prefs = &self.preferences;
        let defaults = SessionOptions::default();
        SessionOptions {
            default_zoom: clamp_zoom(prefs.default_zoom),
            zoom_step: if prefs.zoom_step > 1.0 {
                prefs.zoom_step
            } else {
                defaults.zoom_step
            },
            default_stamp_width: if prefs.default_stamp_width > 0.0 {
                prefs.default_stamp_width
            } else {
                defaults.default_stamp_width
            },
            cache_capacity: prefs.cache_capacity.max(1),
            undo_history: prefs.undo_history,
        }
    }

    /// Root directory of the asset libraries.
    pub fn library_root(&self) -> Option<PathBuf> {
        if !self.preferences.library_root.is_empty() {
            return Some(PathBuf::from(&self.preferences.library_root));
        }
        dirs::data_dir().map(|dir| dir.join("stampdesk"))
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "stampdesk-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("stampdesk").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("stampdesk")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load configuration from `path`, or `None` if there is no file there.
    pub fn load_if_present(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Ok(None);
        }
        let config = Self::load_from(path)?;
        log::info!("⚙️ Loaded configuration from {:?}", path);
        Ok(Some(config))
    }

    /// Load configuration from the default path.
    ///
    /// Returns `Ok(None)` when there is no config directory or no file in it.
    /// A file that exists but cannot be used is an error, so callers can
    /// report it instead of silently running on defaults.
    pub fn load_from_default_path() -> Result<Option<Self>, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_if_present(&path),
            None => Ok(None),
        }
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("💾 Saved configuration to {:?}", path);
        Ok(())
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No platform config directory could be determined
    #[error("Could not determine config directory")]
    NoConfigDir,
}
