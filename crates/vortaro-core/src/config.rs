//! Configuration management for Vortaro.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::error::{Result, VortaroError};
use crate::fragment::DEFAULT_FRAGMENT_SIZE;
use crate::source::FORMAT_NAMES;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for Vortaro.
///
/// ## Example Configuration File (vortaro.toml)
///
/// ```toml
/// [general]
/// data_dir = "/home/me/dictionaries"
/// log_level = "info"
///
/// [index]
/// fragment_size = 3
/// workers = 0
/// bidirectional = true
/// formats = ["dict.cc", "espdic"]
///
/// [search]
/// limit = 0
/// from_langs = ["sr", "ru"]
///
/// [ui]
/// highlight = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Index building
    pub index: IndexConfig,

    /// Search defaults
    pub search: SearchConfig,

    /// UI settings
    pub ui: UiConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Dictionary sources, one subdirectory per format (None = default location)
    pub data_dir: Option<PathBuf>,

    /// Index file location (None = default location)
    pub index_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            data_dir: None,
            index_path: None,
            log_level: "warn".to_string(),
        }
    }
}

/// Index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Fragment length in characters
    pub fragment_size: usize,

    /// Parser threads (0 = one per core)
    pub workers: usize,

    /// Also index every translation in the reverse direction
    pub bidirectional: bool,

    /// Enabled source formats (empty = all)
    pub formats: Vec<String>,

    /// Use compression for index storage
    pub compress: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            workers: 0,
            bidirectional: true,
            formats: Vec::new(),
            compress: true,
        }
    }
}

/// Search defaults, overridden by command line flags
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum rows (0 = fit the terminal)
    pub limit: usize,

    /// From-languages to search (empty = all)
    pub from_langs: Vec<String>,

    /// To-languages to show (empty = all)
    pub to_langs: Vec<String>,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Table width (0 = terminal width)
    pub width: usize,

    /// Highlight matches in results
    pub highlight: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            width: 0,
            highlight: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| VortaroError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| VortaroError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the index cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.index.fragment_size == 0 {
            return Err(VortaroError::ConfigError {
                reason: "index.fragment_size must be at least 1".to_string(),
            });
        }
        if let Some(unknown) = self
            .index
            .formats
            .iter()
            .find(|f| !FORMAT_NAMES.contains(&f.as_str()))
        {
            return Err(VortaroError::ConfigError {
                reason: format!(
                    "unknown format '{}' in index.formats, expected one of: {}",
                    unknown,
                    FORMAT_NAMES.join(", ")
                ),
            });
        }
        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "vortaro").ok_or_else(|| VortaroError::ConfigError {
            reason: "Could not determine home directory".to_string(),
        })
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("vortaro.toml"))
    }

    /// Get the default data directory path.
    pub fn default_data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Get the dictionary source directory (from config or default).
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.general.data_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::default_data_dir()?.join("dictionaries")),
        }
    }

    /// Get the index directory (from config or default).
    pub fn index_dir(&self) -> Result<PathBuf> {
        match &self.general.index_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_data_dir(),
        }
    }
}
