//! Configuration file support for heats.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/heats/config.toml`.

use crate::catalog::build_default_catalog;
use crate::{Catalog, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub seeding: SeedingConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Meet-wide seeding defaults
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SeedingConfig {
    /// Preset used when no preset is eligible for an event
    #[serde(default)]
    pub default_preset: Option<String>,

    /// Lanes available at the venue, replacing each preset's lane count
    #[serde(default)]
    pub lane_count: Option<u8>,

    #[serde(default)]
    pub reseed_by_round_time: bool,
}

/// Where presets and qualification tables come from
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// TOML catalog replacing the built-in one
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        if config.seeding.lane_count == Some(0) {
            return Err(Error::Config(format!(
                "{:?}: seeding.lane_count must be at least 1",
                path
            )));
        }
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("heats").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Build the catalog this configuration selects
    ///
    /// The configured default preset replaces the catalog's own and must name
    /// a preset in it.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let mut catalog = match &self.catalog.path {
            Some(path) => Catalog::load_from(path)?,
            None => build_default_catalog(),
        };

        if let Some(default) = &self.seeding.default_preset {
            catalog.require_preset(default)?;
            catalog.default_preset = default.clone();
        }

        Ok(catalog)
    }
}
