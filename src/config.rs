//! Configuration management for dmasim.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (DMASIM_CHANNELS, DMASIM_BUS_CAPACITY)
//! 2. Project-local config file (`./dmasim.toml`)
//! 3. User config file (`~/.config/dmasim/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # dmasim.toml
//!
//! # Number of DMA channels in the controller
//! num_channels = 4
//!
//! # Concurrent transfer slots on the bus
//! bus_capacity = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::bus::DEFAULT_BUS_CAPACITY;
use crate::dma::DEFAULT_NUM_CHANNELS;

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// dmasim configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Number of DMA channels in the controller.
    pub num_channels: Option<usize>,

    /// Concurrent transfer slots on the bus.
    pub bus_capacity: Option<usize>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `dmasim.toml`
    /// 3. User config `~/.config/dmasim/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load user config first (lowest priority of file configs)
        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        // Load project-local config (higher priority)
        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        // Environment variables override everything
        config.apply_env_overrides();

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    /// Get the channel count, with fallback to the default.
    pub fn num_channels(&self) -> usize {
        self.num_channels.unwrap_or(DEFAULT_NUM_CHANNELS)
    }

    /// Get the bus slot capacity, with fallback to the default.
    ///
    /// A configured zero is rejected here rather than later in the
    /// arbiter constructor.
    pub fn bus_capacity(&self) -> usize {
        match self.bus_capacity {
            Some(0) => {
                log::warn!("bus_capacity of 0 is invalid, using {}", DEFAULT_BUS_CAPACITY);
                DEFAULT_BUS_CAPACITY
            }
            Some(n) => n,
            None => DEFAULT_BUS_CAPACITY,
        }
    }

    /// Load user configuration from ~/.config/dmasim/config.toml
    fn load_user_config() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let config_path = config_dir.join("dmasim").join("config.toml");
        Self::load_from_file(&config_path)
    }

    /// Load project-local configuration from ./dmasim.toml
    fn load_local_config() -> Option<Self> {
        // Try current directory
        let local_path = Path::new("dmasim.toml");
        if let Some(config) = Self::load_from_file(local_path) {
            return Some(config);
        }

        // Try to find project root by looking for Cargo.toml
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let project_path = Path::new(&manifest_dir).join("dmasim.toml");
            if let Some(config) = Self::load_from_file(&project_path) {
                return Some(config);
            }
        }

        None
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    fn merge(&mut self, other: Self) {
        if other.num_channels.is_some() {
            self.num_channels = other.num_channels;
        }
        if other.bus_capacity.is_some() {
            self.bus_capacity = other.bus_capacity;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(n) = Self::env_usize("DMASIM_CHANNELS") {
            self.num_channels = Some(n);
        }
        if let Some(n) = Self::env_usize("DMASIM_BUS_CAPACITY") {
            self.bus_capacity = Some(n);
        }
    }

    /// Read a numeric override, warning on unparsable values.
    fn env_usize(name: &str) -> Option<usize> {
        let raw = std::env::var(name).ok()?;
        match raw.parse() {
            Ok(n) => {
                log::info!("Using {} from environment: {}", name, n);
                Some(n)
            }
            Err(_) => {
                log::warn!("Ignoring {}: '{}' is not a number", name, raw);
                None
            }
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("dmasim").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# dmasim configuration
# Place this file at ~/.config/dmasim/config.toml or ./dmasim.toml

# Number of DMA channels in the controller (default 4)
# num_channels = 4

# Concurrent transfer slots on the bus (default 2)
# bus_capacity = 2
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.num_channels(), DEFAULT_NUM_CHANNELS);
        assert_eq!(config.bus_capacity(), DEFAULT_BUS_CAPACITY);
    }

    #[test]
    fn test_zero_capacity_falls_back() {
        let config = Config {
            num_channels: None,
            bus_capacity: Some(0),
        };
        assert_eq!(config.bus_capacity(), DEFAULT_BUS_CAPACITY);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config {
            num_channels: Some(8),
            bus_capacity: None,
        };

        let overlay = Config {
            num_channels: None,
            bus_capacity: Some(3),
        };

        base.merge(overlay);

        // num_channels unchanged (overlay was None)
        assert_eq!(base.num_channels, Some(8));
        // bus_capacity set from overlay
        assert_eq!(base.bus_capacity, Some(3));
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = Config::sample_config();
        // Should parse without error (all fields commented out)
        let config: Config = toml::from_str(&sample).expect("Sample config should parse");
        assert_eq!(config, Config::default());
    }
}
