//! Image cache configuration.
//!
//! A TOML file holds one `[[image_cache]]` table per display resolution:
//!
//! ```toml
//! file_version = 1
//!
//! [[image_cache]]
//! resolution = "240x320"
//! cache_size = 65535
//! replacement_free = "lru"
//! replacement_used = "lru"
//!
//! [[image_cache]]
//! resolution = "480x640_portrait"
//! cache_size = 1048576
//! replacement_free = "fifo"
//! replacement_used = "greedy"
//! ```
//!
//! The config file is optional; a missing file yields the defaults.

use crate::error::ConfigError;
use crate::replacement::ReplacementPolicyType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// The only supported `file_version`.
pub const CONFIG_FILE_VERSION: u32 = 1;

/// 100 MiB.
pub const DEFAULT_CACHE_SIZE: usize = 100 * 1024 * 1024;

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

/// Cache settings for one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImageCacheSettings {
    /// `"WxH"` or `"WxH_appendix"`.
    pub resolution: String,
    /// Size limit in bytes.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default)]
    pub replacement_free: ReplacementPolicyType,
    #[serde(default)]
    pub replacement_used: ReplacementPolicyType,
}

impl Default for ImageCacheSettings {
    fn default() -> Self {
        Self {
            resolution: String::new(),
            cache_size: DEFAULT_CACHE_SIZE,
            replacement_free: ReplacementPolicyType::Lru,
            replacement_used: ReplacementPolicyType::Lru,
        }
    }
}

/// Parsed resolution key: width, height and optional appendix.
pub fn parse_resolution(key: &str) -> Option<(u32, u32, Option<&str>)> {
    let (w, rest) = key.split_once('x')?;
    let (h, appendix) = match rest.split_once('_') {
        Some((h, a)) if !a.is_empty() => (h, Some(a)),
        Some(_) => return None,
        None => (rest, None),
    };
    Some((w.parse().ok()?, h.parse().ok()?, appendix))
}

/// Resolution key for `width`, `height` and an optional appendix.
pub fn resolution_key(width: u32, height: u32, appendix: Option<&str>) -> String {
    match appendix {
        Some(a) if !a.is_empty() => format!("{}x{}_{}", width, height, a),
        _ => format!("{}x{}", width, height),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    pub file_version: u32,
    #[serde(rename = "image_cache")]
    pub entries: Vec<ImageCacheSettings>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file_version: CONFIG_FILE_VERSION,
            entries: Vec::new(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from a specific path.
    ///
    /// Returns the default configuration if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!(
                "No cache config found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        log::info!("Loading cache config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig = toml::from_str(contents)?;
        config.validate()?;
        log::info!("Cache config has {} resolution entries", config.entries.len());
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_version != CONFIG_FILE_VERSION {
            return Err(ConfigError::ValidationError(format!(
                "file_version must be {}, got {}",
                CONFIG_FILE_VERSION, self.file_version
            )));
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if parse_resolution(&entry.resolution).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "resolution must look like WxH or WxH_appendix, got {:?}",
                    entry.resolution
                )));
            }
            if entry.cache_size == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "cache_size of {} must be greater than 0",
                    entry.resolution
                )));
            }
            if !seen.insert(entry.resolution.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "resolution {} is configured twice",
                    entry.resolution
                )));
            }
        }

        Ok(())
    }

    /// Settings for a display resolution.
    pub fn select(
        &self,
        width: u32,
        height: u32,
        appendix: Option<&str>,
    ) -> Result<&ImageCacheSettings, ConfigError> {
        let key = resolution_key(width, height, appendix);
        self.entries
            .iter()
            .find(|e| e.resolution == key)
            .ok_or(ConfigError::MissingResolution(key))
    }
}
