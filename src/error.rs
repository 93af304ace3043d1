use crate::replacement::ImageId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors of the image cache and its loaders.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("image {id} needs {size} bytes, cache limit is {limit}")]
    ImageTooLarge { id: ImageId, size: usize, limit: usize },

    #[error("cannot free {needed} bytes for image {id}")]
    CacheFull { id: ImageId, needed: usize },

    #[error("image {0} could not be recorded by the replacement policy")]
    PolicyRefused(ImageId),

    #[error("image {id} not found at {}", .path.display())]
    NotFound { id: ImageId, path: PathBuf },

    #[error("failed to load image {id}: {reason}")]
    LoadFailed { id: ImageId, reason: String },

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading a cache configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("No cache configuration for resolution {0}")]
    MissingResolution(String),
}
