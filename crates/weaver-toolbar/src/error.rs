//! Error types.
//!
//! Decision paths never surface these to callers: lookups degrade to `None`
//! and the router logs and swallows selection failures. They exist for the
//! selection-mutation capability and for config loading.

use thiserror::Error;

/// Errors from a surface's selection-only mutation capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SurfaceError {
    /// Position no longer exists in the document.
    #[error("position {pos} is out of range (document size {len})")]
    PositionOutOfRange { pos: usize, len: usize },

    /// The editing surface is not mounted yet, or already torn down.
    #[error("editing surface is not mounted")]
    NotMounted,
}

/// Errors loading a [`ToolbarConfig`](crate::config::ToolbarConfig).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}
