//! Toolbar configuration.
//!
//! Everything has a default; a config file only needs the keys it changes.
//! Files are read as JSON or TOML depending on their extension.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::actions::ActionId;
use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::rules::Capabilities;
use crate::word::WordBoundaryResolver;

/// Replacement "not implemented" tables per surface.
///
/// `None` keeps the built-in table for that surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityOverrides {
    pub structured_unimplemented: Option<Vec<ActionId>>,
    pub flat_text_unimplemented: Option<Vec<ActionId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarConfig {
    /// Bounded retry while the target surface is not mounted.
    pub retry: RetryPolicy,
    /// Auto-select the word under the cursor. Off means `in_word` is never
    /// reported, even when a segmenter is compiled in.
    pub word_segmentation: bool,
    /// Trigger presses within this many milliseconds after a composition
    /// ended are ignored.
    pub composition_settle_ms: u64,
    pub capabilities: CapabilityOverrides,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            word_segmentation: true,
            composition_settle_ms: 0,
            capabilities: CapabilityOverrides::default(),
        }
    }
}

impl ToolbarConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&std::fs::read_to_string(path)?),
            Some("toml") => Self::from_toml_str(&std::fs::read_to_string(path)?),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_overrides(&self.capabilities)
    }

    /// Word resolver honouring `word_segmentation`.
    pub fn word_resolver(&self) -> WordBoundaryResolver {
        if self.word_segmentation {
            WordBoundaryResolver::with_default()
        } else {
            WordBoundaryResolver::disabled()
        }
    }
}
