//! Undo history configuration.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_MAX_LEVELS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UndoConfig {
    /// Maximum number of undo levels kept; `0` keeps everything.
    pub max_levels: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
        }
    }
}

impl UndoConfig {
    pub fn unlimited() -> Self {
        Self { max_levels: 0 }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
