//! Configuration types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// macinfo configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Section reader configuration
    pub reader: ReaderConfig,

    /// Dump configuration
    pub dump: DumpConfig,
}

impl Config {
    /// Load a configuration file, choosing YAML or JSON by extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            other => Err(Error::Config(format!(
                "unsupported config extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// Parse a YAML configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Parse a JSON configuration
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Section reader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Name of the section holding the macro info in object files
    pub section_name: String,

    /// Fail on unknown opcodes instead of ending the unit there
    pub strict_opcodes: bool,

    /// Maximum nesting of start-file records
    pub max_include_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            section_name: ".debug_macinfo".into(),
            strict_opcodes: true,
            max_include_depth: 256,
        }
    }
}

/// Dump configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Print section offsets in table headers
    pub show_offsets: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self { show_offsets: true }
    }
}
