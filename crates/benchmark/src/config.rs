//! Run configuration loaded from TOML.
//!
//! ```toml
//! [validation]
//! remove_unsolvable = true
//! parallel = true
//! threads = 0
//! shard_size = 64
//!
//! [output]
//! json = "report.json"
//! markdown = "report.md"
//! csv = "outcomes.csv"
//! print_summary = true
//! ```
//!
//! Every key is optional; command-line flags take precedence.

use aslib_validate_core::ValidatorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    pub remove_unsolvable: bool,
    pub parallel: bool,
    pub threads: usize,
    pub shard_size: usize,
}

impl Default for ValidationSection {
    fn default() -> Self {
        let defaults = ValidatorConfig::default();
        Self {
            remove_unsolvable: defaults.remove_unsolvable,
            parallel: defaults.parallel,
            threads: defaults.threads,
            shard_size: defaults.shard_size,
        }
    }
}

/// Where reports go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub json: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub print_summary: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            json: None,
            markdown: None,
            csv: None,
            print_summary: true,
        }
    }
}

/// Defaults for a `validate` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub validation: ValidationSection,
    pub output: OutputSection,
}

impl RunConfig {
    /// Loads a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validator configuration described by the `[validation]` table.
    pub fn validator_config(&self) -> ValidatorConfig {
        let v = &self.validation;
        ValidatorConfig::new()
            .with_remove_unsolvable(v.remove_unsolvable)
            .with_parallel(v.parallel)
            .with_threads(v.threads)
            .with_shard_size(v.shard_size)
    }
}
