//! Build configuration.
//!
//! Holds the process-wide default hyperparameter table consulted after a node's
//! scope chain, plus validation switches for [`Network::build`](crate::network::Network::build).

use crate::hyperparameters::DefaultTable;
use crate::tree::OptionValue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for building a network from a finalized tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Fallback hyperparameter values, consulted when no node in scope declares
    /// one. They take precedence over built-in and per-call defaults.
    pub defaults: DefaultTable,
    /// Reject local options a node's kind does not declare.
    pub strict_hyperparameters: bool,
    /// Batch axis used when no node in scope declares `batch_axis`.
    pub batch_axis: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultTable::new(),
            strict_hyperparameters: false,
            batch_axis: 0,
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry to the default table.
    pub fn with_default(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.defaults.insert(name.to_string(), value.into());
        self
    }

    pub fn with_strict_hyperparameters(mut self, strict: bool) -> Self {
        self.strict_hyperparameters = strict;
        self
    }

    pub fn with_batch_axis(mut self, axis: usize) -> Self {
        self.batch_axis = axis;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
