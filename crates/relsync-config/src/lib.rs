//! Typed runtime configuration for relsync transactions.
//!
//! Configuration is plain data: parsing and validation live here, the core
//! only reads the resulting values.


use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Default bound on how deeply sub-transactions may nest.
pub const DEFAULT_MAX_SUB_TRANSACTION_DEPTH: usize = 8;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

///
/// RelsyncConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelsyncConfig {
    /// Print `[debug]` lines for load, unload, sync and commit decisions.
    pub debug: bool,

    /// Record metrics events through the observability sink.
    pub metrics: bool,

    pub load: LoadConfig,
    pub transaction: TransactionConfig,
}

impl RelsyncConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transaction.max_sub_transaction_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transaction.max_sub_transaction_depth",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub const fn with_metrics(mut self, metrics: bool) -> Self {
        self.metrics = metrics;
        self
    }
}

///
/// LoadConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Order storage-ordered collection loads by the declared sort expression.
    pub apply_sort_expressions: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            apply_sort_expressions: true,
        }
    }
}

///
/// TransactionConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionConfig {
    pub max_sub_transaction_depth: usize,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_sub_transaction_depth: DEFAULT_MAX_SUB_TRANSACTION_DEPTH,
        }
    }
}
