//! Configuration for eager loading and the document store
//!
//! Configuration is built explicitly and handed to [`crate::Database`] and
//! the store driver at construction time.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': '{value}' (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Settings for the eager-load executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EagerLoadConfig {
    /// Maximum depth for nested inclusions
    pub max_depth: usize,
    /// Issue the lookups for distinct concrete types of one inclusion concurrently
    pub parallel_lookups: bool,
    /// Per-lookup timeout in milliseconds (None = no timeout)
    pub query_timeout_ms: Option<u64>,
}

impl Default for EagerLoadConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            parallel_lookups: true,
            query_timeout_ms: None,
        }
    }
}

impl EagerLoadConfig {
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings for the document store driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Logical database name
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: "eagerdoc".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrmConfig {
    pub eager_load: EagerLoadConfig,
    pub store: StoreConfig,
}

impl OrmConfig {
    /// Load configuration from `EAGERDOC_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(depth) = lookup("EAGERDOC_MAX_DEPTH") {
            config.eager_load.max_depth = depth.parse().map_err(|_| ConfigError::InvalidValue {
                field: "EAGERDOC_MAX_DEPTH".to_string(),
                value: depth.clone(),
                expected: "a positive integer".to_string(),
            })?;
        }

        if let Some(parallel) = lookup("EAGERDOC_PARALLEL_LOOKUPS") {
            config.eager_load.parallel_lookups = parse_bool(&parallel).ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "EAGERDOC_PARALLEL_LOOKUPS".to_string(),
                    value: parallel.clone(),
                    expected: "true or false".to_string(),
                }
            })?;
        }

        if let Some(timeout) = lookup("EAGERDOC_QUERY_TIMEOUT_MS") {
            let millis = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "EAGERDOC_QUERY_TIMEOUT_MS".to_string(),
                value: timeout.clone(),
                expected: "milliseconds".to_string(),
            })?;
            config.eager_load.query_timeout_ms = Some(millis);
        }

        if let Some(database) = lookup("EAGERDOC_DATABASE") {
            config.store.database = database;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.eager_load.max_depth == 0 {
            return Err(ConfigError::ValidationFailed {
                message: "max_depth must be greater than zero".to_string(),
            });
        }

        if self.eager_load.query_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationFailed {
                message: "query_timeout_ms must be greater than zero when set".to_string(),
            });
        }

        if self.store.database.is_empty() {
            return Err(ConfigError::ValidationFailed {
                message: "database name cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
