//! Error types for configuration loading

use std::path::PathBuf;

use dn_core::EntityIdError;
use dn_engine::RoutingTableError;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to parse a JSON configuration body
    #[error("failed to parse configuration: {0}")]
    ParseJson(#[from] serde_json::Error),

    /// Service name is empty or not a valid slug
    #[error("invalid service name '{name}': must be a lowercase slug")]
    InvalidServiceName { name: String },

    /// Condition operator is not one of the closed set
    #[error("target '{target_id}': unknown operator '{operator}'")]
    InvalidOperator { target_id: String, operator: String },

    /// Condition reference value is neither a number nor a string
    #[error("target '{target_id}': condition on '{entity_id}' has a non-scalar value")]
    InvalidValue { target_id: String, entity_id: String },

    /// Condition entity id does not parse
    #[error("target '{target_id}': {source}")]
    InvalidEntityId {
        target_id: String,
        #[source]
        source: EntityIdError,
    },

    /// Structural table invariant violated
    #[error(transparent)]
    Table(#[from] RoutingTableError),
}
