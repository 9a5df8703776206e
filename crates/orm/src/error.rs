//! Error types for the ORM system
//!
//! Plan-time failures (ambiguous polymorphic includes, unknown associations)
//! are raised by `Criteria::includes`; execution-time failures (store errors,
//! timeouts) are raised by the materializing call.

use thiserror::Error;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// A polymorphic association was used to reach another association
    /// without naming the concrete type on the other side.
    #[error(
        "Invalid polymorphic includes: cannot include '{association}' on '{model}' through \
         polymorphic '{through}' without from_class"
    )]
    InvalidPolymorphicIncludes {
        model: String,
        association: String,
        through: String,
    },

    /// The association is not declared on the model (or any of its subtypes)
    #[error("Association '{association}' is not declared on '{model}'")]
    UnknownAssociation { model: String, association: String },

    /// The model has not been registered
    #[error("Model '{0}' is not registered")]
    UnknownModel(String),

    /// The association was read from a document before it was eager loaded
    #[error("Association '{association}' on '{model}' has not been loaded")]
    RelationshipNotLoaded { model: String, association: String },

    /// Relationship loading failed
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Document store failure
    #[error("Store error: {0}")]
    Store(String),

    /// A batched lookup did not complete in time
    #[error("Query against '{model}' timed out after {millis}ms")]
    Timeout { model: String, millis: u64 },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Query building error
    #[error("Query error: {0}")]
    Query(String),
}

impl ModelError {
    /// Returns true for errors raised while building inclusions
    pub fn is_plan_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPolymorphicIncludes { .. }
                | Self::UnknownAssociation { .. }
                | Self::UnknownModel(_)
        )
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<crate::config::ConfigError> for ModelError {
    fn from(err: crate::config::ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}
