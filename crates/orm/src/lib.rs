//! # eagerdoc-orm: Eager loading for document models
//!
//! Criteria over document collections with batched, polymorphic-aware
//! association includes. Materializing a criteria issues one query per
//! concrete target type of each included association, independent of how
//! many parent documents were loaded.
//!
//! ```ignore
//! let artists = db
//!     .criteria("Artist")
//!     .includes("musicians", IncludeOptions::new().from("associated_act").from_class("Band"))?
//!     .includes("associated_act", IncludeOptions::new().with(|bands| bands.include("albums")))?
//!     .entries(&db)
//!     .await?;
//! ```

pub mod backends;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod loading;
pub mod query;
pub mod relationships;

// Re-export core traits and types
pub use backends::{DocumentStore, MemoryStore, Query};
pub use config::{ConfigError, EagerLoadConfig, OrmConfig, StoreConfig};
pub use database::Database;
pub use document::{Document, LoadedRelation, Record, ID_FIELD, TYPE_FIELD};
pub use error::*;
pub use loading::{EagerLoader, Inclusion, InclusionKey, InclusionSet, Modifier};
pub use query::{Criteria, IncludeOptions, OrderDirection, QueryOperator, WhereCondition};
pub use relationships::{
    ModelMetadata, PolymorphicConfig, RelationshipMetadata, RelationshipRegistry, RelationshipType,
};
