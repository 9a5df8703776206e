//! Core Document Store Traits

use async_trait::async_trait;

use crate::document::Record;
use crate::error::ModelResult;
use crate::query::{OrderDirection, WhereCondition};

/// A query lowered for execution against a single collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection to read from
    pub collection: String,
    /// Model the query was built for (informational)
    pub model: String,
    /// Conditions, all of which must match
    pub conditions: Vec<WhereCondition>,
    pub order_by: Vec<(String, OrderDirection)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn new(collection: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            model: model.into(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Find the first condition on a field
    pub fn condition(&self, field: &str) -> Option<&WhereCondition> {
        self.conditions.iter().find(|c| c.field == field)
    }
}

/// Abstract document store driver
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute a query and return matching raw records
    ///
    /// A collection that does not exist yields no records.
    async fn find(&self, query: &Query) -> ModelResult<Vec<Record>>;

    /// Insert a raw record into a collection
    async fn insert(&self, collection: &str, record: Record) -> ModelResult<()>;
}
