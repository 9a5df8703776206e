//! Query Execution - materializing criteria into documents
//!
//! Materialization is the only point where eager loading runs: the base
//! query executes, records become documents, then the inclusion set is
//! resolved against that batch.

use std::future::Future;
use std::pin::Pin;

use super::builder::Criteria;
use crate::database::Database;
use crate::document::{Document, Record, TYPE_FIELD};
use crate::error::{ModelError, ModelResult};
use crate::loading::EagerLoader;

/// Boxed materialization future, so nested lookups can recurse
pub(crate) type LoadFuture<'a> = Pin<Box<dyn Future<Output = ModelResult<Vec<Document>>> + Send + 'a>>;

impl Criteria {
    /// Execute the query and eager load every included association
    pub async fn entries(&self, db: &Database) -> ModelResult<Vec<Document>> {
        self.load(db, 0).await
    }

    /// Execute the query for its first document
    pub async fn first(&self, db: &Database) -> ModelResult<Option<Document>> {
        let documents = self.clone().limit(1).entries(db).await?;
        Ok(documents.into_iter().next())
    }

    pub(crate) fn load<'a>(&'a self, db: &'a Database, depth: usize) -> LoadFuture<'a> {
        Box::pin(async move {
            let query = self.to_query()?;

            let records = match db.config().eager_load.query_timeout() {
                Some(limit) => tokio::time::timeout(limit, db.store().find(&query))
                    .await
                    .map_err(|_| ModelError::Timeout {
                        model: self.model.clone(),
                        millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })??,
                None => db.store().find(&query).await?,
            };

            tracing::debug!(
                model = %self.model,
                collection = %query.collection,
                records = records.len(),
                depth,
                "materialized criteria"
            );

            let mut documents: Vec<Document> = records
                .into_iter()
                .map(|record| self.materialize(record))
                .collect();

            EagerLoader::new(db)
                .load(&self.model, &mut documents, &self.inclusions, depth)
                .await?;

            Ok(documents)
        })
    }

    /// The concrete model comes from the type tag when it names a registered
    /// subtype of the criteria model
    fn materialize(&self, record: Record) -> Document {
        let model = record
            .get(TYPE_FIELD)
            .and_then(|tag| tag.as_str())
            .filter(|tag| self.registry.is_kind_of(tag, &self.model))
            .map(str::to_string)
            .unwrap_or_else(|| self.model.clone());

        Document::new(model, record)
    }
}
