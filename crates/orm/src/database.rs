//! Database handle - binds the model registry, a document store and configuration

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::backends::DocumentStore;
use crate::config::OrmConfig;
use crate::document::{Document, ID_FIELD, TYPE_FIELD};
use crate::error::{ModelError, ModelResult};
use crate::query::Criteria;
use crate::relationships::RelationshipRegistry;

/// Entry point for querying and seeding documents
#[derive(Clone)]
pub struct Database {
    registry: Arc<RelationshipRegistry>,
    store: Arc<dyn DocumentStore>,
    config: OrmConfig,
}

impl Database {
    /// Create a database handle, validating the configuration
    pub fn new(
        registry: Arc<RelationshipRegistry>,
        store: Arc<dyn DocumentStore>,
        config: OrmConfig,
    ) -> ModelResult<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            store,
            config,
        })
    }

    pub fn registry(&self) -> &Arc<RelationshipRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Start a criteria over a model
    pub fn criteria(&self, model: &str) -> Criteria {
        Criteria::new(self.registry.clone(), model)
    }

    /// Insert a document of a model
    ///
    /// A missing `_id` is generated. Models sharing a collection get their
    /// `_type` tag set to the concrete model.
    pub async fn create(&self, model: &str, attributes: Value) -> ModelResult<Document> {
        let Value::Object(mut record) = attributes else {
            return Err(ModelError::Serialization(format!(
                "Attributes for '{}' must be a JSON object",
                model
            )));
        };

        let collection = self.registry.collection_for(model)?;

        if !record.get(ID_FIELD).is_some_and(|id| !id.is_null()) {
            record.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        if self.registry.uses_type_tag(model) {
            record.insert(TYPE_FIELD.to_string(), Value::String(model.to_string()));
        }

        self.store.insert(&collection, record.clone()).await?;

        tracing::debug!(model, collection = %collection, "created document");
        Ok(Document::new(model, record))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryStore;
    use crate::config::EagerLoadConfig;
    use crate::relationships::ModelMetadata;
    use serde_json::json;

    fn database(store: Arc<MemoryStore>) -> Database {
        let registry = RelationshipRegistry::new();
        registry.register_model(ModelMetadata::new("Band", "bands")).unwrap();
        registry.register_model(ModelMetadata::new("PolyRelated", "poly_relateds")).unwrap();
        registry.register_model(ModelMetadata::subtype("PolyTwo", "PolyRelated")).unwrap();
        Database::new(Arc::new(registry), store, OrmConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_type_tag() {
        let store = Arc::new(MemoryStore::default());
        let db = database(store.clone());

        let band = db.create("Band", json!({"name": "Jethro Tull"})).await.unwrap();
        assert!(band.get_str(ID_FIELD).is_some());
        assert!(band.get(TYPE_FIELD).is_none());

        let two = db.create("PolyTwo", json!({"_id": "r1"})).await.unwrap();
        assert_eq!(two.get_str(ID_FIELD), Some("r1"));
        assert_eq!(two.get_str(TYPE_FIELD), Some("PolyTwo"));
        assert_eq!(store.count("poly_relateds"), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_non_objects_and_unknown_models() {
        let db = database(Arc::new(MemoryStore::default()));

        assert!(matches!(
            db.create("Band", json!(["not", "an", "object"])).await,
            Err(ModelError::Serialization(_))
        ));
        assert!(matches!(
            db.create("Ghost", json!({})).await,
            Err(ModelError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_new_validates_config() {
        let config = OrmConfig {
            eager_load: EagerLoadConfig {
                max_depth: 0,
                ..EagerLoadConfig::default()
            },
            ..OrmConfig::default()
        };
        let result = Database::new(
            Arc::new(RelationshipRegistry::new()),
            Arc::new(MemoryStore::default()),
            config,
        );
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }
}
