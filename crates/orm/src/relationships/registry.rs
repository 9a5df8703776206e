//! Relationship Registry - Runtime model and association metadata
//!
//! Models may inherit from a registered base model. Subtypes share the
//! collection of their root model and are told apart by the `_type`
//! discriminator. Associations declared on a model are visible on all of
//! its subtypes.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::metadata::RelationshipMetadata;
use crate::error::{ModelError, ModelResult};

/// Registration data for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name, also the value stored in type tags
    pub name: String,
    /// Collection the model stores in (ignored for subtypes)
    pub collection: String,
    /// Base model, for single-collection inheritance
    pub parent: Option<String>,
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            parent: None,
        }
    }

    /// A subtype stored in its base model's collection
    pub fn subtype(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: String::new(),
            parent: Some(parent.into()),
        }
    }
}

/// Thread-safe registry of models and their relationships
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    /// Map of model name -> model metadata
    models: Arc<DashMap<String, ModelMetadata>>,

    /// Map of model name -> relationship name -> metadata
    relationships: Arc<DashMap<String, HashMap<String, RelationshipMetadata>>>,
}

impl RelationshipRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model
    pub fn register_model(&self, model: ModelMetadata) -> ModelResult<()> {
        if model.name.is_empty() {
            return Err(ModelError::Configuration(
                "Model name cannot be empty".to_string(),
            ));
        }

        match &model.parent {
            Some(parent) if !self.models.contains_key(parent) => {
                return Err(ModelError::UnknownModel(parent.clone()));
            }
            None if model.collection.is_empty() => {
                return Err(ModelError::Configuration(format!(
                    "Model '{}' must name a collection",
                    model.name
                )));
            }
            _ => {}
        }

        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    /// Register a relationship for a model
    pub fn register(&self, model_name: &str, metadata: RelationshipMetadata) -> ModelResult<()> {
        if !self.models.contains_key(model_name) {
            return Err(ModelError::UnknownModel(model_name.to_string()));
        }

        metadata.validate()?;

        self.relationships
            .entry(model_name.to_string())
            .or_default()
            .insert(metadata.name.clone(), metadata);

        Ok(())
    }

    pub fn has_model(&self, model_name: &str) -> bool {
        self.models.contains_key(model_name)
    }

    pub fn model(&self, model_name: &str) -> Option<ModelMetadata> {
        self.models.get(model_name).map(|entry| entry.clone())
    }

    /// The model followed by its ancestors, nearest first
    pub fn ancestors(&self, model_name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = Some(model_name.to_string());

        while let Some(name) = current {
            if chain.contains(&name) {
                break;
            }
            current = self.models.get(&name).and_then(|m| m.parent.clone());
            chain.push(name);
        }

        chain
    }

    /// Check whether `model_name` is `base` or inherits from it
    pub fn is_kind_of(&self, model_name: &str, base: &str) -> bool {
        self.has_model(model_name) && self.ancestors(model_name).iter().any(|m| m == base)
    }

    /// The model and all of its registered subtypes, sorted by name
    pub fn descendants(&self, model_name: &str) -> Vec<String> {
        let registered: Vec<String> = self.models.iter().map(|entry| entry.key().clone()).collect();
        let mut names: Vec<String> = registered
            .into_iter()
            .filter(|name| self.is_kind_of(name, model_name))
            .collect();
        names.sort();
        names
    }

    /// Collection holding documents of this model
    pub fn collection_for(&self, model_name: &str) -> ModelResult<String> {
        let root = self
            .ancestors(model_name)
            .pop()
            .ok_or_else(|| ModelError::UnknownModel(model_name.to_string()))?;

        self.models
            .get(&root)
            .map(|m| m.collection.clone())
            .ok_or_else(|| ModelError::UnknownModel(model_name.to_string()))
    }

    /// Whether documents of this model carry a `_type` discriminator
    pub fn uses_type_tag(&self, model_name: &str) -> bool {
        let ancestors = self.ancestors(model_name);
        let root = ancestors.last().cloned().unwrap_or_default();
        ancestors.len() > 1 || self.descendants(&root).len() > 1
    }

    /// Get relationship metadata declared on the model or inherited from an ancestor
    pub fn get(&self, model_name: &str, relationship_name: &str) -> Option<RelationshipMetadata> {
        self.ancestors(model_name).iter().find_map(|model| {
            self.relationships
                .get(model)
                .and_then(|relationships| relationships.get(relationship_name).cloned())
        })
    }

    /// Check if a relationship is visible on the model
    pub fn has_relationship(&self, model_name: &str, relationship_name: &str) -> bool {
        self.get(model_name, relationship_name).is_some()
    }

    /// Get all relationship names declared directly on a model
    pub fn get_relationship_names(&self, model_name: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .relationships
            .get(model_name)
            .map(|relationships| relationships.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Subtypes of `base` (including `base`) on which the relationship is visible
    pub fn subtypes_declaring(
        &self,
        base: &str,
        relationship_name: &str,
    ) -> Vec<(String, RelationshipMetadata)> {
        self.descendants(base)
            .into_iter()
            .filter_map(|model| {
                self.get(&model, relationship_name)
                    .map(|metadata| (model, metadata))
            })
            .collect()
    }

    /// Resolve an association for the model, scanning subtypes when the
    /// model itself does not declare it
    pub fn resolve(
        &self,
        model_name: &str,
        relationship_name: &str,
    ) -> ModelResult<(String, RelationshipMetadata)> {
        if !self.has_model(model_name) {
            return Err(ModelError::UnknownModel(model_name.to_string()));
        }

        if let Some(metadata) = self.get(model_name, relationship_name) {
            return Ok((model_name.to_string(), metadata));
        }

        self.subtypes_declaring(model_name, relationship_name)
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::UnknownAssociation {
                model: model_name.to_string(),
                association: relationship_name.to_string(),
            })
    }

    /// Clear all registered models and relationships
    pub fn clear(&self) {
        self.models.clear();
        self.relationships.clear();
    }
}
