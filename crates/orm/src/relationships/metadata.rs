//! Relationship Metadata System - Core metadata definitions for relationships

use serde::{Deserialize, Serialize};

use crate::document::ID_FIELD;
use crate::error::{ModelError, ModelResult};

/// Defines the type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// One-to-one, foreign key on the related model (hasOne)
    HasOne,
    /// One-to-many, foreign key on the related model (hasMany)
    HasMany,
    /// Many-to-one, foreign key on this model (belongsTo)
    BelongsTo,
    /// Many-to-many through an array of ids stored on this model
    ManyToMany,
    /// Polymorphic one-to-one ("as"), type tag and id on the related model
    MorphOne,
    /// Polymorphic one-to-many ("as"), type tag and id on the related model
    MorphMany,
    /// Polymorphic belongsTo, type tag and id on this model
    MorphTo,
}

impl RelationshipType {
    /// Returns true if this relationship type is polymorphic
    pub fn is_polymorphic(self) -> bool {
        matches!(self, Self::MorphOne | Self::MorphMany | Self::MorphTo)
    }

    /// Returns true if this relationship returns a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::ManyToMany | Self::MorphMany)
    }
}

/// Metadata describing one declared association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    /// The type of relationship
    pub relationship_type: RelationshipType,

    /// Name of the relationship (field name in the model)
    pub name: String,

    /// The related model; `None` for `MorphTo`, whose target is stored per document
    pub related_model: Option<String>,

    /// Field holding the reference. On this model for forward relationships,
    /// on the related model for inverse ones.
    pub foreign_key: String,

    /// Key the reference points at (defaults to "_id")
    pub local_key: String,

    /// Polymorphic configuration
    pub polymorphic_config: Option<PolymorphicConfig>,

    /// Inverse relationship name
    pub inverse: Option<String>,
}

impl RelationshipMetadata {
    /// Create a new RelationshipMetadata instance
    pub fn new(
        relationship_type: RelationshipType,
        name: impl Into<String>,
        related_model: Option<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            relationship_type,
            name: name.into(),
            related_model,
            foreign_key: foreign_key.into(),
            local_key: ID_FIELD.to_string(),
            polymorphic_config: None,
            inverse: None,
        }
    }

    pub fn belongs_to(name: &str, related_model: &str, foreign_key: &str) -> Self {
        Self::new(
            RelationshipType::BelongsTo,
            name,
            Some(related_model.to_string()),
            foreign_key,
        )
    }

    pub fn has_one(name: &str, related_model: &str, foreign_key: &str) -> Self {
        Self::new(
            RelationshipType::HasOne,
            name,
            Some(related_model.to_string()),
            foreign_key,
        )
    }

    pub fn has_many(name: &str, related_model: &str, foreign_key: &str) -> Self {
        Self::new(
            RelationshipType::HasMany,
            name,
            Some(related_model.to_string()),
            foreign_key,
        )
    }

    /// Many-to-many stored as an array of related ids in `ids_field`
    pub fn many_to_many(name: &str, related_model: &str, ids_field: &str) -> Self {
        Self::new(
            RelationshipType::ManyToMany,
            name,
            Some(related_model.to_string()),
            ids_field,
        )
    }

    /// Polymorphic belongsTo using `<name>_type` / `<name>_id`
    pub fn morph_to(name: &str) -> Self {
        let config = PolymorphicConfig::named(name);
        Self::new(RelationshipType::MorphTo, name, None, config.id_field.clone())
            .with_polymorphic(config)
    }

    /// Polymorphic hasOne where the related model refers back `as` a MorphTo
    pub fn morph_one(name: &str, related_model: &str, as_name: &str) -> Self {
        let config = PolymorphicConfig::named(as_name);
        Self::new(
            RelationshipType::MorphOne,
            name,
            Some(related_model.to_string()),
            config.id_field.clone(),
        )
        .with_polymorphic(config)
        .with_inverse(as_name.to_string())
    }

    /// Polymorphic hasMany where the related model refers back `as` a MorphTo
    pub fn morph_many(name: &str, related_model: &str, as_name: &str) -> Self {
        let config = PolymorphicConfig::named(as_name);
        Self::new(
            RelationshipType::MorphMany,
            name,
            Some(related_model.to_string()),
            config.id_field.clone(),
        )
        .with_polymorphic(config)
        .with_inverse(as_name.to_string())
    }

    /// Set polymorphic configuration
    pub fn with_polymorphic(mut self, polymorphic_config: PolymorphicConfig) -> Self {
        self.polymorphic_config = Some(polymorphic_config);
        self
    }

    /// Set the inverse relationship name
    pub fn with_inverse(mut self, inverse: String) -> Self {
        self.inverse = Some(inverse);
        self
    }

    pub fn is_polymorphic(&self) -> bool {
        self.relationship_type.is_polymorphic()
    }

    pub fn is_collection(&self) -> bool {
        self.relationship_type.is_collection()
    }

    /// The statically known target model, if any
    pub fn target_model(&self) -> Option<&str> {
        self.related_model.as_deref()
    }

    /// Validate the relationship metadata for consistency
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Configuration(
                "Relationship name cannot be empty".to_string(),
            ));
        }

        if self.foreign_key.is_empty() {
            return Err(ModelError::Configuration(format!(
                "Relationship '{}' must declare a foreign key field",
                self.name
            )));
        }

        if self.relationship_type.is_polymorphic() && self.polymorphic_config.is_none() {
            return Err(ModelError::Configuration(format!(
                "Relationship '{}' of type {:?} requires polymorphic configuration",
                self.name, self.relationship_type
            )));
        }

        match (self.relationship_type, &self.related_model) {
            (RelationshipType::MorphTo, Some(model)) => {
                return Err(ModelError::Configuration(format!(
                    "Polymorphic relationship '{}' cannot name a fixed related model '{}'",
                    self.name, model
                )));
            }
            (RelationshipType::MorphTo, None) => {}
            (_, None) => {
                return Err(ModelError::Configuration(format!(
                    "Relationship '{}' must name its related model",
                    self.name
                )));
            }
            _ => {}
        }

        if let Some(ref poly) = self.polymorphic_config {
            poly.validate()?;
        }

        Ok(())
    }
}

/// Polymorphic relationship configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolymorphicConfig {
    /// The name of the polymorphic reference (the MorphTo side's name)
    pub name: String,

    /// Field storing the concrete model name
    pub type_field: String,

    /// Field storing the referenced id
    pub id_field: String,
}

impl PolymorphicConfig {
    /// Create a new polymorphic configuration
    pub fn new(name: String, type_field: String, id_field: String) -> Self {
        Self {
            name,
            type_field,
            id_field,
        }
    }

    /// Conventional `<name>_type` / `<name>_id` fields
    pub fn named(name: &str) -> Self {
        Self::new(
            name.to_string(),
            format!("{}_type", name),
            format!("{}_id", name),
        )
    }

    /// Validate the polymorphic configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Configuration(
                "Polymorphic relationship name cannot be empty".to_string(),
            ));
        }

        if self.type_field.is_empty() || self.id_field.is_empty() {
            return Err(ModelError::Configuration(
                "Polymorphic type and id fields cannot be empty".to_string(),
            ));
        }

        if self.type_field == self.id_field {
            return Err(ModelError::Configuration(
                "Polymorphic type field and id field must be different".to_string(),
            ));
        }

        Ok(())
    }
}
