//! Query Builder WITH Methods - declaring eager loaded associations
//!
//! `includes` resolves the association against the registry right away, so
//! every plan-time failure surfaces from the call itself and never from
//! materialization.

use std::fmt;
use std::sync::Arc;

use super::builder::Criteria;
use crate::error::{ModelError, ModelResult};
use crate::loading::{Inclusion, InclusionSet, Modifier};
use crate::relationships::{RelationshipMetadata, RelationshipType};

/// Options accepted by [`Criteria::includes`]
#[derive(Clone, Default)]
pub struct IncludeOptions {
    from: Option<String>,
    from_class: Option<String>,
    with: Option<Modifier>,
}

impl IncludeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the association on the documents of another association of the anchor
    pub fn from(mut self, source: &str) -> Self {
        self.from = Some(source.to_string());
        self
    }

    /// Name the concrete model on the far side of a polymorphic association
    pub fn from_class(mut self, model: &str) -> Self {
        self.from_class = Some(model.to_string());
        self
    }

    /// Scope the batched lookups; inclusions declared on the scope become nested
    pub fn with<F>(mut self, modifier: F) -> Self
    where
        F: Fn(Criteria) -> ModelResult<Criteria> + Send + Sync + 'static,
    {
        self.with = Some(Arc::new(modifier));
        self
    }
}

impl fmt::Debug for IncludeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeOptions")
            .field("from", &self.from)
            .field("from_class", &self.from_class)
            .field("with", &self.with.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Association resolved for an inclusion request
struct Resolved {
    owner: String,
    metadata: RelationshipMetadata,
    target: Option<String>,
}

impl Criteria {
    /// Eager load an association with default options
    pub fn include(self, name: &str) -> ModelResult<Self> {
        self.includes(name, IncludeOptions::default())
    }

    /// Eager load an association
    ///
    /// Fails with [`ModelError::InvalidPolymorphicIncludes`] when `from`
    /// names a polymorphic association and no `from_class` says which model
    /// declares `name`.
    pub fn includes(mut self, name: &str, options: IncludeOptions) -> ModelResult<Self> {
        if !self.registry.has_model(&self.model) {
            return Err(ModelError::UnknownModel(self.model.clone()));
        }
        if let Some(class) = options.from_class.as_deref() {
            if !self.registry.has_model(class) {
                return Err(ModelError::UnknownModel(class.to_string()));
            }
        }

        let resolved = match options.from.as_deref() {
            Some(source) => self.resolve_through(name, source, options.from_class.as_deref())?,
            None => self.resolve_direct(name, options.from_class.as_deref())?,
        };

        let children = match (&options.with, &resolved.target) {
            (Some(modifier), Some(target)) => {
                modifier(Criteria::new(self.registry.clone(), target))?.into_inclusions()
            }
            _ => InclusionSet::new(),
        };

        let node = Inclusion::new(name, &resolved.owner, resolved.metadata)
            .with_source(options.from.clone())
            .with_from_class(options.from_class)
            .with_modifier(options.with)
            .with_children(children);
        self.inclusions.add(node);

        if let Some(source) = options.from {
            let (declaring, metadata) = self.registry.resolve(&self.model, &source)?;
            self.inclusions
                .add(Inclusion::new(&source, &declaring, metadata));
        }

        Ok(self)
    }

    fn resolve_direct(&self, name: &str, from_class: Option<&str>) -> ModelResult<Resolved> {
        let (owner, metadata) = self.registry.resolve(&self.model, name)?;

        let target = match (metadata.relationship_type, from_class) {
            (RelationshipType::MorphTo, pinned) => pinned.map(str::to_string),
            (_, Some(class)) => {
                let related = metadata.target_model().unwrap_or_default();
                self.ensure_compatible(class, related)?;
                metadata.related_model.clone()
            }
            (_, None) => metadata.related_model.clone(),
        };

        Ok(Resolved {
            owner,
            metadata,
            target,
        })
    }

    fn resolve_through(
        &self,
        name: &str,
        source: &str,
        from_class: Option<&str>,
    ) -> ModelResult<Resolved> {
        let (_, source_metadata) = self.registry.resolve(&self.model, source)?;

        let owner = match (from_class, source_metadata.target_model()) {
            (Some(class), Some(related)) => {
                self.ensure_compatible(class, related)?;
                class.to_string()
            }
            (Some(class), None) => class.to_string(),
            (None, Some(related)) => related.to_string(),
            (None, None) => {
                return Err(ModelError::InvalidPolymorphicIncludes {
                    model: self.model.clone(),
                    association: name.to_string(),
                    through: source.to_string(),
                })
            }
        };

        let (owner, metadata) = self.registry.resolve(&owner, name)?;
        let target = metadata.related_model.clone();

        Ok(Resolved {
            owner,
            metadata,
            target,
        })
    }

    fn ensure_compatible(&self, class: &str, related: &str) -> ModelResult<()> {
        if self.registry.is_kind_of(class, related) || self.registry.is_kind_of(related, class) {
            Ok(())
        } else {
            Err(ModelError::Query(format!(
                "from_class '{}' is not related to '{}'",
                class, related
            )))
        }
    }
}
