//! Documents - materialized records plus their loaded associations
//!
//! The loaded-association cache lives on the document itself. Only the
//! eager loader writes to it; accessors are plain reads and never touch
//! the store.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};

/// Field holding the document identity
pub const ID_FIELD: &str = "_id";

/// Field holding the concrete model of documents stored in a shared collection
pub const TYPE_FIELD: &str = "_type";

/// Raw record as returned by a document store
pub type Record = Map<String, Value>;

/// Cached result of eager loading one association on one document
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedRelation {
    /// To-one association; `None` is the explicit "no related document" marker
    One(Option<Box<Document>>),
    /// To-many association; empty when nothing matched
    Many(Vec<Document>),
}

impl LoadedRelation {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// Number of documents held by this slot
    pub fn len(&self) -> usize {
        match self {
            Self::One(doc) => usize::from(doc.is_some()),
            Self::Many(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A materialized document of a concrete model
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    model: String,
    fields: Record,
    relations: HashMap<String, LoadedRelation>,
}

impl Document {
    /// Create a document of the given concrete model
    pub fn new(model: impl Into<String>, fields: Record) -> Self {
        Self {
            model: model.into(),
            fields,
            relations: HashMap::new(),
        }
    }

    /// Concrete model name
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD)
    }

    /// Get a raw field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Get a string field value
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    /// Get the cached slot for an association, if it was eager loaded
    pub fn relation(&self, name: &str) -> Option<&LoadedRelation> {
        self.relations.get(name)
    }

    /// Check whether an association slot has been populated
    pub fn is_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Names of all populated association slots
    pub fn loaded_relations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Read a loaded to-one association
    pub fn one(&self, name: &str) -> ModelResult<Option<&Document>> {
        match self.relations.get(name) {
            Some(LoadedRelation::One(doc)) => Ok(doc.as_deref()),
            Some(LoadedRelation::Many(_)) => Err(ModelError::Relationship(format!(
                "Association '{}' on '{}' is a collection",
                name, self.model
            ))),
            None => Err(self.not_loaded(name)),
        }
    }

    /// Read a loaded to-many association
    pub fn many(&self, name: &str) -> ModelResult<&[Document]> {
        match self.relations.get(name) {
            Some(LoadedRelation::Many(docs)) => Ok(docs),
            Some(LoadedRelation::One(_)) => Err(ModelError::Relationship(format!(
                "Association '{}' on '{}' is not a collection",
                name, self.model
            ))),
            None => Err(self.not_loaded(name)),
        }
    }

    /// Replace the cached slot for an association
    pub(crate) fn set_relation(&mut self, name: &str, relation: LoadedRelation) {
        self.relations.insert(name.to_string(), relation);
    }

    /// Serialize the document, embedding loaded associations under their names
    pub fn to_json(&self) -> Value {
        let mut object = self.fields.clone();
        for (name, relation) in &self.relations {
            let value = match relation {
                LoadedRelation::One(Some(doc)) => doc.to_json(),
                LoadedRelation::One(None) => Value::Null,
                LoadedRelation::Many(docs) => Value::Array(docs.iter().map(Document::to_json).collect()),
            };
            object.insert(name.clone(), value);
        }
        Value::Object(object)
    }

    fn not_loaded(&self, name: &str) -> ModelError {
        ModelError::RelationshipNotLoaded {
            model: self.model.clone(),
            association: name.to_string(),
        }
    }
}

/// Canonical key of a reference value
///
/// Tagged by JSON type, so the number `1` and the string `"1"` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum LookupKey {
    Str(String),
    Num(String),
}

/// Lookup key for a reference value
///
/// Null, empty strings and non-scalar values never match anything.
pub(crate) fn lookup_key(value: &Value) -> Option<LookupKey> {
    match value {
        Value::String(s) if !s.is_empty() => Some(LookupKey::Str(s.clone())),
        Value::Number(n) => Some(LookupKey::Num(n.to_string())),
        _ => None,
    }
}
