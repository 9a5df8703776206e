//! Inclusions - the declarative description of associations to eager load
//!
//! An [`InclusionSet`] keeps at most one [`Inclusion`] per
//! `(association, source)` key. Adding a duplicate merges it into the
//! existing node: a modifier is never dropped by a later generic request,
//! a later modifier replaces an earlier one, and children merge recursively.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ModelResult;
use crate::query::Criteria;
use crate::relationships::RelationshipMetadata;

/// Caller-supplied scoping applied to every batched lookup of an inclusion
pub type Modifier = Arc<dyn Fn(Criteria) -> ModelResult<Criteria> + Send + Sync>;

/// Identity of an inclusion inside a set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InclusionKey {
    pub association: String,
    pub source: Option<String>,
}

/// One requested association
#[derive(Clone)]
pub struct Inclusion {
    association_name: String,
    source_field: Option<String>,
    from_class: Option<String>,
    owner_model: String,
    metadata: RelationshipMetadata,
    modifier: Option<Modifier>,
    children: InclusionSet,
}

impl Inclusion {
    pub(crate) fn new(
        association_name: &str,
        owner_model: &str,
        metadata: RelationshipMetadata,
    ) -> Self {
        Self {
            association_name: association_name.to_string(),
            source_field: None,
            from_class: None,
            owner_model: owner_model.to_string(),
            metadata,
            modifier: None,
            children: InclusionSet::new(),
        }
    }

    pub(crate) fn with_source(mut self, source_field: Option<String>) -> Self {
        self.source_field = source_field;
        self
    }

    pub(crate) fn with_from_class(mut self, from_class: Option<String>) -> Self {
        self.from_class = from_class;
        self
    }

    pub(crate) fn with_modifier(mut self, modifier: Option<Modifier>) -> Self {
        self.modifier = modifier;
        self
    }

    pub(crate) fn with_children(mut self, children: InclusionSet) -> Self {
        self.children = children;
        self
    }

    pub fn key(&self) -> InclusionKey {
        InclusionKey {
            association: self.association_name.clone(),
            source: self.source_field.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.association_name
    }

    /// Association on the anchor whose loaded documents this inclusion runs against
    pub fn source_field(&self) -> Option<&str> {
        self.source_field.as_deref()
    }

    pub fn from_class(&self) -> Option<&str> {
        self.from_class.as_deref()
    }

    /// Model the association is declared on
    pub fn owner_model(&self) -> &str {
        &self.owner_model
    }

    pub fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }

    pub fn modifier(&self) -> Option<&Modifier> {
        self.modifier.as_ref()
    }

    pub fn has_modifier(&self) -> bool {
        self.modifier.is_some()
    }

    pub fn children(&self) -> &InclusionSet {
        &self.children
    }

    /// Loaded through another association of the anchor
    pub fn is_nested(&self) -> bool {
        self.source_field.is_some()
    }

    pub fn is_polymorphic(&self) -> bool {
        self.metadata.is_polymorphic()
    }

    /// Concrete type a direct polymorphic lookup is restricted to
    pub(crate) fn pinned_target(&self) -> Option<&str> {
        if self.is_nested() {
            None
        } else {
            self.from_class()
        }
    }

    /// This inclusion as seen from the documents of its source association
    pub(crate) fn rehomed(&self) -> Inclusion {
        Inclusion {
            source_field: None,
            from_class: None,
            ..self.clone()
        }
    }

    /// Fold a duplicate request for the same key into this node
    ///
    /// A later disambiguation replaces the owner and descriptor along with
    /// the class, so the node always routes by the class it reports.
    pub(crate) fn merge(&mut self, incoming: Inclusion) {
        if incoming.modifier.is_some() {
            self.modifier = incoming.modifier;
        }
        if incoming.from_class.is_some() {
            self.from_class = incoming.from_class;
            self.owner_model = incoming.owner_model;
            self.metadata = incoming.metadata;
        }
        self.children.merge(incoming.children);
    }
}

impl fmt::Debug for Inclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inclusion")
            .field("association_name", &self.association_name)
            .field("source_field", &self.source_field)
            .field("from_class", &self.from_class)
            .field("owner_model", &self.owner_model)
            .field("relationship_type", &self.metadata.relationship_type)
            .field("modifier", &self.modifier.as_ref().map(|_| "<fn>"))
            .field("children", &self.children)
            .finish()
    }
}

/// Ordered set of inclusions with merge-on-duplicate semantics
#[derive(Clone, Default)]
pub struct InclusionSet {
    nodes: IndexMap<InclusionKey, Inclusion>,
}

impl InclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Inclusion> {
        self.nodes.values()
    }

    pub fn first(&self) -> Option<&Inclusion> {
        self.nodes.first().map(|(_, node)| node)
    }

    pub fn last(&self) -> Option<&Inclusion> {
        self.nodes.last().map(|(_, node)| node)
    }

    pub fn to_vec(&self) -> Vec<Inclusion> {
        self.nodes.values().cloned().collect()
    }

    pub fn get(&self, association: &str, source: Option<&str>) -> Option<&Inclusion> {
        self.nodes.get(&InclusionKey {
            association: association.to_string(),
            source: source.map(str::to_string),
        })
    }

    pub fn contains(&self, association: &str, source: Option<&str>) -> bool {
        self.get(association, source).is_some()
    }

    /// Add an inclusion; a duplicate key merges into the existing node in place
    pub fn add(&mut self, inclusion: Inclusion) {
        match self.nodes.get_mut(&inclusion.key()) {
            Some(existing) => existing.merge(inclusion),
            None => {
                self.nodes.insert(inclusion.key(), inclusion);
            }
        }
    }

    /// Chaining form of [`InclusionSet::add`]
    pub fn with(mut self, inclusion: Inclusion) -> Self {
        self.add(inclusion);
        self
    }

    /// Merge every inclusion of `other` into this set
    pub fn merge(&mut self, other: InclusionSet) {
        for (_, inclusion) in other.nodes {
            self.add(inclusion);
        }
    }

    /// Inclusions loaded directly on the anchor documents
    pub fn direct(&self) -> impl Iterator<Item = &Inclusion> {
        self.iter().filter(|node| !node.is_nested())
    }

    /// Inclusions loaded through the given source association
    pub fn through<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a Inclusion> + 'a {
        self.iter()
            .filter(move |node| node.source_field() == Some(source))
    }
}

impl fmt::Debug for InclusionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.values()).finish()
    }
}
