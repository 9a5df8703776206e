//! Lookup plans - the concrete targets of one inclusion over a parent batch
//!
//! A node resolves to one [`LookupPlan`] per distinct target signature
//! actually present in the batch: per type tag for `MorphTo`, per concrete
//! parent model for `MorphOne`/`MorphMany`, a single plan otherwise. A plan
//! only exists once it holds a key, so an empty plan never issues a query.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use super::inclusion::Inclusion;
use crate::document::{lookup_key, Document, LoadedRelation, LookupKey, ID_FIELD};
use crate::error::{ModelError, ModelResult};
use crate::relationships::{RelationshipMetadata, RelationshipRegistry, RelationshipType};

/// How a parent document names the children it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParentKey {
    /// The parent's own key; children point back at it
    Identity(String),
    /// A single reference stored on the parent
    Field(String),
    /// An array of references stored on the parent
    Array(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    fn of(metadata: &RelationshipMetadata) -> Self {
        if metadata.is_collection() {
            Self::Many
        } else {
            Self::One
        }
    }

    fn unmatched(self) -> LoadedRelation {
        match self {
            Self::One => LoadedRelation::One(None),
            Self::Many => LoadedRelation::Many(Vec::new()),
        }
    }
}

/// What a batched lookup queries for
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LookupTarget {
    pub model: String,
    /// Field on the child matched against the keys
    pub lookup_field: String,
    /// Extra `field == value` restriction on the child
    pub discriminator: Option<(String, String)>,
    pub parent_key: ParentKey,
    pub cardinality: Cardinality,
}

/// One batched query and the parents it serves
#[derive(Debug, Clone)]
pub(crate) struct LookupPlan {
    pub target: LookupTarget,
    /// Canonical key -> original value, in first-seen order
    pub keys: IndexMap<LookupKey, Value>,
    /// Indices into the parent batch
    pub parents: Vec<usize>,
}

impl LookupPlan {
    pub fn values(&self) -> Vec<Value> {
        self.keys.values().cloned().collect()
    }
}

/// Every lookup needed to resolve one inclusion over a parent batch
#[derive(Debug, Default)]
pub(crate) struct NodePlan {
    pub lookups: Vec<LookupPlan>,
    /// Parents that declare the association, with the slot shape they receive
    pub declaring: Vec<(usize, Cardinality)>,
}

impl NodePlan {
    /// Plan the lookups for `node` over `parents`, anchored at `anchor`
    pub fn build(
        registry: &RelationshipRegistry,
        anchor: &str,
        parents: &[Document],
        node: &Inclusion,
    ) -> ModelResult<Self> {
        let mut plan = NodePlan::default();

        for (index, parent) in parents.iter().enumerate() {
            let Some(metadata) = registry.get(parent.model(), node.name()) else {
                continue;
            };
            plan.declaring.push((index, Cardinality::of(&metadata)));
            plan.add_parent(registry, index, parent, &metadata, node)?;
        }

        if plan.declaring.is_empty()
            && !parents.is_empty()
            && registry.subtypes_declaring(anchor, node.name()).is_empty()
        {
            return Err(ModelError::UnknownAssociation {
                model: anchor.to_string(),
                association: node.name().to_string(),
            });
        }

        Ok(plan)
    }

    fn add_parent(
        &mut self,
        registry: &RelationshipRegistry,
        index: usize,
        parent: &Document,
        metadata: &RelationshipMetadata,
        node: &Inclusion,
    ) -> ModelResult<()> {
        let cardinality = Cardinality::of(metadata);
        let related = || {
            metadata.related_model.clone().ok_or_else(|| {
                ModelError::Relationship(format!(
                    "Association '{}' on '{}' has no related model",
                    metadata.name,
                    parent.model()
                ))
            })
        };

        match metadata.relationship_type {
            RelationshipType::BelongsTo => {
                let target = LookupTarget {
                    model: related()?,
                    lookup_field: metadata.local_key.clone(),
                    discriminator: None,
                    parent_key: ParentKey::Field(metadata.foreign_key.clone()),
                    cardinality,
                };
                self.add_keys(target, index, parent.get(&metadata.foreign_key).into_iter());
            }
            RelationshipType::MorphTo => {
                let Some(model) = self.morph_target(registry, parent, metadata, node) else {
                    return Ok(());
                };
                let target = LookupTarget {
                    model,
                    lookup_field: ID_FIELD.to_string(),
                    discriminator: None,
                    parent_key: ParentKey::Field(metadata.foreign_key.clone()),
                    cardinality,
                };
                self.add_keys(target, index, parent.get(&metadata.foreign_key).into_iter());
            }
            RelationshipType::HasOne | RelationshipType::HasMany => {
                let target = LookupTarget {
                    model: related()?,
                    lookup_field: metadata.foreign_key.clone(),
                    discriminator: None,
                    parent_key: ParentKey::Identity(metadata.local_key.clone()),
                    cardinality,
                };
                self.add_keys(target, index, parent.get(&metadata.local_key).into_iter());
            }
            RelationshipType::MorphOne | RelationshipType::MorphMany => {
                let type_field = metadata
                    .polymorphic_config
                    .as_ref()
                    .map(|config| config.type_field.clone())
                    .ok_or_else(|| {
                        ModelError::Relationship(format!(
                            "Association '{}' has no polymorphic configuration",
                            metadata.name
                        ))
                    })?;
                let target = LookupTarget {
                    model: related()?,
                    lookup_field: metadata.foreign_key.clone(),
                    discriminator: Some((type_field, parent.model().to_string())),
                    parent_key: ParentKey::Identity(metadata.local_key.clone()),
                    cardinality,
                };
                self.add_keys(target, index, parent.get(&metadata.local_key).into_iter());
            }
            RelationshipType::ManyToMany => {
                let target = LookupTarget {
                    model: related()?,
                    lookup_field: metadata.local_key.clone(),
                    discriminator: None,
                    parent_key: ParentKey::Array(metadata.foreign_key.clone()),
                    cardinality,
                };
                let ids = parent
                    .get(&metadata.foreign_key)
                    .and_then(Value::as_array)
                    .map(|ids| ids.iter())
                    .into_iter()
                    .flatten();
                self.add_keys(target, index, ids);
            }
        }

        Ok(())
    }

    /// Concrete model named by a parent's type tag, honoring a pinned class
    fn morph_target(
        &self,
        registry: &RelationshipRegistry,
        parent: &Document,
        metadata: &RelationshipMetadata,
        node: &Inclusion,
    ) -> Option<String> {
        let type_field = &metadata.polymorphic_config.as_ref()?.type_field;
        let tag = parent.get_str(type_field).filter(|tag| !tag.is_empty())?;

        if !registry.has_model(tag) {
            tracing::warn!(
                model = %parent.model(),
                association = %metadata.name,
                tag,
                "type tag names an unregistered model, leaving association empty"
            );
            return None;
        }

        match node.pinned_target() {
            Some(pinned) if registry.is_kind_of(tag, pinned) => Some(pinned.to_string()),
            Some(_) => None,
            None => Some(tag.to_string()),
        }
    }

    fn add_keys<'v>(
        &mut self,
        target: LookupTarget,
        index: usize,
        values: impl Iterator<Item = &'v Value>,
    ) {
        let keys: Vec<(LookupKey, Value)> = values
            .filter_map(|value| lookup_key(value).map(|key| (key, value.clone())))
            .collect();
        if keys.is_empty() {
            return;
        }

        let position = match self.lookups.iter().position(|plan| plan.target == target) {
            Some(position) => position,
            None => {
                self.lookups.push(LookupPlan {
                    target,
                    keys: IndexMap::new(),
                    parents: Vec::new(),
                });
                self.lookups.len() - 1
            }
        };

        let plan = &mut self.lookups[position];
        for (key, value) in keys {
            plan.keys.entry(key).or_insert(value);
        }
        plan.parents.push(index);
    }

    /// Write the loaded children into every declaring parent's slot
    ///
    /// `results` holds the children of each lookup, in lookup order.
    pub fn assign(&self, parents: &mut [Document], name: &str, results: &[Vec<Document>]) {
        for &(index, cardinality) in &self.declaring {
            parents[index].set_relation(name, cardinality.unmatched());
        }

        for (plan, children) in self.lookups.iter().zip(results) {
            let mut by_key: HashMap<LookupKey, Vec<&Document>> = HashMap::new();
            for child in children {
                if let Some(key) = child.get(&plan.target.lookup_field).and_then(lookup_key) {
                    by_key.entry(key).or_default().push(child);
                }
            }

            for &index in &plan.parents {
                let matched = matches_for(&parents[index], &plan.target.parent_key, &by_key);
                let relation = match plan.target.cardinality {
                    Cardinality::One => {
                        LoadedRelation::One(matched.into_iter().next().map(|doc| Box::new(doc.clone())))
                    }
                    Cardinality::Many => {
                        LoadedRelation::Many(matched.into_iter().cloned().collect())
                    }
                };
                parents[index].set_relation(name, relation);
            }
        }
    }
}

/// Children owned by one parent, in the parent's reference order
fn matches_for<'c>(
    parent: &Document,
    parent_key: &ParentKey,
    by_key: &HashMap<LookupKey, Vec<&'c Document>>,
) -> Vec<&'c Document> {
    let lookup = |value: &Value| {
        lookup_key(value)
            .and_then(|key| by_key.get(&key))
            .cloned()
            .unwrap_or_default()
    };

    match parent_key {
        ParentKey::Identity(field) | ParentKey::Field(field) => {
            parent.get(field).map(lookup).unwrap_or_default()
        }
        ParentKey::Array(field) => parent
            .get(field)
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| lookup(id).into_iter().next())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Record;
    use crate::relationships::ModelMetadata;
    use serde_json::json;

    fn registry() -> RelationshipRegistry {
        let registry = RelationshipRegistry::new();
        for (model, collection) in [("Artist", "artists"), ("Band", "bands"), ("Album", "albums")] {
            registry.register_model(ModelMetadata::new(model, collection)).unwrap();
        }
        registry.register_model(ModelMetadata::new("PolyMain", "poly_mains")).unwrap();
        registry.register_model(ModelMetadata::new("PolyRelated", "poly_relateds")).unwrap();
        registry.register_model(ModelMetadata::subtype("PolyTwo", "PolyRelated")).unwrap();
        registry.register_model(ModelMetadata::subtype("PolyThree", "PolyRelated")).unwrap();

        registry.register("Artist", RelationshipMetadata::morph_to("associated_act")).unwrap();
        registry
            .register("Band", RelationshipMetadata::many_to_many("musicians", "Artist", "musician_ids"))
            .unwrap();
        registry
            .register("Band", RelationshipMetadata::morph_many("albums", "Album", "owner"))
            .unwrap();
        registry.register("PolyMain", RelationshipMetadata::morph_to("related")).unwrap();
        for subtype in ["PolyTwo", "PolyThree"] {
            registry
                .register(subtype, RelationshipMetadata::morph_one("parent", "PolyMain", "related"))
                .unwrap();
        }
        registry
    }

    fn doc(model: &str, value: Value) -> Document {
        let record: Record = match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        };
        Document::new(model, record)
    }

    fn node(registry: &RelationshipRegistry, model: &str, name: &str) -> Inclusion {
        let (owner, metadata) = registry.resolve(model, name).unwrap();
        Inclusion::new(name, &owner, metadata)
    }

    #[test]
    fn test_morph_to_plans_one_lookup_per_type_tag() {
        let registry = registry();
        let mains = vec![
            doc("PolyMain", json!({"_id": "m1", "related_type": "PolyTwo", "related_id": "r1"})),
            doc("PolyMain", json!({"_id": "m2", "related_type": "PolyThree", "related_id": "r2"})),
            doc("PolyMain", json!({"_id": "m3", "related_type": "PolyTwo", "related_id": "r3"})),
            doc("PolyMain", json!({"_id": "m4", "related_type": null, "related_id": null})),
        ];

        let plan = NodePlan::build(&registry, "PolyMain", &mains, &node(&registry, "PolyMain", "related")).unwrap();

        assert_eq!(plan.declaring.len(), 4);
        let targets: Vec<&str> = plan.lookups.iter().map(|l| l.target.model.as_str()).collect();
        assert_eq!(targets, vec!["PolyTwo", "PolyThree"]);
        assert_eq!(plan.lookups[0].values(), vec![json!("r1"), json!("r3")]);
        assert_eq!(plan.lookups[0].parents, vec![0, 2]);
    }

    #[test]
    fn test_pinned_morph_to_skips_other_tags() {
        let registry = registry();
        let mains = vec![
            doc("PolyMain", json!({"related_type": "PolyTwo", "related_id": "r1"})),
            doc("PolyMain", json!({"related_type": "PolyThree", "related_id": "r2"})),
        ];
        let pinned = node(&registry, "PolyMain", "related").with_from_class(Some("PolyTwo".to_string()));

        let plan = NodePlan::build(&registry, "PolyMain", &mains, &pinned).unwrap();
        assert_eq!(plan.lookups.len(), 1);
        assert_eq!(plan.lookups[0].parents, vec![0]);
        assert_eq!(plan.declaring.len(), 2);
    }

    #[test]
    fn test_unregistered_tags_plan_nothing() {
        let registry = registry();
        let mains = vec![doc("PolyMain", json!({"related_type": "PolyNine", "related_id": "r9"}))];

        let plan = NodePlan::build(&registry, "PolyMain", &mains, &node(&registry, "PolyMain", "related")).unwrap();
        assert!(plan.lookups.is_empty());
        assert_eq!(plan.declaring.len(), 1);
    }

    #[test]
    fn test_morph_one_plans_per_concrete_parent() {
        let registry = registry();
        let related = vec![
            doc("PolyTwo", json!({"_id": "r1"})),
            doc("PolyThree", json!({"_id": "r2"})),
            doc("PolyRelated", json!({"_id": "r3"})),
        ];

        let plan = NodePlan::build(&registry, "PolyRelated", &related, &node(&registry, "PolyRelated", "parent")).unwrap();

        assert_eq!(plan.lookups.len(), 2);
        assert_eq!(
            plan.lookups[0].target.discriminator,
            Some(("related_type".to_string(), "PolyTwo".to_string()))
        );
        assert_eq!(plan.lookups[1].target.lookup_field, "related_id");
        assert_eq!(plan.declaring.len(), 2);
    }

    #[test]
    fn test_many_to_many_skips_blank_ids() {
        let registry = registry();
        let bands = vec![
            doc("Band", json!({"_id": "b1", "musician_ids": [null, ""]})),
            doc("Band", json!({"_id": "b2"})),
        ];

        let plan = NodePlan::build(&registry, "Band", &bands, &node(&registry, "Band", "musicians")).unwrap();
        assert!(plan.lookups.is_empty());
        assert_eq!(plan.declaring, vec![(0, Cardinality::Many), (1, Cardinality::Many)]);
    }

    #[test]
    fn test_undeclared_association_fails_fast() {
        let registry = registry();
        let artists = vec![doc("Artist", json!({"_id": "a1"}))];
        let bogus = Inclusion::new("labels", "Artist", RelationshipMetadata::has_many("labels", "Band", "artist_id"));

        assert!(matches!(
            NodePlan::build(&registry, "Artist", &artists, &bogus),
            Err(ModelError::UnknownAssociation { .. })
        ));
    }

    #[test]
    fn test_assign_matches_by_key_and_marks_unmatched() {
        let registry = registry();
        let mut mains = vec![
            doc("PolyMain", json!({"_id": "m1", "related_type": "PolyTwo", "related_id": "r1"})),
            doc("PolyMain", json!({"_id": "m2", "related_type": "PolyTwo", "related_id": "r2"})),
            doc("PolyMain", json!({"_id": "m3"})),
        ];
        let plan = NodePlan::build(&registry, "PolyMain", &mains, &node(&registry, "PolyMain", "related")).unwrap();

        let loaded = vec![vec![doc("PolyTwo", json!({"_id": "r2"}))]];
        plan.assign(&mut mains, "related", &loaded);

        assert_eq!(mains[0].one("related").unwrap(), None);
        assert_eq!(mains[1].one("related").unwrap().unwrap().get_str("_id"), Some("r2"));
        assert!(mains[2].is_loaded("related"));
        assert_eq!(mains[2].one("related").unwrap(), None);
    }

    #[test]
    fn test_assign_keeps_array_order() {
        let registry = registry();
        let mut bands = vec![doc("Band", json!({"_id": "b1", "musician_ids": ["a2", "a1", "a3"]}))];
        let plan = NodePlan::build(&registry, "Band", &bands, &node(&registry, "Band", "musicians")).unwrap();

        let loaded = vec![vec![
            doc("Artist", json!({"_id": "a1"})),
            doc("Artist", json!({"_id": "a2"})),
        ]];
        plan.assign(&mut bands, "musicians", &loaded);

        let ids: Vec<&str> = bands[0]
            .many("musicians")
            .unwrap()
            .iter()
            .filter_map(|artist| artist.get_str("_id"))
            .collect();
        assert_eq!(ids, vec!["a2", "a1"]);
    }

    #[test]
    fn test_numeric_and_string_references_do_not_cross_match() {
        let registry = registry();
        let mut bands = vec![
            doc("Band", json!({"_id": "b1", "musician_ids": [1]})),
            doc("Band", json!({"_id": "b2", "musician_ids": ["1"]})),
        ];
        let plan = NodePlan::build(&registry, "Band", &bands, &node(&registry, "Band", "musicians")).unwrap();
        assert_eq!(plan.lookups[0].values(), vec![json!(1), json!("1")]);

        let loaded = vec![vec![
            doc("Artist", json!({"_id": "1", "name": "string"})),
            doc("Artist", json!({"_id": 1, "name": "numeric"})),
        ]];
        plan.assign(&mut bands, "musicians", &loaded);

        let names = |band: &Document| -> Vec<String> {
            band.many("musicians")
                .unwrap()
                .iter()
                .filter_map(|artist| artist.get_str("name").map(str::to_string))
                .collect()
        };
        assert_eq!(names(&bands[0]), vec!["numeric"]);
        assert_eq!(names(&bands[1]), vec!["string"]);
    }
}
