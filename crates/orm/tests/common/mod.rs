//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eagerdoc_orm::{
    Database, Document, DocumentStore, MemoryStore, ModelError, ModelMetadata, ModelResult,
    OrmConfig, Query, Record, RelationshipMetadata, RelationshipRegistry,
};
use serde_json::{json, Value};

/// Artists, bands, albums and songs
///
/// An artist's `associated_act` is polymorphic; bands own albums `as` owner.
pub fn music_registry() -> Arc<RelationshipRegistry> {
    let registry = RelationshipRegistry::new();
    for (model, collection) in [
        ("Artist", "artists"),
        ("Band", "bands"),
        ("Album", "albums"),
        ("Song", "songs"),
        ("Lyrics", "lyrics"),
    ] {
        registry
            .register_model(ModelMetadata::new(model, collection))
            .unwrap();
    }

    let declare = |model: &str, metadata: RelationshipMetadata| {
        registry.register(model, metadata).unwrap();
    };
    declare("Artist", RelationshipMetadata::morph_to("associated_act"));
    declare(
        "Band",
        RelationshipMetadata::many_to_many("musicians", "Artist", "musician_ids"),
    );
    declare("Band", RelationshipMetadata::morph_many("albums", "Album", "owner"));
    declare("Album", RelationshipMetadata::morph_to("owner"));
    declare("Album", RelationshipMetadata::has_many("songs", "Song", "album_id"));
    declare("Song", RelationshipMetadata::belongs_to("album", "Album", "album_id"));
    declare("Song", RelationshipMetadata::has_one("lyrics", "Lyrics", "song_id"));

    Arc::new(registry)
}

/// A polymorphic belongs-to whose targets are two subtypes sharing a collection
pub fn poly_registry() -> Arc<RelationshipRegistry> {
    let registry = RelationshipRegistry::new();
    registry
        .register_model(ModelMetadata::new("PolyMain", "poly_mains"))
        .unwrap();
    registry
        .register_model(ModelMetadata::new("PolyRelated", "poly_relateds"))
        .unwrap();
    registry
        .register_model(ModelMetadata::subtype("PolyTwo", "PolyRelated"))
        .unwrap();
    registry
        .register_model(ModelMetadata::subtype("PolyThree", "PolyRelated"))
        .unwrap();

    registry
        .register("PolyMain", RelationshipMetadata::morph_to("related"))
        .unwrap();
    for subtype in ["PolyTwo", "PolyThree"] {
        registry
            .register(
                subtype,
                RelationshipMetadata::morph_one("parent", "PolyMain", "related"),
            )
            .unwrap();
    }

    Arc::new(registry)
}

pub fn database(registry: Arc<RelationshipRegistry>, store: Arc<dyn DocumentStore>) -> Database {
    database_with(registry, store, OrmConfig::default())
}

pub fn database_with(
    registry: Arc<RelationshipRegistry>,
    store: Arc<dyn DocumentStore>,
    config: OrmConfig,
) -> Database {
    Database::new(registry, store, config).unwrap()
}

/// Polymorphic reference fields pointing at `target`
pub fn reference(name: &str, target: &Document) -> Value {
    let mut fields = Record::new();
    fields.insert(format!("{}_type", name), json!(target.model()));
    fields.insert(
        format!("{}_id", name),
        target.id().cloned().unwrap_or(Value::Null),
    );
    Value::Object(fields)
}

/// Merge two JSON objects, `extra` winning
pub fn with_fields(base: Value, extra: Value) -> Value {
    match (base, extra) {
        (Value::Object(mut base), Value::Object(extra)) => {
            base.extend(extra);
            Value::Object(base)
        }
        (base, _) => base,
    }
}

/// Bands, artists, albums and songs of the "multiple inclusions through
/// polymorphic associations" dataset
pub struct MusicFixture {
    pub pink_floyd: Document,
    pub jethro: Document,
    pub wish_you_were_here: Document,
    pub stand_up: Document,
}

pub async fn seed_music(db: &Database) -> MusicFixture {
    let pink_floyd = db
        .create("Band", json!({"name": "Pink Floyd", "musician_ids": [null, ""]}))
        .await
        .unwrap();
    let jethro = db
        .create("Band", json!({"name": "Jethro Tull"}))
        .await
        .unwrap();

    db.create(
        "Artist",
        with_fields(
            json!({"name": "David Gilmour"}),
            reference("associated_act", &pink_floyd),
        ),
    )
    .await
    .unwrap();

    let album = |name: &str, release: i64, owner: &Document| {
        with_fields(
            json!({"name": name, "release": release}),
            reference("owner", owner),
        )
    };

    let wish_you_were_here = db
        .create("Album", album("Wish You Were Here", 1975, &pink_floyd))
        .await
        .unwrap();
    db.create("Album", album("The Dark Side of the Moon", 1973, &pink_floyd))
        .await
        .unwrap();

    db.create(
        "Artist",
        with_fields(
            json!({"name": "Ian Anderson"}),
            reference("associated_act", &jethro),
        ),
    )
    .await
    .unwrap();

    let stand_up = db
        .create("Album", album("Stand Up", 1969, &jethro))
        .await
        .unwrap();
    db.create("Album", album("Aqualung", 1971, &jethro))
        .await
        .unwrap();

    db.create(
        "Song",
        json!({"name": "Shine On", "album_id": wish_you_were_here.id()}),
    )
    .await
    .unwrap();
    db.create(
        "Song",
        json!({"name": "We Used to Know", "album_id": stand_up.id()}),
    )
    .await
    .unwrap();

    MusicFixture {
        pink_floyd,
        jethro,
        wish_you_were_here,
        stand_up,
    }
}

/// One PolyMain per subtype, each pointing at a fresh related document
pub async fn seed_poly(db: &Database) -> (Document, Document) {
    let two = db.create("PolyTwo", json!({})).await.unwrap();
    let three = db.create("PolyThree", json!({})).await.unwrap();

    db.create("PolyMain", reference("related", &two))
        .await
        .unwrap();
    db.create("PolyMain", reference("related", &three))
        .await
        .unwrap();

    (two, three)
}

pub fn names(documents: &[Document]) -> Vec<&str> {
    documents
        .iter()
        .filter_map(|document| document.get_str("name"))
        .collect()
}

/// Store wrapper that fails or stalls lookups against one collection
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing: Option<String>,
    stalled: Option<(String, Duration)>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing: None,
            stalled: None,
        }
    }

    pub fn failing_on(mut self, collection: &str) -> Self {
        self.failing = Some(collection.to_string());
        self
    }

    pub fn stalling_on(mut self, collection: &str, delay: Duration) -> Self {
        self.stalled = Some((collection.to_string(), delay));
        self
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn find(&self, query: &Query) -> ModelResult<Vec<Record>> {
        if self.failing.as_deref() == Some(query.collection.as_str()) {
            return Err(ModelError::Store(format!(
                "operation failure on '{}'",
                query.collection
            )));
        }
        if let Some((collection, delay)) = &self.stalled {
            if collection == &query.collection {
                tokio::time::sleep(*delay).await;
            }
        }
        self.inner.find(query).await
    }

    async fn insert(&self, collection: &str, record: Record) -> ModelResult<()> {
        self.inner.insert(collection, record).await
    }
}
