//! In-process document store
//!
//! Keeps collections in memory and records every executed query, which makes
//! it the store used to seed data and count round trips in tests.

use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::core::{DocumentStore, Query};
use crate::config::StoreConfig;
use crate::document::Record;
use crate::error::ModelResult;
use crate::query::{OrderDirection, QueryOperator, WhereCondition};

/// Document store backed by in-memory collections
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: StoreConfig,
    collections: DashMap<String, Vec<Record>>,
    query_log: Mutex<Vec<Query>>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            collections: DashMap::new(),
            query_log: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of `find` calls executed so far
    pub fn query_count(&self) -> usize {
        self.log().len()
    }

    /// Every query executed so far, in order
    pub fn queries(&self) -> Vec<Query> {
        self.log().clone()
    }

    pub fn reset_query_log(&self) {
        self.log().clear();
    }

    /// Number of records in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }

    fn log(&self) -> MutexGuard<'_, Vec<Query>> {
        self.query_log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, query: &Query) -> ModelResult<Vec<Record>> {
        self.log().push(query.clone());

        let mut records: Vec<Record> = match self.collections.get(&query.collection) {
            Some(collection) => collection
                .iter()
                .filter(|record| query.conditions.iter().all(|c| matches(record, c)))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if !query.order_by.is_empty() {
            records.sort_by(|a, b| {
                query
                    .order_by
                    .iter()
                    .map(|(field, direction)| {
                        let ordering = compare_optional(a.get(field), b.get(field));
                        match direction {
                            OrderDirection::Asc => ordering,
                            OrderDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        let records: Vec<Record> = records.into_iter().skip(offset).take(limit).collect();

        tracing::debug!(
            database = %self.config.database,
            collection = %query.collection,
            conditions = query.conditions.len(),
            returned = records.len(),
            "memory store find"
        );

        Ok(records)
    }

    async fn insert(&self, collection: &str, record: Record) -> ModelResult<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record);
        Ok(())
    }
}

/// Evaluate one condition against a record
fn matches(record: &Record, condition: &WhereCondition) -> bool {
    let field = record.get(&condition.field);

    match condition.operator {
        QueryOperator::IsNull => field.map_or(true, Value::is_null),
        QueryOperator::IsNotNull => field.is_some_and(|v| !v.is_null()),
        QueryOperator::In => field.is_some_and(|v| contained_in(v, &condition.values)),
        QueryOperator::NotIn => !field.is_some_and(|v| contained_in(v, &condition.values)),
        QueryOperator::Equal => match (field, &condition.value) {
            (Some(Value::Array(items)), Some(expected)) => items.contains(expected),
            (Some(actual), Some(expected)) => actual == expected,
            (None, Some(Value::Null)) => true,
            _ => false,
        },
        QueryOperator::NotEqual => match (field, &condition.value) {
            (Some(actual), Some(expected)) => actual != expected,
            (None, Some(expected)) => !expected.is_null(),
            _ => false,
        },
        QueryOperator::GreaterThan => ordered(field, &condition.value, |o| o == Ordering::Greater),
        QueryOperator::GreaterThanOrEqual => {
            ordered(field, &condition.value, |o| o != Ordering::Less)
        }
        QueryOperator::LessThan => ordered(field, &condition.value, |o| o == Ordering::Less),
        QueryOperator::LessThanOrEqual => {
            ordered(field, &condition.value, |o| o != Ordering::Greater)
        }
    }
}

/// Array fields match when any element is in the set
fn contained_in(value: &Value, values: &[Value]) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| values.contains(item)),
        other => values.contains(other),
    }
}

fn ordered(field: Option<&Value>, expected: &Option<Value>, accept: impl Fn(Ordering) -> bool) -> bool {
    match (field, expected) {
        (Some(actual), Some(expected)) => compare(actual, expected).is_some_and(accept),
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Missing and incomparable values sort first
fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
