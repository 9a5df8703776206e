//! Query Builder - Core criteria implementation

use std::fmt;
use std::mem;
use std::sync::Arc;

use serde_json::Value;

use super::types::*;
use crate::backends::Query;
use crate::document::TYPE_FIELD;
use crate::error::ModelResult;
use crate::loading::InclusionSet;
use crate::relationships::RelationshipRegistry;

/// A lazily evaluated query over one model, plus the associations to
/// eager load once it materializes
#[derive(Clone)]
pub struct Criteria {
    pub(crate) registry: Arc<RelationshipRegistry>,
    pub(crate) model: String,
    pub(crate) conditions: Vec<WhereCondition>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: Option<usize>,
    pub(crate) inclusions: InclusionSet,
}

impl Criteria {
    /// Create an unfiltered criteria for a model
    pub fn new(registry: Arc<RelationshipRegistry>, model: &str) -> Self {
        Self {
            registry,
            model: model.to_string(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            inclusions: InclusionSet::new(),
        }
    }

    /// Model this criteria is anchored at
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn registry(&self) -> &Arc<RelationshipRegistry> {
        &self.registry
    }

    pub fn conditions(&self) -> &[WhereCondition] {
        &self.conditions
    }

    /// Associations that will be eager loaded on materialization
    pub fn inclusions(&self) -> &InclusionSet {
        &self.inclusions
    }

    pub(crate) fn into_inclusions(mut self) -> InclusionSet {
        mem::take(&mut self.inclusions)
    }

    pub(crate) fn take_inclusions(&mut self) -> InclusionSet {
        mem::take(&mut self.inclusions)
    }

    pub(crate) fn with_inclusions(mut self, inclusions: InclusionSet) -> Self {
        self.inclusions = inclusions;
        self
    }

    fn push(mut self, condition: WhereCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add WHERE condition with equality
    pub fn where_eq<T: Into<Value>>(self, field: &str, value: T) -> Self {
        self.push(WhereCondition::compare(field, QueryOperator::Equal, value.into()))
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(self, field: &str, value: T) -> Self {
        self.push(WhereCondition::compare(field, QueryOperator::NotEqual, value.into()))
    }

    /// Add WHERE condition with greater than
    pub fn where_gt<T: Into<Value>>(self, field: &str, value: T) -> Self {
        self.push(WhereCondition::compare(field, QueryOperator::GreaterThan, value.into()))
    }

    /// Add WHERE condition with greater than or equal
    pub fn where_gte<T: Into<Value>>(self, field: &str, value: T) -> Self {
        self.push(WhereCondition::compare(
            field,
            QueryOperator::GreaterThanOrEqual,
            value.into(),
        ))
    }

    /// Add WHERE condition with less than
    pub fn where_lt<T: Into<Value>>(self, field: &str, value: T) -> Self {
        self.push(WhereCondition::compare(field, QueryOperator::LessThan, value.into()))
    }

    /// Add WHERE condition with less than or equal
    pub fn where_lte<T: Into<Value>>(self, field: &str, value: T) -> Self {
        self.push(WhereCondition::compare(
            field,
            QueryOperator::LessThanOrEqual,
            value.into(),
        ))
    }

    /// Add WHERE IN condition
    pub fn where_in<T: Into<Value>>(self, field: &str, values: Vec<T>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(WhereCondition::set(field, QueryOperator::In, values))
    }

    /// Add WHERE NOT IN condition
    pub fn where_not_in<T: Into<Value>>(self, field: &str, values: Vec<T>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(WhereCondition::set(field, QueryOperator::NotIn, values))
    }

    /// Add WHERE field IS NULL condition
    pub fn where_null(self, field: &str) -> Self {
        self.push(WhereCondition::null_check(field, QueryOperator::IsNull))
    }

    /// Add WHERE field IS NOT NULL condition
    pub fn where_not_null(self, field: &str) -> Self {
        self.push(WhereCondition::null_check(field, QueryOperator::IsNotNull))
    }

    /// Add ORDER BY clause
    pub fn order_by(mut self, field: &str) -> Self {
        self.order_by.push((field.to_string(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY clause with descending order
    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_by.push((field.to_string(), OrderDirection::Desc));
        self
    }

    /// Add LIMIT clause
    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: usize) -> Self {
        self.offset = Some(count);
        self
    }

    /// Lower the criteria into a store query
    ///
    /// Models sharing a collection are restricted to the criteria model and
    /// its subtypes through the type tag.
    pub fn to_query(&self) -> ModelResult<Query> {
        let mut query = Query::new(self.registry.collection_for(&self.model)?, &self.model);

        if self.registry.uses_type_tag(&self.model) {
            let kinds = self
                .registry
                .descendants(&self.model)
                .into_iter()
                .map(Value::String)
                .collect();
            query
                .conditions
                .push(WhereCondition::set(TYPE_FIELD, QueryOperator::In, kinds));
        }

        query.conditions.extend(self.conditions.iter().cloned());
        query.order_by = self.order_by.clone();
        query.limit = self.limit;
        query.offset = self.offset;
        Ok(query)
    }
}

impl fmt::Debug for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("model", &self.model)
            .field("conditions", &self.conditions)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("inclusions", &self.inclusions)
            .finish()
    }
}
