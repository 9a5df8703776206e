//! Query Builder Types - Core types and enums for query building

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "$eq"),
            QueryOperator::NotEqual => write!(f, "$ne"),
            QueryOperator::GreaterThan => write!(f, "$gt"),
            QueryOperator::GreaterThanOrEqual => write!(f, "$gte"),
            QueryOperator::LessThan => write!(f, "$lt"),
            QueryOperator::LessThanOrEqual => write!(f, "$lte"),
            QueryOperator::In => write!(f, "$in"),
            QueryOperator::NotIn => write!(f, "$nin"),
            QueryOperator::IsNull => write!(f, "$null"),
            QueryOperator::IsNotNull => write!(f, "$notnull"),
        }
    }
}

/// Where clause condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereCondition {
    pub field: String,
    pub operator: QueryOperator,
    pub value: Option<Value>,
    pub values: Vec<Value>, // For IN, NOT IN
}

impl WhereCondition {
    pub fn compare(field: &str, operator: QueryOperator, value: Value) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: Some(value),
            values: Vec::new(),
        }
    }

    pub fn set(field: &str, operator: QueryOperator, values: Vec<Value>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: None,
            values,
        }
    }

    pub fn null_check(field: &str, operator: QueryOperator) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: None,
            values: Vec::new(),
        }
    }
}

impl fmt::Display for WhereCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.operator) {
            (Some(value), op) => write!(f, "{} {} {}", self.field, op, value),
            (None, QueryOperator::In | QueryOperator::NotIn) => {
                write!(f, "{} {} [{} values]", self.field, self.operator, self.values.len())
            }
            (None, op) => write!(f, "{} {}", self.field, op),
        }
    }
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_display() {
        let gt = WhereCondition::compare("release", QueryOperator::GreaterThan, json!(1970));
        assert_eq!(gt.to_string(), "release $gt 1970");

        let within = WhereCondition::set("_id", QueryOperator::In, vec![json!("a"), json!("b")]);
        assert_eq!(within.to_string(), "_id $in [2 values]");

        let null = WhereCondition::null_check("owner_id", QueryOperator::IsNull);
        assert_eq!(null.to_string(), "owner_id $null");
    }
}
