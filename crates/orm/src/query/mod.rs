//! Query Builder Module - Criteria over document models and association includes

pub mod builder;
pub mod execution;
pub mod types;
pub mod with;

pub use builder::Criteria;
pub use types::{OrderDirection, QueryOperator, WhereCondition};
pub use with::IncludeOptions;
