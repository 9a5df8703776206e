//! Eager loading for the document ORM
//! Inclusion sets, lookup planning, and the executor that batches lookups per concrete type

pub mod eager_loader;
pub mod inclusion;
pub(crate) mod plan;

pub use eager_loader::EagerLoader;
pub use inclusion::{Inclusion, InclusionKey, InclusionSet, Modifier};
