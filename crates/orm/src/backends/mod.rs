//! Document Store Backends
//!
//! The ORM talks to storage through the [`DocumentStore`] trait. One call
//! executes one lowered [`Query`] against one collection and returns raw
//! records.

pub mod core;
pub mod memory;

// Re-export core traits and types
pub use core::*;
pub use memory::MemoryStore;
