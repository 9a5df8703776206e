//! Relationships Module - association metadata and the model registry

pub mod metadata;
pub mod registry;

pub use metadata::*;
pub use registry::*;
