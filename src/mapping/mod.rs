//! Mapping resolution and persistence
//!
//! - **Defaults** - the recomputable proposal for a (container, Type) pair
//! - **Resolver** - computes defaults and commits them as a Mapping
//! - **Repository** - append-only Mapping records and their store

pub mod defaults;
pub mod repository;
pub mod resolver;

pub use defaults::{
    FieldSource, MappingDefaults, MappingOverrides, PropertyDefault, SkipReason, SkippedProperty,
};
pub use repository::{
    InMemoryMappingRepository, Mapping, MappingRepository, PropertyFieldCorrespondence,
    SUBTYPE_PROPERTY,
};
pub use resolver::{MappingResolver, resolve_defaults};
