//! Vocabulary mapping for dynamically shaped content.
//!
//! Two engines sit on a shared read-only vocabulary graph:
//! - [`MappingResolver`] proposes which vocabulary properties a container
//!   should expose, as which field kinds and under which machine names,
//!   reusing fields that are already bound and never rebinding them
//! - [`StructuredDataBuilder`] turns a mapped instance into nested structured
//!   data, following references with path-based cycle detection
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vocab_mapper::*;
//!
//! let registry = Arc::new(VocabularyRegistry::new(VocabularyTable::load(path)?)?);
//! let config = Arc::new(MapperConfig::default());
//! let resolver = MappingResolver::new(registry.clone(), config.clone());
//!
//! let defaults = resolver.resolve_defaults(&existing_fields, "Person", &MappingOverrides::default())?;
//! resolver.commit(&mappings, &ContainerId::from("person"), &defaults)?;
//!
//! let builder = StructuredDataBuilder::new(registry, config);
//! let tree = builder.build(&content, &mappings, &entity, &BuildOptions::default())?;
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod field_kind;
pub mod logging;
pub mod mapping;
pub mod names;
pub mod structured_data;
pub mod units;
pub mod vocabulary;

pub use config::{MapperConfig, PropertyOverride};
pub use content::{
    Cardinality, ContainerId, ContentStore, EntityHandle, ExistingField, FieldValue, Identifier,
    MemoryContentStore, Scalar,
};
pub use error::{ERROR_METRICS, ErrorCode, MappingError, Result};
pub use field_kind::{FieldCandidate, FieldKind, FieldKindSelector, RangeCategory};
pub use logging::{LogFormat, LogOutput, LoggingConfig, init_logging};
pub use mapping::{
    FieldSource, InMemoryMappingRepository, Mapping, MappingDefaults, MappingOverrides,
    MappingRepository, MappingResolver, PropertyDefault, PropertyFieldCorrespondence, SkipReason,
    SkippedProperty, SUBTYPE_PROPERTY,
};
pub use names::NameTransformer;
pub use structured_data::{BuildOptions, NodeState, StructuredDataBuilder, wrap_with_context};
pub use units::UnitAnnotator;
pub use vocabulary::{Property, VocabularyGraph, VocabularyRegistry, VocabularyTable, VocabularyType};
