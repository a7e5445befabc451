//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use vocab_mapper::{
    ContainerId, InMemoryMappingRepository, MapperConfig, MappingDefaults, MappingOverrides,
    MappingResolver, MemoryContentStore, StructuredDataBuilder, VocabularyRegistry,
    VocabularyTable,
};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn vocabulary_table() -> VocabularyTable {
    VocabularyTable::load(&fixture_path("vocabulary.yaml")).expect("fixture vocabulary loads")
}

pub fn registry() -> Arc<VocabularyRegistry> {
    Arc::new(VocabularyRegistry::new(vocabulary_table()).expect("fixture vocabulary is valid"))
}

/// Config used across suites: `knows` and `children` are multi-valued,
/// Person carries the subtype property, weights are in kilograms.
pub fn config() -> MapperConfig {
    let mut config = MapperConfig::default();
    config.unlimited_properties.insert("knows".to_string());
    config.unlimited_properties.insert("children".to_string());
    config.subtyped_types.insert("Person".to_string());
    config
}

pub struct Harness {
    pub registry: Arc<VocabularyRegistry>,
    pub config: Arc<MapperConfig>,
    pub resolver: MappingResolver,
    pub builder: StructuredDataBuilder,
    pub mappings: InMemoryMappingRepository,
    pub content: MemoryContentStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: MapperConfig) -> Self {
        let registry = registry();
        let config = Arc::new(config);
        Self {
            resolver: MappingResolver::new(registry.clone(), config.clone()),
            builder: StructuredDataBuilder::new(registry.clone(), config.clone()),
            registry,
            config,
            mappings: InMemoryMappingRepository::new(),
            content: MemoryContentStore::new(),
        }
    }

    /// Resolve against the container's current fields and commit the result.
    pub fn map_container(&self, container: &str, type_id: &str) -> MappingDefaults {
        let container = ContainerId::from(container);
        let defaults = self
            .resolver
            .resolve_for_container(
                &self.content,
                &self.mappings,
                &container,
                type_id,
                &MappingOverrides::default(),
            )
            .expect("resolution succeeds");
        self.resolver
            .commit(&self.mappings, &container, &defaults)
            .expect("commit succeeds");
        defaults
    }
}
