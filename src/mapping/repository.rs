//! Mapping records and their store.
//!
//! A [`Mapping`] binds one container to one vocabulary Type. Its
//! correspondences form an append-only arena keyed by property id: an entry
//! is inserted when absent, re-appending the identical binding is a no-op,
//! and anything that would rebind a property or reuse a field for another
//! property is refused. Bindings leave a Mapping only through
//! [`Mapping::detach_field`] (the field itself was deleted) or with the whole
//! container.

use crate::content::{Cardinality, ContainerId};
use crate::error::{MappingError, Result};
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Virtual property carrying the instance's vocabulary subtype.
pub const SUBTYPE_PROPERTY: &str = "subtype";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyFieldCorrespondence {
    pub property_id: String,
    pub machine_name: String,
    pub cardinality: Cardinality,
}

impl PropertyFieldCorrespondence {
    pub fn new(property_id: impl Into<String>, machine_name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            property_id: property_id.into(),
            machine_name: machine_name.into(),
            cardinality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    container: ContainerId,
    type_id: String,
    correspondences: IndexMap<String, PropertyFieldCorrespondence>,
    additional_properties: IndexSet<String>,
}

impl Mapping {
    pub fn new(container: ContainerId, type_id: impl Into<String>) -> Self {
        Self {
            container,
            type_id: type_id.into(),
            correspondences: IndexMap::new(),
            additional_properties: IndexSet::new(),
        }
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// True when the mapping stores a subtype per instance.
    pub fn has_subtype(&self) -> bool {
        self.correspondences.contains_key(SUBTYPE_PROPERTY)
    }

    pub fn subtype_correspondence(&self) -> Option<&PropertyFieldCorrespondence> {
        self.correspondences.get(SUBTYPE_PROPERTY)
    }

    pub fn correspondence(&self, property_id: &str) -> Option<&PropertyFieldCorrespondence> {
        self.correspondences.get(property_id)
    }

    pub fn correspondences(&self) -> impl Iterator<Item = &PropertyFieldCorrespondence> {
        self.correspondences.values()
    }

    pub fn field(&self, machine_name: &str) -> Option<&PropertyFieldCorrespondence> {
        self.correspondences
            .values()
            .find(|c| c.machine_name == machine_name)
    }

    pub fn additional_properties(&self) -> &IndexSet<String> {
        &self.additional_properties
    }

    pub fn len(&self) -> usize {
        self.correspondences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.correspondences.is_empty()
    }

    /// Insert-if-absent. Returns `false` when the identical binding is
    /// already present.
    pub fn append(&mut self, correspondence: PropertyFieldCorrespondence) -> Result<bool> {
        if let Some(existing) = self.correspondences.get(&correspondence.property_id) {
            if *existing == correspondence {
                return Ok(false);
            }
            return Err(MappingError::ImmutableCorrespondence {
                property: correspondence.property_id,
                existing: existing.machine_name.clone(),
                requested: correspondence.machine_name,
            });
        }
        if let Some(other) = self.field(&correspondence.machine_name) {
            return Err(MappingError::NameConflict {
                property: correspondence.property_id,
                machine_name: correspondence.machine_name,
                bound_to: Some(other.property_id.clone()),
            });
        }
        self.correspondences
            .insert(correspondence.property_id.clone(), correspondence);
        Ok(true)
    }

    pub fn add_additional_property(&mut self, property_id: impl Into<String>) -> bool {
        self.additional_properties.insert(property_id.into())
    }

    /// Drop the binding of a deleted field.
    pub fn detach_field(&mut self, machine_name: &str) -> Option<PropertyFieldCorrespondence> {
        let property = self.field(machine_name)?.property_id.clone();
        self.correspondences.shift_remove(&property)
    }
}

/// Persistence for mappings, one per container.
///
/// `create` must be atomic per container: of several concurrent creates for
/// the same container exactly one succeeds and the rest see
/// `DuplicateMapping`.
pub trait MappingRepository: Send + Sync {
    fn get(&self, container: &ContainerId) -> Option<Mapping>;

    fn create(&self, mapping: Mapping) -> Result<()>;

    /// Append correspondences and additional properties, all or nothing.
    fn append(
        &self,
        container: &ContainerId,
        correspondences: &[PropertyFieldCorrespondence],
        additional_properties: &[String],
    ) -> Result<Mapping>;

    fn detach_field(&self, container: &ContainerId, machine_name: &str) -> Result<Option<PropertyFieldCorrespondence>>;

    /// Called when the container itself is deleted.
    fn remove_container(&self, container: &ContainerId) -> Option<Mapping>;

    fn find_by_type(&self, type_id: &str) -> Vec<Mapping>;
}

#[derive(Debug, Default)]
pub struct InMemoryMappingRepository {
    mappings: Mutex<IndexMap<ContainerId, Mapping>>,
}

impl InMemoryMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mappings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.lock().is_empty()
    }
}

impl MappingRepository for InMemoryMappingRepository {
    fn get(&self, container: &ContainerId) -> Option<Mapping> {
        self.mappings.lock().get(container).cloned()
    }

    fn create(&self, mapping: Mapping) -> Result<()> {
        let mut mappings = self.mappings.lock();
        if let Some(existing) = mappings.get(mapping.container()) {
            return Err(MappingError::DuplicateMapping {
                container: existing.container().to_string(),
                type_id: existing.type_id().to_string(),
            });
        }
        mappings.insert(mapping.container().clone(), mapping);
        Ok(())
    }

    fn append(
        &self,
        container: &ContainerId,
        correspondences: &[PropertyFieldCorrespondence],
        additional_properties: &[String],
    ) -> Result<Mapping> {
        let mut mappings = self.mappings.lock();
        let current = mappings
            .get(container)
            .ok_or_else(|| MappingError::MissingMapping {
                container: container.to_string(),
            })?;

        let mut next = current.clone();
        for correspondence in correspondences {
            next.append(correspondence.clone())?;
        }
        for property in additional_properties {
            next.add_additional_property(property.clone());
        }
        mappings.insert(container.clone(), next.clone());
        Ok(next)
    }

    fn detach_field(&self, container: &ContainerId, machine_name: &str) -> Result<Option<PropertyFieldCorrespondence>> {
        let mut mappings = self.mappings.lock();
        let mapping = mappings
            .get_mut(container)
            .ok_or_else(|| MappingError::MissingMapping {
                container: container.to_string(),
            })?;
        Ok(mapping.detach_field(machine_name))
    }

    fn remove_container(&self, container: &ContainerId) -> Option<Mapping> {
        self.mappings.lock().shift_remove(container)
    }

    fn find_by_type(&self, type_id: &str) -> Vec<Mapping> {
        self.mappings
            .lock()
            .values()
            .filter(|m| m.type_id() == type_id)
            .cloned()
            .collect()
    }
}
