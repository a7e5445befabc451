//! In-memory [`ContentStore`] for embedding and tests.

use super::{ContainerId, ContentStore, EntityHandle, ExistingField, FieldValue, Identifier};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct StoredEntity {
    display_name: String,
    stable_id: String,
    extra_identifiers: Vec<Identifier>,
    values: HashMap<String, FieldValue>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    fields: HashMap<ContainerId, Vec<ExistingField>>,
    entities: HashMap<EntityHandle, StoredEntity>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, container: &str, field: ExistingField) -> &mut Self {
        self.fields
            .entry(ContainerId::from(container))
            .or_default()
            .push(field);
        self
    }

    /// Register an instance; its stable id defaults to `container:id`.
    pub fn add_entity(&mut self, container: &str, id: &str, display_name: &str) -> EntityHandle {
        let handle = EntityHandle::new(container, id);
        self.entities.insert(
            handle.clone(),
            StoredEntity {
                display_name: display_name.to_string(),
                stable_id: handle.to_string(),
                ..Default::default()
            },
        );
        handle
    }

    pub fn set_stable_id(&mut self, entity: &EntityHandle, stable_id: &str) -> &mut Self {
        if let Some(stored) = self.entities.get_mut(entity) {
            stored.stable_id = stable_id.to_string();
        }
        self
    }

    pub fn add_identifier(&mut self, entity: &EntityHandle, property_id: &str, value: &str) -> &mut Self {
        if let Some(stored) = self.entities.get_mut(entity) {
            stored.extra_identifiers.push(Identifier {
                property_id: property_id.to_string(),
                value: value.to_string(),
            });
        }
        self
    }

    pub fn set_value(&mut self, entity: &EntityHandle, machine_name: &str, value: FieldValue) -> &mut Self {
        if let Some(stored) = self.entities.get_mut(entity) {
            stored.values.insert(machine_name.to_string(), value);
        }
        self
    }
}

impl ContentStore for MemoryContentStore {
    fn existing_fields(&self, container: &ContainerId) -> Vec<ExistingField> {
        self.fields.get(container).cloned().unwrap_or_default()
    }

    fn read_value(&self, entity: &EntityHandle, machine_name: &str) -> FieldValue {
        self.entities
            .get(entity)
            .and_then(|stored| stored.values.get(machine_name))
            .cloned()
            .unwrap_or_default()
    }

    fn stable_id(&self, entity: &EntityHandle) -> String {
        self.entities
            .get(entity)
            .map(|stored| stored.stable_id.clone())
            .unwrap_or_else(|| entity.to_string())
    }

    fn display_name(&self, entity: &EntityHandle) -> String {
        self.entities
            .get(entity)
            .map(|stored| stored.display_name.clone())
            .unwrap_or_default()
    }

    fn identifiers(&self, entity: &EntityHandle) -> Vec<Identifier> {
        let mut identifiers = vec![Identifier {
            property_id: "uuid".to_string(),
            value: self.stable_id(entity),
        }];
        if let Some(stored) = self.entities.get(entity) {
            identifiers.extend(stored.extra_identifiers.iter().cloned());
        }
        identifiers
    }
}
