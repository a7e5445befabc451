//! Structured data output for mapped content.
//!
//! Each referenced instance is in one of three states:
//!
//! ```text
//! Expanding   mapped, depth left, not already on the current branch
//! Summarized  depth exhausted, container unmapped, already on the branch,
//!             or its expansion failed: name + identifier only
//! Skipped     nothing identifies it: omitted
//! ```
//!
//! The branch path is passed by value into each recursive call, so the same
//! instance may appear expanded under two unrelated branches while a
//! back-reference to an ancestor on the same branch is always summarized.

use crate::config::MapperConfig;
use crate::content::{Cardinality, ContainerId, ContentStore, EntityHandle, FieldValue, Scalar};
use crate::error::{MappingError, Result};
use crate::mapping::{Mapping, MappingRepository, SUBTYPE_PROPERTY};
use crate::units::UnitAnnotator;
use crate::vocabulary::{VocabularyGraph, VocabularyRegistry};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const IDENTIFIER_PROPERTY: &str = "identifier";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Reference levels to expand below the root.
    pub depth: usize,
    pub include_identifier: bool,
}

impl BuildOptions {
    pub fn from_config(config: &MapperConfig) -> Self {
        Self {
            depth: config.default_depth,
            include_identifier: config.include_identifier,
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_config(&MapperConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Expanding,
    Summarized,
    Skipped,
}

type BranchPath = Vec<(ContainerId, String)>;

pub struct StructuredDataBuilder {
    registry: Arc<VocabularyRegistry>,
    config: Arc<MapperConfig>,
}

impl StructuredDataBuilder {
    pub fn new(registry: Arc<VocabularyRegistry>, config: Arc<MapperConfig>) -> Self {
        Self { registry, config }
    }

    /// Structured data for one instance, or `None` when its container has no
    /// Mapping.
    pub fn build(
        &self,
        content: &dyn ContentStore,
        mappings: &dyn MappingRepository,
        entity: &EntityHandle,
        options: &BuildOptions,
    ) -> Result<Option<Value>> {
        let Some(mapping) = mappings.get(&entity.container) else {
            debug!(entity = %entity, "no mapping for container");
            return Ok(None);
        };
        self.build_with_mapping(content, mappings, entity, &mapping, options)
            .map(Some)
    }

    /// Structured data for one instance using an explicit Mapping.
    pub fn build_with_mapping(
        &self,
        content: &dyn ContentStore,
        mappings: &dyn MappingRepository,
        entity: &EntityHandle,
        mapping: &Mapping,
        options: &BuildOptions,
    ) -> Result<Value> {
        let graph = self.registry.current();
        graph.type_def(mapping.type_id())?;

        let pass = BuildPass {
            units: UnitAnnotator::from_graph(&graph, &self.config.units),
            graph: &graph,
            priority: &self.config.priority_properties,
            content,
            mappings,
            options,
        };
        let path = vec![(entity.container.clone(), entity.id.clone())];
        let tree = pass.expand(entity, mapping, options.depth, path)?;
        self.registry.ensure_current(graph.version())?;
        Ok(tree)
    }

    /// Several roots under one `@graph`; unmapped roots are left out.
    pub fn build_graph(
        &self,
        content: &dyn ContentStore,
        mappings: &dyn MappingRepository,
        entities: &[EntityHandle],
        options: &BuildOptions,
    ) -> Result<Value> {
        let mut nodes = Vec::with_capacity(entities.len());
        for entity in entities {
            if let Some(node) = self.build(content, mappings, entity, options)? {
                nodes.push(node);
            }
        }
        let mut root = Map::new();
        root.insert("@graph".to_string(), Value::Array(nodes));
        Ok(wrap_with_context(Value::Object(root), &self.config.context))
    }

    pub fn context(&self) -> &str {
        &self.config.context
    }
}

/// Prefix a tree with an `@context` marker.
pub fn wrap_with_context(tree: Value, context: &str) -> Value {
    match tree {
        Value::Object(fields) => {
            let mut wrapped = Map::with_capacity(fields.len() + 1);
            wrapped.insert("@context".to_string(), Value::String(context.to_string()));
            for (key, value) in fields {
                if key != "@context" {
                    wrapped.insert(key, value);
                }
            }
            Value::Object(wrapped)
        }
        other => other,
    }
}

struct BuildPass<'a> {
    graph: &'a VocabularyGraph,
    units: UnitAnnotator,
    priority: &'a [String],
    content: &'a dyn ContentStore,
    mappings: &'a dyn MappingRepository,
    options: &'a BuildOptions,
}

impl BuildPass<'_> {
    fn expand(&self, entity: &EntityHandle, mapping: &Mapping, depth: usize, path: BranchPath) -> Result<Value> {
        let mut emitted: Vec<(String, Value)> = Vec::new();

        if self.options.include_identifier {
            emitted.push((IDENTIFIER_PROPERTY.to_string(), self.identifier_block(entity)));
        }

        for correspondence in mapping.correspondences() {
            let property_id = correspondence.property_id.as_str();
            if property_id == SUBTYPE_PROPERTY
                || (self.options.include_identifier && property_id == IDENTIFIER_PROPERTY)
            {
                continue;
            }

            let raw = self.content.read_value(entity, &correspondence.machine_name);
            let items = raw.items();
            let value = match correspondence.cardinality {
                Cardinality::Unlimited => {
                    let values: Vec<Value> = items
                        .into_iter()
                        .filter_map(|item| self.emit_item(property_id, item, depth, &path))
                        .collect();
                    if values.is_empty() {
                        continue;
                    }
                    Value::Array(values)
                }
                // Later items of a single-valued field are never rendered.
                Cardinality::Single => {
                    match items.into_iter().find_map(|item| self.emit_item(property_id, item, depth, &path)) {
                        Some(first) => first,
                        None => continue,
                    }
                }
            };
            emitted.push((property_id.to_string(), value));
        }

        self.order(mapping.type_id(), &mut emitted);

        let mut node = Map::with_capacity(emitted.len() + 1);
        node.insert("@type".to_string(), Value::String(self.type_of(entity, mapping)));
        node.extend(emitted);
        Ok(Value::Object(node))
    }

    /// The instance's subtype when one is set and descends from the mapped
    /// Type, else the mapped Type.
    fn type_of(&self, entity: &EntityHandle, mapping: &Mapping) -> String {
        let declared = mapping.subtype_correspondence().and_then(|c| {
            let value = self.content.read_value(entity, &c.machine_name);
            value.items().into_iter().find_map(|item| match item {
                FieldValue::Scalar(Scalar::Text(text)) => Some(text.trim().to_string()),
                _ => None,
            })
        });
        match declared {
            Some(subtype) if matches!(self.graph.is_subtype_of(&subtype, mapping.type_id()), Ok(true)) => subtype,
            Some(subtype) => {
                warn!(
                    entity = %entity,
                    subtype = %subtype,
                    type_id = %mapping.type_id(),
                    "subtype value is not a subtype of the mapped type, ignoring"
                );
                mapping.type_id().to_string()
            }
            None => mapping.type_id().to_string(),
        }
    }

    fn emit_item(&self, property_id: &str, item: &FieldValue, depth: usize, path: &BranchPath) -> Option<Value> {
        match item {
            FieldValue::Scalar(scalar) => match self.units.annotate(property_id, scalar) {
                Value::Null => None,
                value => Some(value),
            },
            FieldValue::Reference(target) => self.emit_reference(target, depth, path),
            FieldValue::Nothing | FieldValue::Sequence(_) => None,
        }
    }

    fn emit_reference(&self, target: &EntityHandle, depth: usize, path: &BranchPath) -> Option<Value> {
        let mapping = self.mappings.get(&target.container);
        match self.state_of(target, mapping.as_ref(), depth, path) {
            NodeState::Skipped => {
                debug!(entity = %target, "reference skipped");
                None
            }
            NodeState::Summarized => Some(self.summary(target, mapping.as_ref())),
            NodeState::Expanding => {
                let mapping = mapping?;
                let mut branch = path.clone();
                branch.push((target.container.clone(), target.id.clone()));
                match self.expand(target, &mapping, depth - 1, branch) {
                    Ok(value) => Some(value),
                    Err(error) => {
                        warn!(entity = %target, %error, "reference expansion failed, summarizing");
                        error.track("build");
                        Some(self.summary(target, Some(&mapping)))
                    }
                }
            }
        }
    }

    fn state_of(&self, target: &EntityHandle, mapping: Option<&Mapping>, depth: usize, path: &BranchPath) -> NodeState {
        if self.content.display_name(target).is_empty() && self.content.stable_id(target).is_empty() {
            return NodeState::Skipped;
        }
        let Some(mapping) = mapping else {
            MappingError::MissingMapping {
                container: target.container.to_string(),
            }
            .track("build");
            return NodeState::Summarized;
        };
        if depth == 0 || path.iter().any(|(c, id)| *c == target.container && *id == target.id) {
            return NodeState::Summarized;
        }
        if !self.graph.contains_type(mapping.type_id()) {
            warn!(entity = %target, type_id = %mapping.type_id(), "mapped to unknown type, summarizing");
            return NodeState::Summarized;
        }
        NodeState::Expanding
    }

    fn summary(&self, target: &EntityHandle, mapping: Option<&Mapping>) -> Value {
        let mut node = Map::new();
        if let Some(mapping) = mapping {
            node.insert("@type".to_string(), Value::String(mapping.type_id().to_string()));
        }
        let name = self.content.display_name(target);
        if !name.is_empty() {
            node.insert("name".to_string(), Value::String(name));
        }
        let id = self.content.stable_id(target);
        if !id.is_empty() {
            node.insert(IDENTIFIER_PROPERTY.to_string(), Value::String(id));
        }
        Value::Object(node)
    }

    fn identifier_block(&self, entity: &EntityHandle) -> Value {
        Value::Array(
            self.content
                .identifiers(entity)
                .into_iter()
                .map(|identifier| {
                    let mut record = Map::new();
                    record.insert("@type".to_string(), Value::String("PropertyValue".to_string()));
                    record.insert("propertyID".to_string(), Value::String(identifier.property_id));
                    record.insert("value".to_string(), Value::String(identifier.value));
                    Value::Object(record)
                })
                .collect(),
        )
    }

    /// Priority list first, then the vocabulary's property order for the
    /// Type, then everything else as emitted.
    fn order(&self, type_id: &str, emitted: &mut [(String, Value)]) {
        let canonical = self.graph.property_ids_of(type_id).unwrap_or_default();
        emitted.sort_by_key(|(property, _)| {
            if let Some(index) = self.priority.iter().position(|p| p == property) {
                (0, index)
            } else if let Some(index) = canonical.iter().position(|p| p == property) {
                (1, index)
            } else {
                (2, 0)
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{MemoryContentStore, Scalar};
    use crate::mapping::{InMemoryMappingRepository, PropertyFieldCorrespondence};
    use crate::vocabulary::VocabularyTable;
    use serde_json::json;

    fn setup() -> (StructuredDataBuilder, InMemoryMappingRepository, MemoryContentStore) {
        let table = VocabularyTable::default()
            .with_type("Thing", &[])
            .with_type("Text", &[])
            .with_type("Number", &[])
            .with_type("Person", &["Thing"])
            .with_type("Patient", &["Person"])
            .with_property("name", &["Thing"], &["Text"])
            .with_property("weight", &["Person"], &["Number"])
            .with_property("knows", &["Person"], &["Person"]);
        let registry = Arc::new(VocabularyRegistry::new(table).unwrap());
        let mut config = MapperConfig::default();
        config.units.insert("weight".to_string(), "kg".to_string());
        let builder = StructuredDataBuilder::new(registry, Arc::new(config));

        let repo = InMemoryMappingRepository::new();
        let mut mapping = Mapping::new(ContainerId::from("person"), "Person");
        for (property, field, cardinality) in [
            ("knows", "schema_knows", Cardinality::Unlimited),
            ("name", "title", Cardinality::Single),
            ("weight", "schema_weight", Cardinality::Single),
            (SUBTYPE_PROPERTY, "schema_subtype", Cardinality::Single),
        ] {
            mapping
                .append(PropertyFieldCorrespondence::new(property, field, cardinality))
                .unwrap();
        }
        repo.create(mapping).unwrap();
        (builder, repo, MemoryContentStore::new())
    }

    fn no_ids() -> BuildOptions {
        BuildOptions {
            depth: 2,
            include_identifier: false,
        }
    }

    #[test]
    fn test_scalars_units_and_ordering() {
        let (builder, repo, mut content) = setup();
        let alice = content.add_entity("person", "1", "Alice");
        content
            .set_value(&alice, "title", FieldValue::Sequence(vec![FieldValue::text("Alice"), FieldValue::text("Al")]))
            .set_value(&alice, "schema_weight", FieldValue::integer(60));

        let tree = builder.build(&content, &repo, &alice, &no_ids()).unwrap().unwrap();
        assert_eq!(tree, json!({"@type": "Person", "name": "Alice", "weight": "60 kg"}));
        let keys: Vec<_> = tree.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["@type", "name", "weight"]);
    }

    #[test]
    fn test_subtype_overrides_type() {
        let (builder, repo, mut content) = setup();
        let bob = content.add_entity("person", "2", "Bob");
        content.set_value(&bob, "schema_subtype", FieldValue::Scalar(Scalar::Text("Patient".into())));
        let tree = builder.build(&content, &repo, &bob, &no_ids()).unwrap().unwrap();
        assert_eq!(tree["@type"], json!("Patient"));
    }

    #[test]
    fn test_identifier_block() {
        let (builder, repo, mut content) = setup();
        let carol = content.add_entity("person", "3", "Carol");
        content.set_stable_id(&carol, "uuid-3").add_identifier(&carol, "mrn", "A-17");
        let options = BuildOptions {
            depth: 0,
            include_identifier: true,
        };
        let tree = builder.build(&content, &repo, &carol, &options).unwrap().unwrap();
        assert_eq!(
            tree["identifier"],
            json!([
                {"@type": "PropertyValue", "propertyID": "uuid", "value": "uuid-3"},
                {"@type": "PropertyValue", "propertyID": "mrn", "value": "A-17"}
            ])
        );
    }

    #[test]
    fn test_depth_zero_summarizes_references() {
        let (builder, repo, mut content) = setup();
        let a = content.add_entity("person", "a", "Ann");
        let b = content.add_entity("person", "b", "Ben");
        content.set_value(&a, "schema_knows", FieldValue::Reference(b.clone()));
        let tree = builder
            .build(&content, &repo, &a, &no_ids().with_depth(0))
            .unwrap()
            .unwrap();
        assert_eq!(
            tree["knows"],
            json!([{"@type": "Person", "name": "Ben", "identifier": "person:b"}])
        );
    }

    #[test]
    fn test_unmapped_reference_is_summarized_without_type() {
        let (builder, repo, mut content) = setup();
        let a = content.add_entity("person", "a", "Ann");
        let place = content.add_entity("place", "p", "Paris");
        content.set_value(&a, "schema_knows", FieldValue::Reference(place));
        let tree = builder.build(&content, &repo, &a, &no_ids()).unwrap().unwrap();
        assert_eq!(tree["knows"], json!([{"name": "Paris", "identifier": "place:p"}]));

        let paris = EntityHandle::new("place", "p");
        assert_eq!(builder.build(&content, &repo, &paris, &no_ids()).unwrap(), None);
    }

    #[test]
    fn test_wrap_with_context() {
        let wrapped = wrap_with_context(json!({"@type": "Person"}), "https://schema.org");
        let keys: Vec<_> = wrapped.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["@context", "@type"]);
    }
}
