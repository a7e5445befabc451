//! Default mapping computation and commit.
//!
//! `resolve_defaults` is a pure function of the existing fields, the Type,
//! the overrides, and the vocabulary snapshot it runs against. Fields already
//! bound to a property are reported verbatim and never re-proposed. Problems
//! with one property (a name taken by another field, no surviving field kind)
//! skip that property and are reported next to the proposals; only an unknown
//! Type or Property aborts the call.

use crate::config::{MapperConfig, PropertyOverride};
use crate::content::{Cardinality, ContainerId, ContentStore, ExistingField};
use crate::error::{MappingError, Result};
use crate::field_kind::{FieldCandidate, FieldKind, FieldKindSelector};
use crate::mapping::defaults::{
    FieldSource, MappingDefaults, MappingOverrides, PropertyDefault, SkipReason, SkippedProperty,
};
use crate::mapping::repository::{Mapping, MappingRepository, SUBTYPE_PROPERTY};
use crate::names::{NameTransformer, label_for, snake_case, truncate_at_word};
use crate::vocabulary::{VocabularyGraph, VocabularyRegistry};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const OPERATION: &str = "resolve_defaults";

pub struct MappingResolver {
    registry: Arc<VocabularyRegistry>,
    config: Arc<MapperConfig>,
}

impl MappingResolver {
    pub fn new(registry: Arc<VocabularyRegistry>, config: Arc<MapperConfig>) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Propose a mapping for `type_id` given the container's current fields.
    pub fn resolve_defaults(
        &self,
        existing: &[ExistingField],
        type_id: &str,
        overrides: &MappingOverrides,
    ) -> Result<MappingDefaults> {
        let graph = self.registry.current();
        resolve_defaults(&graph, &self.config, existing, type_id, overrides)
    }

    /// Resolve against a live container: its fields come from the content
    /// store, and an existing Mapping's bindings and additional properties
    /// are folded in. A bound field takes its cardinality from the Mapping,
    /// not from what the store reports.
    pub fn resolve_for_container(
        &self,
        content: &dyn ContentStore,
        mappings: &dyn MappingRepository,
        container: &ContainerId,
        type_id: &str,
        overrides: &MappingOverrides,
    ) -> Result<MappingDefaults> {
        let mut existing = content.existing_fields(container);
        let mut overrides = overrides.clone();

        if let Some(mapping) = mappings.get(container) {
            for field in existing.iter_mut() {
                if let Some(bound) = mapping.field(&field.machine_name) {
                    field.bound_property = Some(bound.property_id.clone());
                    field.cardinality = bound.cardinality;
                }
            }
            for property in mapping.additional_properties() {
                if !overrides.additional_properties.contains(property) {
                    overrides.additional_properties.push(property.clone());
                }
            }
        }

        self.resolve_defaults(&existing, type_id, &overrides)
    }

    /// Create the Mapping for a container from a proposal.
    ///
    /// Fails with `DuplicateMapping` when the container is already mapped and
    /// with `StaleVocabulary` when the proposal predates a reload.
    pub fn commit(
        &self,
        mappings: &dyn MappingRepository,
        container: &ContainerId,
        defaults: &MappingDefaults,
    ) -> Result<Mapping> {
        self.registry.ensure_current(defaults.vocabulary_version)?;

        let mut mapping = Mapping::new(container.clone(), defaults.type_id.clone());
        for correspondence in defaults.correspondences() {
            mapping.append(correspondence)?;
        }
        for property in &defaults.additional_properties {
            mapping.add_additional_property(property.clone());
        }

        mappings.create(mapping.clone()).map_err(|e| e.track("commit"))?;
        info!(
            container = %container,
            type_id = %defaults.type_id,
            correspondences = mapping.len(),
            "mapping committed"
        );
        Ok(mapping)
    }

    /// Append a proposal's new bindings to an existing Mapping of the same Type.
    pub fn update(
        &self,
        mappings: &dyn MappingRepository,
        container: &ContainerId,
        defaults: &MappingDefaults,
    ) -> Result<Mapping> {
        self.registry.ensure_current(defaults.vocabulary_version)?;

        let current = mappings
            .get(container)
            .ok_or_else(|| MappingError::MissingMapping {
                container: container.to_string(),
            })?;
        if current.type_id() != defaults.type_id {
            return Err(MappingError::DuplicateMapping {
                container: container.to_string(),
                type_id: current.type_id().to_string(),
            });
        }

        let additions: Vec<_> = defaults
            .correspondences()
            .into_iter()
            .filter(|c| current.correspondence(&c.property_id) != Some(c))
            .collect();
        let updated = mappings.append(container, &additions, &defaults.additional_properties)?;
        info!(
            container = %container,
            type_id = %defaults.type_id,
            appended = additions.len(),
            "mapping updated"
        );
        Ok(updated)
    }
}

/// The resolution algorithm against an explicit graph snapshot.
pub fn resolve_defaults(
    graph: &VocabularyGraph,
    config: &MapperConfig,
    existing: &[ExistingField],
    type_id: &str,
    overrides: &MappingOverrides,
) -> Result<MappingDefaults> {
    let vocabulary_type = graph.type_def(type_id)?;

    let mut candidates = candidate_properties(graph, config, type_id, overrides)?;
    for field in existing {
        if let Some(bound) = &field.bound_property {
            if bound != SUBTYPE_PROPERTY {
                candidates.insert(bound.clone());
            }
        }
    }

    let by_property: HashMap<&str, &ExistingField> = existing
        .iter()
        .filter_map(|f| f.bound_property.as_deref().map(|p| (p, f)))
        .collect();
    let by_name: HashMap<&str, &ExistingField> = existing
        .iter()
        .map(|f| (f.machine_name.as_str(), f))
        .collect();

    let selector = FieldKindSelector::new(graph).with_long_text(&config.long_text_properties);
    let mut names = NameTransformer::new(config.name_budget());
    let mut properties = Vec::new();
    let mut skipped = Vec::new();

    for property_id in &candidates {
        if let Some(field) = by_property.get(property_id.as_str()) {
            debug!(property = %property_id, field = %field.machine_name, "reusing bound field");
            let description = graph
                .property(property_id)
                .map(|p| p.description.clone())
                .unwrap_or_default();
            properties.push(reused(property_id, field, description, Vec::new()));
            continue;
        }

        let property_override = effective_override(config, overrides, property_id);
        if property_override.skip {
            debug!(property = %property_id, "skipped by override");
            skipped.push(SkippedProperty {
                property_id: property_id.clone(),
                reason: SkipReason::Excluded,
            });
            continue;
        }

        let property = graph.property(property_id)?;
        let ranked = selector.select(property)?;
        let Some(chosen) = choose(&ranked, &property_override) else {
            warn!(property = %property_id, "no field kind candidate survives overrides");
            MappingError::UnresolvableProperty {
                property: property_id.clone(),
            }
            .track(OPERATION);
            skipped.push(SkippedProperty {
                property_id: property_id.clone(),
                reason: SkipReason::Unresolvable,
            });
            continue;
        };

        let machine_name = match issue_name(&mut names, &config.field_prefix, property_id) {
            Ok(name) => name,
            Err(skip) => {
                skipped.push(skip);
                continue;
            }
        };
        if let Some(taken) = by_name.get(machine_name.as_str()) {
            if let Some(skip) = name_conflict(property_id, &machine_name, taken) {
                skipped.push(skip);
                continue;
            }
        }

        let allowed_values = match (&chosen.kind, &chosen.target_type) {
            (FieldKind::EnumerationReference, Some(target)) => {
                graph.enumeration_members(target)?.to_vec()
            }
            _ => Vec::new(),
        };

        debug!(
            property = %property_id,
            field = %machine_name,
            kind = %chosen.kind,
            "proposing new field"
        );
        properties.push(PropertyDefault {
            property_id: property_id.clone(),
            field_kind: chosen.kind,
            target_type: chosen.target_type,
            machine_name,
            label: label_for(property_id),
            description: property.description.clone(),
            cardinality: cardinality(config, overrides, property_id),
            source: FieldSource::New,
            allowed_values,
            candidates: ranked,
        });
    }

    let subtype_field = by_property.get(SUBTYPE_PROPERTY).copied();
    let subtype = subtype_field.is_some()
        || overrides
            .subtype
            .unwrap_or_else(|| config.subtyped_types.contains(type_id));
    if subtype {
        let allowed_values = graph.subtypes_of(type_id)?.to_vec();
        match subtype_field {
            Some(field) => {
                properties.push(reused(SUBTYPE_PROPERTY, field, String::new(), allowed_values));
            }
            None => {
                let issued = issue_name(&mut names, &config.field_prefix, SUBTYPE_PROPERTY).and_then(|machine_name| {
                    match by_name
                        .get(machine_name.as_str())
                        .and_then(|taken| name_conflict(SUBTYPE_PROPERTY, &machine_name, taken))
                    {
                        Some(skip) => Err(skip),
                        None => Ok(machine_name),
                    }
                });
                match issued {
                    Err(skip) => skipped.push(skip),
                    Ok(machine_name) => properties.push(PropertyDefault {
                        property_id: SUBTYPE_PROPERTY.to_string(),
                        field_kind: FieldKind::EnumerationReference,
                        target_type: None,
                        machine_name,
                        label: label_for(SUBTYPE_PROPERTY),
                        description: format!("A more specific type of {type_id}."),
                        cardinality: Cardinality::Single,
                        source: FieldSource::New,
                        allowed_values,
                        candidates: Vec::new(),
                    }),
                }
            }
        }
    }

    Ok(MappingDefaults {
        type_id: type_id.to_string(),
        type_label: label_for(type_id),
        type_description: vocabulary_type.description.clone(),
        container_name: truncate_at_word(&snake_case(type_id), config.max_name_length),
        vocabulary_version: graph.version(),
        subtype,
        additional_properties: overrides.additional_properties.clone(),
        properties,
        skipped,
    })
}

/// Inherited properties, narrowed by the configured allow-lists of the Type
/// and its ancestors when any exist, then the additional properties.
fn candidate_properties(
    graph: &VocabularyGraph,
    config: &MapperConfig,
    type_id: &str,
    overrides: &MappingOverrides,
) -> Result<IndexSet<String>> {
    let inherited = graph.property_ids_of(type_id)?;

    let mut allow: Option<IndexSet<&str>> = None;
    let lineage = std::iter::once(type_id).chain(graph.ancestors_of(type_id)?.iter().map(String::as_str));
    for ancestor in lineage {
        if let Some(list) = config.default_properties.get(ancestor) {
            allow
                .get_or_insert_with(IndexSet::new)
                .extend(list.iter().map(String::as_str));
        }
    }

    let mut candidates = IndexSet::new();
    match allow {
        None => candidates.extend(inherited.iter().cloned()),
        Some(allow) => {
            for property in inherited.iter().filter(|p| allow.contains(p.as_str())) {
                candidates.insert(property.clone());
            }
            for property in allow {
                graph.property(property)?;
                candidates.insert(property.to_string());
            }
        }
    }

    for property in &overrides.additional_properties {
        graph.property(property)?;
        candidates.insert(property.clone());
    }
    Ok(candidates)
}

fn effective_override(config: &MapperConfig, overrides: &MappingOverrides, property_id: &str) -> PropertyOverride {
    let configured = config
        .property_overrides
        .get(property_id)
        .cloned()
        .unwrap_or_default();
    match overrides.properties.get(property_id) {
        Some(call) => configured.merged(call),
        None => configured,
    }
}

fn choose(ranked: &[FieldCandidate], property_override: &PropertyOverride) -> Option<FieldCandidate> {
    match property_override.field_kind {
        Some(kind) => Some(
            ranked
                .iter()
                .find(|c| c.kind == kind)
                .cloned()
                .unwrap_or_else(|| FieldCandidate::new(kind)),
        ),
        None => ranked
            .iter()
            .find(|c| !property_override.exclude.contains(&c.kind))
            .cloned(),
    }
}

fn cardinality(config: &MapperConfig, overrides: &MappingOverrides, property_id: &str) -> Cardinality {
    if config.is_unlimited(property_id) || overrides.unlimited.contains(property_id) {
        Cardinality::Unlimited
    } else {
        Cardinality::Single
    }
}

fn reused(
    property_id: &str,
    field: &ExistingField,
    description: String,
    allowed_values: Vec<String>,
) -> PropertyDefault {
    PropertyDefault {
        property_id: property_id.to_string(),
        field_kind: field.field_kind,
        target_type: None,
        machine_name: field.machine_name.clone(),
        label: label_for(property_id),
        description,
        cardinality: field.cardinality,
        source: FieldSource::Existing,
        allowed_values,
        candidates: Vec::new(),
    }
}

/// Prefixed machine name, or the skip recorded when the length limit leaves
/// no distinct name.
fn issue_name(
    names: &mut NameTransformer,
    prefix: &str,
    property_id: &str,
) -> std::result::Result<String, SkippedProperty> {
    match names.to_machine_name(property_id) {
        Ok(name) => Ok(format!("{prefix}{name}")),
        Err(error) => {
            let error = error.track(OPERATION);
            warn!(property = %property_id, %error, "no distinct machine name within the length limit, property skipped");
            let reason = match error {
                MappingError::NameConflict {
                    machine_name,
                    bound_to,
                    ..
                } => SkipReason::NameConflict {
                    machine_name: format!("{prefix}{machine_name}"),
                    bound_to,
                },
                _ => SkipReason::Unresolvable,
            };
            Err(SkippedProperty {
                property_id: property_id.to_string(),
                reason,
            })
        }
    }
}

fn name_conflict(property_id: &str, machine_name: &str, taken: &ExistingField) -> Option<SkippedProperty> {
    if taken.bound_property.as_deref() == Some(property_id) {
        return None;
    }
    let error = MappingError::NameConflict {
        property: property_id.to_string(),
        machine_name: machine_name.to_string(),
        bound_to: taken.bound_property.clone(),
    }
    .track(OPERATION);
    warn!(property = %property_id, field = %machine_name, %error, "machine name conflict, property skipped");
    Some(SkippedProperty {
        property_id: property_id.to_string(),
        reason: SkipReason::NameConflict {
            machine_name: machine_name.to_string(),
            bound_to: taken.bound_property.clone(),
        },
    })
}
