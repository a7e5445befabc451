//! Proposal structures returned by the resolver.

use crate::config::PropertyOverride;
use crate::content::Cardinality;
use crate::error::MappingError;
use crate::field_kind::{FieldCandidate, FieldKind};
use crate::mapping::repository::PropertyFieldCorrespondence;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Caller-supplied adjustments for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOverrides {
    /// Layered over the configured per-property overrides.
    pub properties: IndexMap<String, PropertyOverride>,
    /// Properties proposed on top of the Type's own set.
    pub additional_properties: Vec<String>,
    /// Force the synthetic subtype property on or off.
    pub subtype: Option<bool>,
    /// Extra properties to store as multi-valued.
    pub unlimited: IndexSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    /// Reuses a field already bound to the property.
    Existing,
    /// Proposes creating a field.
    New,
}

/// The proposal for one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefault {
    pub property_id: String,
    pub field_kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    pub machine_name: String,
    pub label: String,
    pub description: String,
    pub cardinality: Cardinality,
    pub source: FieldSource,
    /// Permitted values for enumeration-backed fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    /// Full ranking the choice was taken from; empty for reused fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<FieldCandidate>,
}

impl PropertyDefault {
    pub fn is_existing(&self) -> bool {
        self.source == FieldSource::Existing
    }

    pub fn correspondence(&self) -> PropertyFieldCorrespondence {
        PropertyFieldCorrespondence::new(&self.property_id, &self.machine_name, self.cardinality)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NameConflict {
        machine_name: String,
        bound_to: Option<String>,
    },
    Unresolvable,
    /// Skipped by an override.
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedProperty {
    pub property_id: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl SkippedProperty {
    /// The error this skip stands for; override exclusions are not errors.
    pub fn to_error(&self) -> Option<MappingError> {
        match &self.reason {
            SkipReason::NameConflict {
                machine_name,
                bound_to,
            } => Some(MappingError::NameConflict {
                property: self.property_id.clone(),
                machine_name: machine_name.clone(),
                bound_to: bound_to.clone(),
            }),
            SkipReason::Unresolvable => Some(MappingError::UnresolvableProperty {
                property: self.property_id.clone(),
            }),
            SkipReason::Excluded => None,
        }
    }
}

/// Recomputable proposal for binding a container to a vocabulary Type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDefaults {
    pub type_id: String,
    pub type_label: String,
    pub type_description: String,
    /// Suggested machine name for a new container of this Type.
    pub container_name: String,
    /// Version of the vocabulary graph this was computed against.
    pub vocabulary_version: u64,
    pub subtype: bool,
    pub additional_properties: Vec<String>,
    pub properties: Vec<PropertyDefault>,
    pub skipped: Vec<SkippedProperty>,
}

impl MappingDefaults {
    pub fn property(&self, property_id: &str) -> Option<&PropertyDefault> {
        self.properties.iter().find(|p| p.property_id == property_id)
    }

    pub fn skipped(&self, property_id: &str) -> Option<&SkippedProperty> {
        self.skipped.iter().find(|s| s.property_id == property_id)
    }

    pub fn existing(&self) -> impl Iterator<Item = &PropertyDefault> {
        self.properties.iter().filter(|p| p.is_existing())
    }

    pub fn new_fields(&self) -> impl Iterator<Item = &PropertyDefault> {
        self.properties.iter().filter(|p| !p.is_existing())
    }

    pub fn correspondences(&self) -> Vec<PropertyFieldCorrespondence> {
        self.properties.iter().map(PropertyDefault::correspondence).collect()
    }

    /// Errors behind the skipped properties.
    pub fn errors(&self) -> Vec<MappingError> {
        self.skipped.iter().filter_map(SkippedProperty::to_error).collect()
    }
}
