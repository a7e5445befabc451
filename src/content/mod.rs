//! Content model collaborator interface.
//!
//! The core never stores content. It reads the fields a container already has,
//! and reads values from instances, through [`ContentStore`].

pub mod memory;

pub use memory::MemoryContentStore;

use crate::field_kind::FieldKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete bundle/type in the content model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One content instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pub container: ContainerId,
    pub id: String,
}

impl EntityHandle {
    pub fn new(container: impl Into<ContainerId>, id: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.container, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    Unlimited,
}

/// A field already present on a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingField {
    pub machine_name: String,
    pub field_kind: FieldKind,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Property this field is recorded as storing, if any.
    #[serde(default)]
    pub bound_property: Option<String>,
}

impl ExistingField {
    pub fn new(machine_name: impl Into<String>, field_kind: FieldKind) -> Self {
        Self {
            machine_name: machine_name.into(),
            field_kind,
            cardinality: Cardinality::Single,
            bound_property: None,
        }
    }

    pub fn bound_to(mut self, property: impl Into<String>) -> Self {
        self.bound_property = Some(property.into());
        self
    }

    pub fn unlimited(mut self) -> Self {
        self.cardinality = Cardinality::Unlimited;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl Scalar {
    /// Integers, finite decimals, and text that parses as a finite number.
    pub fn is_numeric_looking(&self) -> bool {
        match self {
            Scalar::Integer(_) => true,
            Scalar::Decimal(value) => value.is_finite(),
            Scalar::Text(text) => text.trim().parse::<f64>().is_ok_and(f64::is_finite),
            Scalar::Boolean(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(value) => write!(f, "{value}"),
            Scalar::Integer(value) => write!(f, "{value}"),
            Scalar::Decimal(value) => write!(f, "{value}"),
            Scalar::Text(value) => write!(f, "{}", value.trim()),
        }
    }
}

/// What a field holds on one instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Nothing,
    Scalar(Scalar),
    Reference(EntityHandle),
    Sequence(Vec<FieldValue>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Scalar(Scalar::Text(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        FieldValue::Scalar(Scalar::Integer(value))
    }

    pub fn reference(container: &str, id: &str) -> Self {
        FieldValue::Reference(EntityHandle::new(container, id))
    }

    /// Non-empty leaf values in order, with nested sequences flattened.
    pub fn items(&self) -> Vec<&FieldValue> {
        let mut out = Vec::new();
        self.collect_items(&mut out);
        out
    }

    fn collect_items<'a>(&'a self, out: &mut Vec<&'a FieldValue>) {
        match self {
            FieldValue::Nothing => {}
            FieldValue::Scalar(scalar) if scalar.is_empty() => {}
            FieldValue::Sequence(values) => values.iter().for_each(|v| v.collect_items(out)),
            leaf => out.push(leaf),
        }
    }
}

/// One identifier of an instance, emitted as a `PropertyValue` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub property_id: String,
    pub value: String,
}

/// Reads container shape and instance values from the content model.
///
/// Implementations report read failures as [`FieldValue::Nothing`]; the core
/// treats a value it cannot read the same as an empty one.
pub trait ContentStore {
    fn existing_fields(&self, container: &ContainerId) -> Vec<ExistingField>;

    fn read_value(&self, entity: &EntityHandle, machine_name: &str) -> FieldValue;

    fn stable_id(&self, entity: &EntityHandle) -> String;

    fn display_name(&self, entity: &EntityHandle) -> String;

    /// Every identifier kind of an instance. Defaults to the stable id as `uuid`.
    fn identifiers(&self, entity: &EntityHandle) -> Vec<Identifier> {
        vec![Identifier {
            property_id: "uuid".to_string(),
            value: self.stable_id(entity),
        }]
    }
}
