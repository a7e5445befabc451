use crate::field_kind::FieldKind;
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DEFAULT_FIELD_PREFIX: &str = "schema_";
const DEFAULT_MAX_NAME_LENGTH: usize = 32;
const DEFAULT_DEPTH: usize = 3;
const DEFAULT_CONTEXT: &str = "https://schema.org";
/// Shortest name budget that still fits a stem and a collision suffix.
const MIN_NAME_BUDGET: usize = 4;

/// Per-property adjustments to the default proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyOverride {
    /// Leave the property out of the proposal.
    pub skip: bool,
    /// Use this kind regardless of the ranking.
    pub field_kind: Option<FieldKind>,
    /// Kinds never to propose.
    pub exclude: Vec<FieldKind>,
}

impl PropertyOverride {
    pub fn skip() -> Self {
        Self {
            skip: true,
            ..Default::default()
        }
    }

    pub fn force(kind: FieldKind) -> Self {
        Self {
            field_kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn exclude(kinds: &[FieldKind]) -> Self {
        Self {
            exclude: kinds.to_vec(),
            ..Default::default()
        }
    }

    /// Layer `other` on top of `self`; `other` wins where it says something.
    pub fn merged(&self, other: &PropertyOverride) -> PropertyOverride {
        let mut exclude = self.exclude.clone();
        for kind in &other.exclude {
            if !exclude.contains(kind) {
                exclude.push(*kind);
            }
        }
        PropertyOverride {
            skip: self.skip || other.skip,
            field_kind: other.field_kind.or(self.field_kind),
            exclude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Prefix for new field machine names.
    pub field_prefix: String,
    /// Maximum machine name length, prefix included.
    pub max_name_length: usize,
    /// Properties stored as multi-valued fields.
    pub unlimited_properties: IndexSet<String>,
    /// Type -> allow-list of default properties.
    pub default_properties: IndexMap<String, Vec<String>>,
    /// Types that get a synthetic `subtype` property.
    pub subtyped_types: IndexSet<String>,
    pub property_overrides: IndexMap<String, PropertyOverride>,
    /// Properties that prefer long text over short text.
    pub long_text_properties: IndexSet<String>,
    /// Property -> unit.
    pub units: IndexMap<String, String>,
    /// Properties emitted first, in this order.
    pub priority_properties: Vec<String>,
    pub default_depth: usize,
    pub include_identifier: bool,
    /// Context marker added by `wrap_with_context`.
    pub context: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            field_prefix: DEFAULT_FIELD_PREFIX.to_string(),
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            unlimited_properties: IndexSet::new(),
            default_properties: IndexMap::new(),
            subtyped_types: IndexSet::new(),
            property_overrides: IndexMap::new(),
            long_text_properties: IndexSet::new(),
            units: IndexMap::new(),
            priority_properties: Vec::new(),
            default_depth: DEFAULT_DEPTH,
            include_identifier: true,
            context: DEFAULT_CONTEXT.to_string(),
        }
    }
}

impl MapperConfig {
    /// Load from a YAML or JSON file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("config file {:?} does not exist", path);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let ext = path
            .extension()
            .and_then(|os| os.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let parsed: MapperConfig = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse YAML config {:?}", path))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse JSON config {:?}", path))?,
            other => anyhow::bail!("unsupported config extension: {other}"),
        };
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.max_name_length >= self.field_prefix.len() + MIN_NAME_BUDGET,
            "max_name_length {} leaves no room after prefix {:?} for a {}-character name",
            self.max_name_length,
            self.field_prefix,
            MIN_NAME_BUDGET
        );
        Ok(())
    }

    /// Room left for the transformed identifier once the prefix is applied.
    pub fn name_budget(&self) -> usize {
        self.max_name_length.saturating_sub(self.field_prefix.len()).max(1)
    }

    pub fn is_unlimited(&self, property_id: &str) -> bool {
        self.unlimited_properties.contains(property_id)
    }
}
