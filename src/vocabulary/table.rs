//! Local vocabulary definition table.
//!
//! The table is the on-disk (or embedded) form the graph is loaded from:
//! one record per Type and one record per Property, in declaration order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One vocabulary Type record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub id: String,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Enumeration members, for Types that are enumerations.
    #[serde(default)]
    pub members: Vec<String>,
}

/// One vocabulary Property record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    #[serde(default)]
    pub range_includes: Vec<String>,
    #[serde(default)]
    pub domain_includes: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Unit-table key (a unit string such as `kg`).
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyTable {
    #[serde(default)]
    pub types: Vec<TypeRecord>,
    #[serde(default)]
    pub properties: Vec<PropertyRecord>,
}

impl VocabularyTable {
    /// Load a table from a YAML or JSON file, picked by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read vocabulary table {:?}", path))?;
        let ext = path
            .extension()
            .and_then(|os| os.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let table = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse YAML vocabulary {:?}", path))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse JSON vocabulary {:?}", path))?,
            other => anyhow::bail!("unsupported vocabulary table extension: {other}"),
        };
        Ok(table)
    }

    pub fn with_type(mut self, id: &str, supertypes: &[&str]) -> Self {
        self.types.push(TypeRecord {
            id: id.to_string(),
            supertypes: supertypes.iter().map(|s| s.to_string()).collect(),
            description: String::new(),
            members: Vec::new(),
        });
        self
    }

    pub fn with_enumeration(mut self, id: &str, supertypes: &[&str], members: &[&str]) -> Self {
        self.types.push(TypeRecord {
            id: id.to_string(),
            supertypes: supertypes.iter().map(|s| s.to_string()).collect(),
            description: String::new(),
            members: members.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_property(mut self, id: &str, domain: &[&str], range: &[&str]) -> Self {
        self.properties.push(PropertyRecord {
            id: id.to_string(),
            range_includes: range.iter().map(|s| s.to_string()).collect(),
            domain_includes: domain.iter().map(|s| s.to_string()).collect(),
            description: String::new(),
            unit: None,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_yaml_table() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "types:\n  - id: Thing\n  - id: Person\n    supertypes: [Thing]\nproperties:\n  - id: name\n    domain_includes: [Thing]\n    range_includes: [Text]\n  - id: weight\n    unit: kg"
        )
        .unwrap();

        let table = VocabularyTable::load(file.path()).unwrap();
        assert_eq!(table.types.len(), 2);
        assert_eq!(table.types[1].supertypes, vec!["Thing"]);
        assert_eq!(table.properties[1].unit.as_deref(), Some("kg"));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let err = VocabularyTable::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }
}
