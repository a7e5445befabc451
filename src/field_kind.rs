//! Field kind selection for vocabulary properties.
//!
//! Each range Type of a property is classified by walking its own id and then
//! its flattened ancestors against a fixed root table (`URL` is checked
//! before `Text`, `Integer` refines `Number`). Anything that hits no root is an
//! entity. Candidates are ranked by a fixed precedence so the most specific
//! storage comes first and text or untyped references come last.

use crate::error::Result;
use crate::vocabulary::{Property, VocabularyGraph};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Content-model storage primitives.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FieldKind {
    TextShort,
    TextLong,
    NumberInteger,
    NumberDecimal,
    Boolean,
    Date,
    Url,
    EntityReference,
    EnumerationReference,
}

impl FieldKind {
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldKind::EntityReference | FieldKind::EnumerationReference)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FieldKind::TextShort | FieldKind::TextLong)
    }
}

/// Value-range categories a range Type classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum RangeCategory {
    Text,
    Number,
    Boolean,
    DateTime,
    Url,
    Enumeration,
    Entity,
}

/// Root Types and the category anything inheriting from them falls into.
const CATEGORY_ROOTS: &[(&str, RangeCategory)] = &[
    ("URL", RangeCategory::Url),
    ("Text", RangeCategory::Text),
    ("Number", RangeCategory::Number),
    ("Boolean", RangeCategory::Boolean),
    ("Date", RangeCategory::DateTime),
    ("DateTime", RangeCategory::DateTime),
    ("Time", RangeCategory::DateTime),
    ("Enumeration", RangeCategory::Enumeration),
];

const INTEGER_TYPE: &str = "Integer";

/// One ranked choice: a kind plus the Type a reference should target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

impl FieldCandidate {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            target_type: None,
        }
    }

    pub fn targeting(kind: FieldKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target_type: Some(target.into()),
        }
    }

    /// Text kinds and untyped references.
    pub fn is_generic(&self) -> bool {
        self.kind.is_text() || (self.kind == FieldKind::EntityReference && self.target_type.is_none())
    }
}

/// Candidates split for choice UIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateGroups {
    pub recommended: Vec<FieldCandidate>,
    pub general: Vec<FieldCandidate>,
}

pub struct FieldKindSelector<'g> {
    graph: &'g VocabularyGraph,
    long_text: Option<&'g IndexSet<String>>,
}

impl<'g> FieldKindSelector<'g> {
    pub fn new(graph: &'g VocabularyGraph) -> Self {
        Self {
            graph,
            long_text: None,
        }
    }

    /// Properties in `long_text` rank `text-long` ahead of `text-short`.
    pub fn with_long_text(mut self, long_text: &'g IndexSet<String>) -> Self {
        self.long_text = Some(long_text);
        self
    }

    /// Classify one range Type.
    pub fn classify(&self, range_type: &str) -> Result<RangeCategory> {
        let ancestors = self.graph.ancestors_of(range_type)?;
        let chain = std::iter::once(range_type).chain(ancestors.iter().map(String::as_str));
        for type_id in chain {
            if let Some((_, category)) = CATEGORY_ROOTS.iter().find(|(root, _)| *root == type_id) {
                return Ok(*category);
            }
        }
        Ok(RangeCategory::Entity)
    }

    /// Ranked candidates for a property. Identical definitions always give
    /// identical output.
    pub fn select(&self, property: &Property) -> Result<Vec<FieldCandidate>> {
        let long_text = self
            .long_text
            .is_some_and(|set| set.contains(&property.id));

        let mut ranked: Vec<(u8, Reverse<usize>, FieldCandidate)> = Vec::new();
        for range in &property.range_includes {
            let category = self.classify(range)?;
            for candidate in self.candidates_for(range, category)? {
                let specificity = match (&candidate.kind, &candidate.target_type) {
                    (FieldKind::EntityReference, Some(target)) => self.graph.specificity(target)?,
                    _ => 0,
                };
                let rank = precedence(&candidate, long_text);
                ranked.push((rank, Reverse(specificity), candidate));
            }
        }
        if ranked.is_empty() {
            for kind in [FieldKind::TextShort, FieldKind::TextLong] {
                let candidate = FieldCandidate::new(kind);
                ranked.push((precedence(&candidate, long_text), Reverse(0), candidate));
            }
        }

        ranked.sort_by_key(|(rank, specificity, _)| (*rank, *specificity));

        let mut seen = IndexSet::new();
        for (_, _, candidate) in ranked {
            seen.insert(candidate);
        }
        Ok(seen.into_iter().collect())
    }

    fn candidates_for(&self, range: &str, category: RangeCategory) -> Result<Vec<FieldCandidate>> {
        let candidates = match category {
            RangeCategory::Text => vec![
                FieldCandidate::new(FieldKind::TextShort),
                FieldCandidate::new(FieldKind::TextLong),
            ],
            RangeCategory::Number => {
                if self.graph.is_subtype_of(range, INTEGER_TYPE).unwrap_or(false) {
                    vec![FieldCandidate::new(FieldKind::NumberInteger)]
                } else {
                    vec![FieldCandidate::new(FieldKind::NumberDecimal)]
                }
            }
            RangeCategory::Boolean => vec![FieldCandidate::new(FieldKind::Boolean)],
            RangeCategory::DateTime => vec![FieldCandidate::new(FieldKind::Date)],
            RangeCategory::Url => vec![FieldCandidate::new(FieldKind::Url)],
            RangeCategory::Enumeration => vec![FieldCandidate::targeting(
                FieldKind::EnumerationReference,
                range,
            )],
            RangeCategory::Entity => {
                if self.graph.type_def(range)?.is_root() {
                    vec![FieldCandidate::new(FieldKind::EntityReference)]
                } else {
                    vec![FieldCandidate::targeting(FieldKind::EntityReference, range)]
                }
            }
        };
        Ok(candidates)
    }
}

fn precedence(candidate: &FieldCandidate, long_text: bool) -> u8 {
    match candidate.kind {
        FieldKind::EntityReference if candidate.target_type.is_some() => 0,
        FieldKind::EnumerationReference => 1,
        FieldKind::Date => 2,
        FieldKind::NumberInteger => 3,
        FieldKind::NumberDecimal => 4,
        FieldKind::Boolean => 5,
        FieldKind::Url => 6,
        FieldKind::EntityReference => 7,
        FieldKind::TextShort if long_text => 9,
        FieldKind::TextShort => 8,
        FieldKind::TextLong if long_text => 8,
        FieldKind::TextLong => 9,
    }
}

/// Split a ranking into recommended and general groups, keeping order.
pub fn group(candidates: &[FieldCandidate]) -> CandidateGroups {
    let (general, recommended): (Vec<_>, Vec<_>) =
        candidates.iter().cloned().partition(FieldCandidate::is_generic);
    CandidateGroups {
        recommended,
        general,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::VocabularyTable;
    use std::str::FromStr;

    fn graph() -> VocabularyGraph {
        let table = VocabularyTable::default()
            .with_type("Thing", &[])
            .with_type("DataType", &[])
            .with_type("Text", &["DataType"])
            .with_type("URL", &["Text"])
            .with_type("Number", &["DataType"])
            .with_type("Integer", &["Number"])
            .with_type("Boolean", &["DataType"])
            .with_type("Date", &["DataType"])
            .with_type("Intangible", &["Thing"])
            .with_type("Enumeration", &["Intangible"])
            .with_enumeration("GenderType", &["Enumeration"], &["Male", "Female"])
            .with_type("Person", &["Thing"])
            .with_type("Organization", &["Thing"])
            .with_type("Patient", &["Person"])
            .with_property("name", &["Thing"], &["Text"])
            .with_property("url", &["Thing"], &["URL"])
            .with_property("numberOfEmployees", &["Organization"], &["Integer", "Text"])
            .with_property("gender", &["Person"], &["GenderType", "Text"])
            .with_property("knows", &["Person"], &["Person", "Thing", "Patient"])
            .with_property("description", &["Thing"], &["Text"])
            .with_property("note", &["Thing"], &[]);
        VocabularyGraph::from_table(table).unwrap()
    }

    fn kinds(candidates: &[FieldCandidate]) -> Vec<FieldKind> {
        candidates.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_classification() {
        let graph = graph();
        let selector = FieldKindSelector::new(&graph);
        assert_eq!(selector.classify("URL").unwrap(), RangeCategory::Url);
        assert_eq!(selector.classify("Integer").unwrap(), RangeCategory::Number);
        assert_eq!(selector.classify("GenderType").unwrap(), RangeCategory::Enumeration);
        assert_eq!(selector.classify("Patient").unwrap(), RangeCategory::Entity);
    }

    #[test]
    fn test_text_sorts_after_specific_kinds() {
        let graph = graph();
        let selector = FieldKindSelector::new(&graph);
        let employees = selector.select(graph.property("numberOfEmployees").unwrap()).unwrap();
        assert_eq!(
            kinds(&employees),
            vec![FieldKind::NumberInteger, FieldKind::TextShort, FieldKind::TextLong]
        );

        let gender = selector.select(graph.property("gender").unwrap()).unwrap();
        assert_eq!(
            gender[0],
            FieldCandidate::targeting(FieldKind::EnumerationReference, "GenderType")
        );
    }

    #[test]
    fn test_entity_references_prefer_most_specific_target() {
        let graph = graph();
        let selector = FieldKindSelector::new(&graph);
        let knows = selector.select(graph.property("knows").unwrap()).unwrap();
        assert_eq!(
            knows,
            vec![
                FieldCandidate::targeting(FieldKind::EntityReference, "Patient"),
                FieldCandidate::targeting(FieldKind::EntityReference, "Person"),
                FieldCandidate::new(FieldKind::EntityReference),
            ]
        );

        let groups = group(&knows);
        assert_eq!(groups.recommended.len(), 2);
        assert_eq!(groups.general, vec![FieldCandidate::new(FieldKind::EntityReference)]);
    }

    #[test]
    fn test_long_text_and_empty_range() {
        let graph = graph();
        let long_text: IndexSet<String> = ["description".to_string()].into_iter().collect();
        let selector = FieldKindSelector::new(&graph).with_long_text(&long_text);
        let description = selector.select(graph.property("description").unwrap()).unwrap();
        assert_eq!(kinds(&description), vec![FieldKind::TextLong, FieldKind::TextShort]);

        let note = selector.select(graph.property("note").unwrap()).unwrap();
        assert_eq!(kinds(&note), vec![FieldKind::TextShort, FieldKind::TextLong]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let graph = graph();
        let selector = FieldKindSelector::new(&graph);
        for property in graph.properties() {
            assert_eq!(selector.select(property).unwrap(), selector.select(property).unwrap());
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(FieldKind::EntityReference.to_string(), "entity-reference");
        assert_eq!(FieldKind::from_str("number-decimal").unwrap(), FieldKind::NumberDecimal);
    }
}
