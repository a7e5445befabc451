//! Read-only vocabulary graph with pre-flattened inheritance.
//!
//! # Flattening
//!
//! Every Type gets two caches computed once at load:
//! - its ancestor order: direct supertypes first, then theirs, breadth-first,
//!   duplicates removed with the first occurrence kept
//! - its property order: properties declared on each ancestor (in ancestor
//!   order), then its own, each property appearing once
//!
//! The ancestor order is the tie-break used wherever inheritance must be
//! flattened, so `properties_of` is a lookup rather than a graph walk.

use crate::error::{MappingError, Result};
use crate::vocabulary::table::VocabularyTable;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

static EMPTY_IDS: &[String] = &[];

/// A vocabulary class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyType {
    pub id: String,
    pub supertypes: SmallVec<[String; 2]>,
    pub description: String,
    pub members: Vec<String>,
}

impl VocabularyType {
    pub fn is_root(&self) -> bool {
        self.supertypes.is_empty()
    }
}

/// A vocabulary attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub id: String,
    pub range_includes: Vec<String>,
    pub domain_includes: Vec<String>,
    pub description: String,
    pub unit: Option<String>,
}

#[derive(Debug)]
pub struct VocabularyGraph {
    version: u64,
    types: IndexMap<String, VocabularyType>,
    properties: IndexMap<String, Property>,
    /// Type -> flattened ancestors (not including the type itself)
    ancestors: HashMap<String, Arc<[String]>>,
    /// Type -> immediate subtypes, in table order
    direct_subtypes: HashMap<String, SmallVec<[String; 4]>>,
    /// Type -> properties naming it in their domain, in table order
    declared: HashMap<String, Vec<String>>,
    /// Type -> inherited-then-own property ids
    flattened: HashMap<String, Arc<[String]>>,
}

impl VocabularyGraph {
    /// Build a graph from a definition table.
    ///
    /// Fails with `InvalidVocabulary` on duplicate ids, references to
    /// undefined Types, or a cyclic supertype graph.
    pub fn from_table(table: VocabularyTable) -> Result<Self> {
        let mut types: IndexMap<String, VocabularyType> = IndexMap::new();
        for record in table.types {
            if types.contains_key(&record.id) {
                return Err(MappingError::InvalidVocabulary(format!(
                    "type '{}' is defined twice",
                    record.id
                )));
            }
            types.insert(
                record.id.clone(),
                VocabularyType {
                    id: record.id,
                    supertypes: record.supertypes.into_iter().collect(),
                    description: record.description,
                    members: record.members,
                },
            );
        }

        let mut direct_subtypes: HashMap<String, SmallVec<[String; 4]>> = HashMap::new();
        for ty in types.values() {
            for parent in &ty.supertypes {
                if !types.contains_key(parent) {
                    return Err(MappingError::InvalidVocabulary(format!(
                        "type '{}' names undefined supertype '{}'",
                        ty.id, parent
                    )));
                }
                direct_subtypes
                    .entry(parent.clone())
                    .or_default()
                    .push(ty.id.clone());
            }
        }
        check_acyclic(&types)?;

        let mut properties: IndexMap<String, Property> = IndexMap::new();
        let mut declared: HashMap<String, Vec<String>> = HashMap::new();
        for record in table.properties {
            if properties.contains_key(&record.id) {
                return Err(MappingError::InvalidVocabulary(format!(
                    "property '{}' is defined twice",
                    record.id
                )));
            }
            for type_id in record.domain_includes.iter().chain(&record.range_includes) {
                if !types.contains_key(type_id) {
                    return Err(MappingError::InvalidVocabulary(format!(
                        "property '{}' names undefined type '{}'",
                        record.id, type_id
                    )));
                }
            }
            for type_id in &record.domain_includes {
                declared
                    .entry(type_id.clone())
                    .or_default()
                    .push(record.id.clone());
            }
            properties.insert(
                record.id.clone(),
                Property {
                    id: record.id,
                    range_includes: record.range_includes,
                    domain_includes: record.domain_includes,
                    description: record.description,
                    unit: record.unit,
                },
            );
        }

        let ancestors: HashMap<String, Arc<[String]>> = types
            .keys()
            .map(|id| (id.clone(), compute_ancestors(id, &types).into()))
            .collect();

        let flattened = types
            .keys()
            .map(|id| {
                let mut seen = HashSet::new();
                let mut props = Vec::new();
                let own = std::iter::once(id);
                for type_id in ancestors[id].iter().chain(own) {
                    for prop in declared.get(type_id).map(Vec::as_slice).unwrap_or(EMPTY_IDS) {
                        if seen.insert(prop.as_str()) {
                            props.push(prop.clone());
                        }
                    }
                }
                (id.clone(), Arc::<[String]>::from(props))
            })
            .collect();

        tracing::debug!(
            types = types.len(),
            properties = properties.len(),
            "vocabulary graph flattened"
        );

        Ok(Self {
            version: 0,
            types,
            properties,
            ancestors,
            direct_subtypes,
            declared,
            flattened,
        })
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Version assigned by the registry that loaded this graph.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn type_def(&self, type_id: &str) -> Result<&VocabularyType> {
        self.types
            .get(type_id)
            .ok_or_else(|| MappingError::unknown_type(type_id))
    }

    pub fn property(&self, property_id: &str) -> Result<&Property> {
        self.properties
            .get(property_id)
            .ok_or_else(|| MappingError::unknown_property(property_id))
    }

    pub fn contains_type(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn contains_property(&self, property_id: &str) -> bool {
        self.properties.contains_key(property_id)
    }

    pub fn types(&self) -> impl Iterator<Item = &VocabularyType> {
        self.types.values()
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Flattened ancestors of a Type, nearest first.
    pub fn ancestors_of(&self, type_id: &str) -> Result<&[String]> {
        self.ancestors
            .get(type_id)
            .map(|arc| arc.as_ref())
            .ok_or_else(|| MappingError::unknown_type(type_id))
    }

    /// Own and inherited properties: ancestors' declarations first, in
    /// ancestor order, then the Type's own.
    pub fn properties_of(&self, type_id: &str) -> Result<Vec<&Property>> {
        Ok(self
            .property_ids_of(type_id)?
            .iter()
            .map(|id| &self.properties[id.as_str()])
            .collect())
    }

    pub fn property_ids_of(&self, type_id: &str) -> Result<&[String]> {
        self.flattened
            .get(type_id)
            .map(|arc| arc.as_ref())
            .ok_or_else(|| MappingError::unknown_type(type_id))
    }

    /// Properties whose domain names this Type directly.
    pub fn declared_properties_of(&self, type_id: &str) -> Result<&[String]> {
        self.type_def(type_id)?;
        Ok(self
            .declared
            .get(type_id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_IDS))
    }

    /// Immediate subtypes only.
    pub fn subtypes_of(&self, type_id: &str) -> Result<&[String]> {
        self.type_def(type_id)?;
        Ok(self
            .direct_subtypes
            .get(type_id)
            .map(|sv| sv.as_slice())
            .unwrap_or(EMPTY_IDS))
    }

    /// All transitive subtypes, breadth-first.
    pub fn descendants_of(&self, type_id: &str) -> Result<Vec<&str>> {
        self.type_def(type_id)?;
        let mut visited: HashSet<&str> = HashSet::from([type_id]);
        let mut queue: VecDeque<&str> = VecDeque::from([type_id]);
        let mut result = Vec::new();
        while let Some(current) = queue.pop_front() {
            for child in self.direct_subtypes.get(current).into_iter().flatten() {
                if visited.insert(child.as_str()) {
                    result.push(child.as_str());
                    queue.push_back(child.as_str());
                }
            }
        }
        Ok(result)
    }

    /// Types carrying a property, closest declaring Type first: the declared
    /// domain in table order, then the subtypes inheriting it.
    pub fn types_of(&self, property_id: &str) -> Result<Vec<&VocabularyType>> {
        let property = self.property(property_id)?;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut ordered: Vec<&str> = Vec::new();
        for domain in &property.domain_includes {
            if seen.insert(domain.as_str()) {
                ordered.push(domain.as_str());
            }
        }
        for domain in &property.domain_includes {
            for descendant in self.descendants_of(domain)? {
                if seen.insert(descendant) {
                    ordered.push(descendant);
                }
            }
        }
        Ok(ordered.into_iter().map(|id| &self.types[id]).collect())
    }

    /// True when `type_id` is `ancestor` or inherits from it.
    pub fn is_subtype_of(&self, type_id: &str, ancestor: &str) -> Result<bool> {
        Ok(type_id == ancestor || self.ancestors_of(type_id)?.iter().any(|a| a == ancestor))
    }

    /// Number of flattened ancestors; larger means more specific.
    pub fn specificity(&self, type_id: &str) -> Result<usize> {
        Ok(self.ancestors_of(type_id)?.len())
    }

    pub fn enumeration_members(&self, type_id: &str) -> Result<&[String]> {
        Ok(&self.type_def(type_id)?.members)
    }
}

fn compute_ancestors(start: &str, types: &IndexMap<String, VocabularyType>) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut result = Vec::new();

    for parent in &types[start].supertypes {
        queue.push_back(parent.as_str());
    }
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        result.push(current.to_string());
        for parent in &types[current].supertypes {
            queue.push_back(parent.as_str());
        }
    }
    result
}

fn check_acyclic(types: &IndexMap<String, VocabularyType>) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        id: &'a str,
        types: &'a IndexMap<String, VocabularyType>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<()> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(MappingError::InvalidVocabulary(format!(
                    "supertype cycle through '{id}'"
                )));
            }
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        for parent in &types[id].supertypes {
            visit(parent, types, marks)?;
        }
        marks.insert(id, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    for id in types.keys() {
        visit(id, types, &mut marks)?;
    }
    Ok(())
}
