//! Vocabulary graph integrity
//!
//! - Flattened property sets hold every inherited declaration exactly once
//! - Ancestor declarations precede the Type's own, nearest ancestor first
//! - Broken tables are rejected and a failed reload keeps the old graph

mod support;

use assert_matches::assert_matches;
use proptest::prelude::*;
use std::collections::HashSet;
use vocab_mapper::{MappingError, VocabularyGraph, VocabularyRegistry, VocabularyTable};

// =============================================================================
// Fixture Vocabulary
// =============================================================================

#[test]
fn test_fixture_ancestors_nearest_first() {
    let registry = support::registry();
    let graph = registry.current();

    assert_eq!(
        graph.ancestors_of("Patient").unwrap(),
        ["MedicalAudience", "Person", "PeopleAudience", "Thing", "Audience", "Intangible"]
    );
    assert!(graph.ancestors_of("Thing").unwrap().is_empty());
    assert!(graph.is_subtype_of("Patient", "Audience").unwrap());
    assert!(!graph.is_subtype_of("Person", "Audience").unwrap());
}

#[test]
fn test_fixture_diamond_properties_flattened_once() {
    let registry = support::registry();
    let graph = registry.current();

    let ids: Vec<&str> = graph
        .properties_of("Patient")
        .unwrap()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "birthDate",
            "gender",
            "weight",
            "height",
            "knows",
            "parent",
            "children",
            "worksFor",
            "healthCondition",
            "name",
            "description",
            "url",
            "identifier",
            "isAccessibleForFree",
            "audienceType",
        ]
    );
    // Thing is reachable through both Person and PeopleAudience.
    assert_eq!(ids.iter().filter(|id| **id == "name").count(), 1);
}

#[test]
fn test_fixture_subtypes_and_enumerations() {
    let registry = support::registry();
    let graph = registry.current();

    assert_eq!(graph.subtypes_of("Person").unwrap(), ["Patient"]);
    assert_eq!(graph.enumeration_members("GenderType").unwrap(), ["Male", "Female"]);
    assert!(graph.descendants_of("Audience").unwrap().contains(&"Patient"));

    let domain: Vec<&str> = graph
        .types_of("healthCondition")
        .unwrap()
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(&domain[..2], ["Patient", "PeopleAudience"]);
    assert!(domain.contains(&"MedicalAudience"));
}

#[test]
fn test_unknown_identifiers_are_reported() {
    let registry = support::registry();
    let graph = registry.current();

    assert_matches!(graph.ancestors_of("Widget"), Err(MappingError::UnknownIdentifier { .. }));
    assert_matches!(graph.property("colour"), Err(MappingError::UnknownIdentifier { .. }));
    assert!(graph.type_def("Widget").unwrap_err().is_fatal());
}

// =============================================================================
// Table Validation
// =============================================================================

#[test]
fn test_cyclic_supertypes_rejected() {
    let table = VocabularyTable::default()
        .with_type("A", &["B"])
        .with_type("B", &["A"]);
    assert_matches!(VocabularyGraph::from_table(table), Err(MappingError::InvalidVocabulary(_)));
}

#[test]
fn test_undefined_references_rejected() {
    let table = VocabularyTable::default().with_type("A", &["Missing"]);
    assert_matches!(VocabularyGraph::from_table(table), Err(MappingError::InvalidVocabulary(_)));

    let table = VocabularyTable::default()
        .with_type("A", &[])
        .with_property("p", &["A"], &["Missing"]);
    assert_matches!(VocabularyGraph::from_table(table), Err(MappingError::InvalidVocabulary(_)));
}

#[test]
fn test_failed_reload_keeps_current_graph() {
    let registry = support::registry();
    assert_eq!(registry.version(), 1);

    let broken = VocabularyTable::default()
        .with_type("A", &["B"])
        .with_type("B", &["A"]);
    assert!(registry.reload(broken).is_err());
    assert_eq!(registry.version(), 1);
    assert!(registry.current().contains_type("Patient"));

    let next = registry.reload(support::vocabulary_table()).unwrap();
    assert_eq!(next, 2);
    assert_eq!(registry.current().version(), 2);
    assert_matches!(
        registry.ensure_current(1),
        Err(MappingError::StaleVocabulary { expected: 1, current: 2 })
    );
}

#[test]
fn test_json_table_loads_like_yaml() {
    let yaml = support::vocabulary_table();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocabulary.json");
    std::fs::write(&path, serde_json::to_string(&yaml).unwrap()).unwrap();

    let json = VocabularyTable::load(&path).unwrap();
    assert_eq!(json, yaml);
    assert!(VocabularyRegistry::new(json).is_ok());
}

// =============================================================================
// Property-Based Flattening Invariants
// =============================================================================

/// Random acyclic vocabulary: type `Ti` may only extend types declared before
/// it, and each property is declared on one or two random types.
fn arb_table() -> impl Strategy<Value = VocabularyTable> {
    (2usize..10)
        .prop_flat_map(|type_count| {
            let supertypes = proptest::collection::vec(
                proptest::collection::vec(any::<prop::sample::Index>(), 0..3),
                type_count,
            );
            let properties = proptest::collection::vec(
                proptest::collection::vec(any::<prop::sample::Index>(), 1..3),
                0..12,
            );
            (Just(type_count), supertypes, properties)
        })
        .prop_map(|(type_count, supertypes, properties)| {
            let mut table = VocabularyTable::default().with_type("Text", &[]);
            for (i, parents) in supertypes.iter().enumerate() {
                let mut chosen: Vec<String> = Vec::new();
                if i > 0 {
                    for index in parents {
                        let parent = format!("T{}", index.index(i));
                        if !chosen.contains(&parent) {
                            chosen.push(parent);
                        }
                    }
                }
                let refs: Vec<&str> = chosen.iter().map(String::as_str).collect();
                table = table.with_type(&format!("T{i}"), &refs);
            }
            for (j, domain) in properties.iter().enumerate() {
                let mut chosen: Vec<String> = Vec::new();
                for index in domain {
                    let ty = format!("T{}", index.index(type_count));
                    if !chosen.contains(&ty) {
                        chosen.push(ty);
                    }
                }
                let refs: Vec<&str> = chosen.iter().map(String::as_str).collect();
                table = table.with_property(&format!("p{j}"), &refs, &["Text"]);
            }
            table
        })
}

proptest! {
    #[test]
    fn prop_properties_of_is_exact_union(table in arb_table()) {
        let graph = VocabularyGraph::from_table(table).unwrap();

        for ty in graph.types() {
            let flattened = graph.property_ids_of(&ty.id).unwrap();
            let unique: HashSet<&String> = flattened.iter().collect();
            prop_assert_eq!(unique.len(), flattened.len());

            let mut expected: HashSet<&String> = HashSet::new();
            for lineage in graph.ancestors_of(&ty.id).unwrap().iter().chain(std::iter::once(&ty.id)) {
                expected.extend(graph.declared_properties_of(lineage).unwrap());
            }
            prop_assert_eq!(unique, expected);
        }
    }

    #[test]
    fn prop_ancestor_declarations_precede_own(table in arb_table()) {
        let graph = VocabularyGraph::from_table(table).unwrap();

        for ty in graph.types() {
            let lineage: Vec<&String> = graph
                .ancestors_of(&ty.id)
                .unwrap()
                .iter()
                .chain(std::iter::once(&ty.id))
                .collect();
            let first_declarer = |property: &String| {
                lineage
                    .iter()
                    .position(|t| graph.declared_properties_of(t).unwrap().contains(property))
                    .unwrap()
            };

            let positions: Vec<usize> = graph
                .property_ids_of(&ty.id)
                .unwrap()
                .iter()
                .map(first_declarer)
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn prop_ancestors_exclude_self_and_repeat_nothing(table in arb_table()) {
        let graph = VocabularyGraph::from_table(table).unwrap();

        for ty in graph.types() {
            let ancestors = graph.ancestors_of(&ty.id).unwrap();
            prop_assert!(!ancestors.contains(&ty.id));
            let unique: HashSet<&String> = ancestors.iter().collect();
            prop_assert_eq!(unique.len(), ancestors.len());
            prop_assert_eq!(graph.specificity(&ty.id).unwrap(), ancestors.len());
        }
    }
}
