//! Unit lookup for numeric property values.

use crate::content::Scalar;
use crate::vocabulary::VocabularyGraph;
use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct UnitAnnotator {
    units: IndexMap<String, String>,
}

impl UnitAnnotator {
    pub fn new(units: IndexMap<String, String>) -> Self {
        Self { units }
    }

    /// Unit keys declared on vocabulary properties, overlaid by the
    /// configured table.
    pub fn from_graph(graph: &VocabularyGraph, configured: &IndexMap<String, String>) -> Self {
        let mut units: IndexMap<String, String> = graph
            .properties()
            .filter_map(|p| p.unit.as_ref().map(|unit| (p.id.clone(), unit.clone())))
            .collect();
        for (property, unit) in configured {
            units.insert(property.clone(), unit.clone());
        }
        Self { units }
    }

    /// Unit for a value, or `None` when no unit is configured or the value
    /// does not look numeric.
    pub fn unit_for(&self, property_id: &str, raw: &Scalar) -> Option<&str> {
        if !raw.is_numeric_looking() {
            return None;
        }
        self.units.get(property_id).map(String::as_str)
    }

    /// JSON form of a scalar: `"<value> <unit>"` when a unit applies,
    /// otherwise the native type.
    pub fn annotate(&self, property_id: &str, raw: &Scalar) -> Value {
        if let Some(unit) = self.unit_for(property_id, raw) {
            return Value::String(format!("{raw} {unit}"));
        }
        match raw {
            Scalar::Boolean(value) => Value::Bool(*value),
            Scalar::Integer(value) => Value::from(*value),
            Scalar::Decimal(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(value) => Value::String(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{PropertyRecord, VocabularyTable};
    use serde_json::json;

    fn annotator() -> UnitAnnotator {
        UnitAnnotator::new([("weight".to_string(), "kg".to_string())].into_iter().collect())
    }

    #[test]
    fn test_numeric_values_get_units() {
        let units = annotator();
        assert_eq!(units.annotate("weight", &Scalar::Integer(5)), json!("5 kg"));
        assert_eq!(units.annotate("weight", &Scalar::Decimal(2.5)), json!("2.5 kg"));
        assert_eq!(units.annotate("weight", &Scalar::Text("7".into())), json!("7 kg"));
    }

    #[test]
    fn test_values_without_units_keep_native_type() {
        let units = annotator();
        assert_eq!(units.annotate("height", &Scalar::Integer(5)), json!(5));
        assert_eq!(units.annotate("weight", &Scalar::Text("heavy".into())), json!("heavy"));
        assert_eq!(units.unit_for("weight", &Scalar::Boolean(true)), None);
    }

    #[test]
    fn test_configured_units_override_vocabulary_keys() {
        let mut table = VocabularyTable::default().with_type("Thing", &[]);
        for (id, unit) in [("weight", "lb"), ("depth", "cm")] {
            table.properties.push(PropertyRecord {
                id: id.to_string(),
                range_includes: vec![],
                domain_includes: vec!["Thing".to_string()],
                description: String::new(),
                unit: Some(unit.to_string()),
            });
        }
        let graph = VocabularyGraph::from_table(table).unwrap();
        let configured = [("weight".to_string(), "kg".to_string())].into_iter().collect();
        let units = UnitAnnotator::from_graph(&graph, &configured);
        assert_eq!(units.unit_for("weight", &Scalar::Integer(1)), Some("kg"));
        assert_eq!(units.unit_for("depth", &Scalar::Integer(1)), Some("cm"));
    }
}
