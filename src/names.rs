//! Conversion between vocabulary identifiers and machine names.
//!
//! `birthDate` becomes `birth_date`. Names longer than the configured limit
//! are cut at a word boundary, and when two identifiers end up with the same
//! name the later one gets a `_N` suffix where `N` counts the collisions seen
//! so far for that name. The suffix depends only on the order of calls, so
//! replaying the same identifiers yields the same names.

use crate::error::{MappingError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ACRONYM_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("acronym boundary regex"));
static WORD_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("word boundary regex"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("separator regex"));

/// Split an identifier into its words, keeping the original casing.
fn split_words(identifier: &str) -> Vec<String> {
    let spaced = ACRONYM_BOUNDARY.replace_all(identifier, "${1}_${2}");
    let spaced = WORD_BOUNDARY.replace_all(&spaced, "${1}_${2}");
    SEPARATORS
        .split(&spaced)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase-with-underscores form of a vocabulary identifier, without any
/// length limit.
pub fn snake_case(identifier: &str) -> String {
    split_words(identifier)
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Drop trailing words until the name fits. A first word that is already too
/// long is cut mid-word.
pub fn truncate_at_word(name: &str, max_length: usize) -> String {
    if name.len() <= max_length {
        return name.to_string();
    }
    let mut kept = String::new();
    for word in name.split('_') {
        let extra = if kept.is_empty() { word.len() } else { word.len() + 1 };
        if kept.len() + extra > max_length {
            break;
        }
        if !kept.is_empty() {
            kept.push('_');
        }
        kept.push_str(word);
    }
    if kept.is_empty() {
        kept = name.chars().take(max_length).collect();
    }
    kept.trim_end_matches('_').to_string()
}

/// Best-effort inverse of [`snake_case`] for property identifiers
/// (`birth_date` -> `birthDate`). Truncated names do not round-trip.
pub fn to_vocabulary_identifier(machine_name: &str) -> String {
    let mut out = String::with_capacity(machine_name.len());
    for (i, word) in machine_name.split('_').filter(|w| !w.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// Upper-camel inverse used for Type names (`medical_entity` -> `MedicalEntity`).
pub fn to_vocabulary_type_identifier(machine_name: &str) -> String {
    machine_name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect()
}

/// Human-readable label: `birthDate` -> `Birth date`, `URL` stays `URL`.
pub fn label_for(identifier: &str) -> String {
    let words: Vec<String> = split_words(identifier)
        .into_iter()
        .enumerate()
        .map(|(i, word)| {
            let acronym = word.len() > 1 && word.chars().all(|c| !c.is_ascii_lowercase());
            if acronym {
                word
            } else if i == 0 {
                capitalize(&word.to_ascii_lowercase())
            } else {
                word.to_ascii_lowercase()
            }
        })
        .collect();
    words.join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Stateful name issuer for one resolution run.
#[derive(Debug, Clone)]
pub struct NameTransformer {
    max_length: usize,
    by_identifier: HashMap<String, String>,
    issued: HashMap<String, String>,
    collisions: HashMap<String, usize>,
}

impl NameTransformer {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            by_identifier: HashMap::new(),
            issued: HashMap::new(),
            collisions: HashMap::new(),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Machine name for `identifier`. Asking twice for the same identifier
    /// returns the same name.
    ///
    /// Fails with `NameConflict` when the name collides and no suffixed form
    /// fits within the length limit.
    pub fn to_machine_name(&mut self, identifier: &str) -> Result<String> {
        if let Some(name) = self.by_identifier.get(identifier) {
            return Ok(name.clone());
        }

        let base = truncate_at_word(&snake_case(identifier), self.max_length);
        let mut name = base.clone();
        while self.issued.contains_key(&name) {
            let count = self.collisions.entry(base.clone()).or_insert(0);
            *count += 1;
            let suffix = format!("_{count}");
            if suffix.len() >= self.max_length {
                return Err(MappingError::NameConflict {
                    property: identifier.to_string(),
                    machine_name: base.clone(),
                    bound_to: self.issued.get(&base).cloned(),
                });
            }
            let stem: String = base.chars().take(self.max_length - suffix.len()).collect();
            name = format!("{}{}", stem.trim_end_matches('_'), suffix);
        }

        tracing::trace!(identifier, machine_name = %name, "issued machine name");
        self.issued.insert(name.clone(), identifier.to_string());
        self.by_identifier.insert(identifier.to_string(), name.clone());
        Ok(name)
    }

    /// Identifier a machine name was issued for, when this run issued it.
    pub fn issued_for(&self, machine_name: &str) -> Option<&str> {
        self.issued.get(machine_name).map(String::as_str)
    }
}
