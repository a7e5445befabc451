//! Error taxonomy for vocabulary mapping and structured data building
//!
//! This module provides:
//! - The [`MappingError`] enum shared by every engine in the crate
//! - Stable error codes with a category and a fatal/non-fatal split
//! - Process-wide error telemetry for degraded (non-fatal) outcomes

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub type Result<T, E = MappingError> = std::result::Result<T, E>;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable numeric codes for every error the core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// A Type or Property identifier is not present in the vocabulary
    UnknownIdentifier = 1001,
    /// The vocabulary table itself is malformed
    InvalidVocabulary = 1002,
    /// A snapshot of the vocabulary was used after a reload
    StaleVocabulary = 1003,
    /// Proposed machine name is taken by a field bound elsewhere
    NameConflict = 2001,
    /// No field kind candidate survived the overrides
    UnresolvableProperty = 2002,
    /// A Mapping already exists for the container
    DuplicateMapping = 3001,
    /// No Mapping exists for the container
    MissingMapping = 3002,
    /// An append tried to rebind a committed correspondence
    ImmutableCorrespondence = 3003,
}

impl ErrorCode {
    /// Get the integer code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Fatal errors abort the enclosing call; the rest degrade to skip or summarize.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ErrorCode::NameConflict | ErrorCode::UnresolvableProperty | ErrorCode::MissingMapping
        )
    }

    /// Get the error category for metrics
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::UnknownIdentifier
            | ErrorCode::InvalidVocabulary
            | ErrorCode::StaleVocabulary => "vocabulary",
            ErrorCode::NameConflict | ErrorCode::UnresolvableProperty => "resolution",
            ErrorCode::DuplicateMapping
            | ErrorCode::MissingMapping
            | ErrorCode::ImmutableCorrespondence => "mapping",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

/// What kind of vocabulary identifier failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Type,
    Property,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Type => write!(f, "type"),
            IdentifierKind::Property => write!(f, "property"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("unknown vocabulary {kind} '{id}'")]
    UnknownIdentifier { kind: IdentifierKind, id: String },

    #[error("invalid vocabulary table: {0}")]
    InvalidVocabulary(String),

    #[error("vocabulary changed while in use (snapshot version {expected}, current {current})")]
    StaleVocabulary { expected: u64, current: u64 },

    #[error("machine name '{machine_name}' for property '{property}' is already used by {}", bound_to.as_deref().unwrap_or("an unbound field"))]
    NameConflict {
        property: String,
        machine_name: String,
        bound_to: Option<String>,
    },

    #[error("no field kind candidate remains for property '{property}'")]
    UnresolvableProperty { property: String },

    #[error("container '{container}' is already mapped to '{type_id}'")]
    DuplicateMapping { container: String, type_id: String },

    #[error("container '{container}' has no mapping")]
    MissingMapping { container: String },

    #[error("property '{property}' is already bound to field '{existing}', refusing to rebind to '{requested}'")]
    ImmutableCorrespondence {
        property: String,
        existing: String,
        requested: String,
    },
}

impl MappingError {
    pub fn unknown_type(id: impl Into<String>) -> Self {
        MappingError::UnknownIdentifier {
            kind: IdentifierKind::Type,
            id: id.into(),
        }
    }

    pub fn unknown_property(id: impl Into<String>) -> Self {
        MappingError::UnknownIdentifier {
            kind: IdentifierKind::Property,
            id: id.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MappingError::UnknownIdentifier { .. } => ErrorCode::UnknownIdentifier,
            MappingError::InvalidVocabulary(_) => ErrorCode::InvalidVocabulary,
            MappingError::StaleVocabulary { .. } => ErrorCode::StaleVocabulary,
            MappingError::NameConflict { .. } => ErrorCode::NameConflict,
            MappingError::UnresolvableProperty { .. } => ErrorCode::UnresolvableProperty,
            MappingError::DuplicateMapping { .. } => ErrorCode::DuplicateMapping,
            MappingError::MissingMapping { .. } => ErrorCode::MissingMapping,
            MappingError::ImmutableCorrespondence { .. } => ErrorCode::ImmutableCorrespondence,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.code().is_fatal()
    }

    /// Record this error in [`ERROR_METRICS`] and hand it back.
    pub fn track(self, operation: &str) -> Self {
        ERROR_METRICS.record_error(self.code(), operation);
        self
    }
}

// =============================================================================
// ERROR TELEMETRY
// =============================================================================

/// Error counters keyed by code and by operation.
#[derive(Debug, Default)]
pub struct ErrorMetrics {
    error_counts: RwLock<HashMap<ErrorCode, AtomicU64>>,
    operation_counts: RwLock<HashMap<String, AtomicU64>>,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error occurrence
    pub fn record_error(&self, code: ErrorCode, operation: &str) {
        {
            let map = self.error_counts.read();
            if let Some(counter) = map.get(&code) {
                counter.fetch_add(1, Ordering::Relaxed);
            } else {
                drop(map);
                self.error_counts
                    .write()
                    .entry(code)
                    .or_insert_with(|| AtomicU64::new(0))
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        let map = self.operation_counts.read();
        if let Some(counter) = map.get(operation) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(map);
            self.operation_counts
                .write()
                .entry(operation.to_string())
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self, code: ErrorCode) -> u64 {
        self.error_counts
            .read()
            .get(&code)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn operation_count(&self, operation: &str) -> u64 {
        self.operation_counts
            .read()
            .get(operation)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Get error statistics, grouped by category
    pub fn category_stats(&self) -> HashMap<&'static str, u64> {
        let mut stats = HashMap::new();
        for (code, counter) in self.error_counts.read().iter() {
            *stats.entry(code.category()).or_insert(0) += counter.load(Ordering::Relaxed);
        }
        stats
    }

    pub fn reset(&self) {
        self.error_counts.write().clear();
        self.operation_counts.write().clear();
    }
}

/// Global error metrics instance
pub static ERROR_METRICS: Lazy<ErrorMetrics> = Lazy::new(ErrorMetrics::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_split() {
        assert!(ErrorCode::UnknownIdentifier.is_fatal());
        assert!(ErrorCode::DuplicateMapping.is_fatal());
        assert!(!ErrorCode::NameConflict.is_fatal());
        assert!(!ErrorCode::UnresolvableProperty.is_fatal());
        assert!(!ErrorCode::MissingMapping.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = MappingError::unknown_type("Widget");
        assert_eq!(err.to_string(), "unknown vocabulary type 'Widget'");
        assert_eq!(err.code(), ErrorCode::UnknownIdentifier);

        let err = MappingError::NameConflict {
            property: "name".into(),
            machine_name: "schema_name".into(),
            bound_to: None,
        };
        assert!(err.to_string().contains("an unbound field"));
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = ErrorMetrics::new();
        metrics.record_error(ErrorCode::NameConflict, "resolve_defaults");
        metrics.record_error(ErrorCode::NameConflict, "resolve_defaults");
        metrics.record_error(ErrorCode::MissingMapping, "build");

        assert_eq!(metrics.count(ErrorCode::NameConflict), 2);
        assert_eq!(metrics.operation_count("resolve_defaults"), 2);
        assert_eq!(metrics.category_stats().get("resolution"), Some(&2));

        metrics.reset();
        assert_eq!(metrics.count(ErrorCode::NameConflict), 0);
    }
}
