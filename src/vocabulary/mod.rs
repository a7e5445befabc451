//! Vocabulary graph
//!
//! - **Definition table** - serde form of Types and Properties
//! - **Graph** - read-only, with ancestor and property orders flattened at load
//! - **Registry** - versioned process-wide holder with a single reload entry point

pub mod graph;
pub mod registry;
pub mod table;

pub use graph::{Property, VocabularyGraph, VocabularyType};
pub use registry::VocabularyRegistry;
pub use table::{PropertyRecord, TypeRecord, VocabularyTable};
