//! Process-wide vocabulary holder.
//!
//! Readers take an `Arc` snapshot of the current graph; `reload` swaps in a
//! new graph under the write lock and bumps the version. Anything computed
//! against a snapshot carries its version so a later step can reject it once
//! the vocabulary has moved on.

use crate::error::{MappingError, Result};
use crate::vocabulary::graph::VocabularyGraph;
use crate::vocabulary::table::VocabularyTable;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct VocabularyRegistry {
    current: RwLock<Arc<VocabularyGraph>>,
    version: AtomicU64,
}

impl VocabularyRegistry {
    /// Load the initial graph as version 1.
    pub fn new(table: VocabularyTable) -> Result<Self> {
        let graph = VocabularyGraph::from_table(table)?.with_version(1);
        tracing::info!(version = 1, "vocabulary loaded");
        Ok(Self {
            current: RwLock::new(Arc::new(graph)),
            version: AtomicU64::new(1),
        })
    }

    /// Snapshot of the current graph.
    pub fn current(&self) -> Arc<VocabularyGraph> {
        self.current.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Replace the graph. The table is validated before the swap, so a bad
    /// table leaves the current graph in place.
    pub fn reload(&self, table: VocabularyTable) -> Result<u64> {
        let mut slot = self.current.write();
        let next = self.version.load(Ordering::Acquire) + 1;
        let graph = VocabularyGraph::from_table(table)?.with_version(next);
        *slot = Arc::new(graph);
        self.version.store(next, Ordering::Release);
        tracing::info!(version = next, "vocabulary reloaded");
        Ok(next)
    }

    /// Reject work computed against an older graph.
    pub fn ensure_current(&self, version: u64) -> Result<()> {
        let current = self.version();
        if current != version {
            return Err(MappingError::StaleVocabulary {
                expected: version,
                current,
            });
        }
        Ok(())
    }
}
