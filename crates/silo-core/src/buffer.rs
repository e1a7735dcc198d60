//! Per-modality ingestion buffer.
//!
//! Vectors wait here between `store` and the flush that commits them. The
//! buffer preserves insertion order because order determines identifier
//! assignment at flush time: the engine hands the batch a contiguous
//! identifier range, item by item, in the order the batch was drained.

use std::collections::VecDeque;

use serde_json::Value;
use silo_ann::AnnError;

use crate::error::SiloResult;

// ============================================================================
// PendingItem
// ============================================================================

/// A (vector, metadata) pair awaiting commit.
///
/// Pending items have no identifier; one is assigned when the batch they
/// belong to is added to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingItem {
    /// The embedding vector.
    pub vector: Vec<f32>,

    /// Caller-supplied metadata, written through at commit time.
    pub metadata: Value,
}

impl PendingItem {
    /// Create a new pending item.
    pub fn new(vector: Vec<f32>, metadata: Value) -> Self {
        Self { vector, metadata }
    }
}

// ============================================================================
// IngestionBuffer
// ============================================================================

/// Ordered accumulation of pending items for one modality.
#[derive(Debug)]
pub struct IngestionBuffer {
    dimension: usize,
    items: VecDeque<PendingItem>,
}

impl IngestionBuffer {
    /// Create an empty buffer accepting vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            items: VecDeque::new(),
        }
    }

    /// Append a (vector, metadata) pair.
    ///
    /// # Errors
    ///
    /// Fails with a dimension mismatch when `vector` does not have exactly
    /// the configured number of components; the buffer is left untouched.
    pub fn append(&mut self, vector: Vec<f32>, metadata: Value) -> SiloResult<()> {
        if vector.len() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            }
            .into());
        }
        self.items.push_back(PendingItem::new(vector, metadata));
        Ok(())
    }

    /// Number of pending items.
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer holds no pending items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take all pending items in insertion order, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<PendingItem> {
        self.items.drain(..).collect()
    }

    /// Put items back at the front of the buffer, preserving their order.
    ///
    /// Used by the flush path when a commit fails after the drain: the batch
    /// returns to the exact position it was drained from, so a later flush
    /// retries it ahead of anything stored since.
    pub fn restore(&mut self, items: Vec<PendingItem>) {
        for item in items.into_iter().rev() {
            self.items.push_front(item);
        }
    }

    /// Drop all pending items.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
