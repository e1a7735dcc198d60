//! Backend trait and core types.
//!
//! This module defines the abstraction every ANN engine implements. The
//! buffered index manager in `silo-core` talks to engines only through
//! [`VectorBackend`].

use serde::{Deserialize, Serialize};

use crate::config::BackendKind;
use crate::error::AnnResult;

// ============================================================================
// VectorId
// ============================================================================

/// Identifier of a committed vector inside an engine.
///
/// Engines assign identifiers densely in insertion order: the first committed
/// vector gets 0, and a batch of `n` added to an engine holding `c` items
/// occupies `[c, c + n)`. Identifiers are never reused until a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorId(pub u64);

impl VectorId {
    /// Create a new vector ID.
    pub fn new(id: u64) -> Self {
        VectorId(id)
    }

    /// Get the underlying ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VectorId {
    fn from(id: u64) -> Self {
        VectorId(id)
    }
}

impl From<usize> for VectorId {
    fn from(id: usize) -> Self {
        VectorId(id as u64)
    }
}

impl std::fmt::Display for VectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SearchHit
// ============================================================================

/// A single result from an engine-level nearest-neighbor search.
///
/// Carries no payload: metadata lives outside the engine, keyed by `id`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Identifier of the matched vector.
    pub id: VectorId,

    /// Squared L2 distance to the query (smaller is closer).
    pub distance: f32,
}

impl SearchHit {
    /// Create a new search hit.
    pub fn new(id: impl Into<VectorId>, distance: f32) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }
}

// ============================================================================
// VectorBackend Trait
// ============================================================================

/// Core trait for trainable ANN engines.
///
/// An engine owns its trained model state and the committed vector set. The
/// caller owns batching: vectors arrive in ordered batches, and the engine
/// assigns each batch the contiguous identifier range
/// `[item_count_before, item_count_after)` in batch order.
///
/// ## Implementation Notes
///
/// - Engines must be thread-safe (`Send + Sync`); mutation goes through
///   `&mut self`, so callers serialize writers themselves.
/// - `search` returns results sorted ascending by distance (best first).
/// - `serialize`/`deserialize` round-trip the complete engine state; the
///   bytes are opaque to callers.
pub trait VectorBackend: Send + Sync {
    /// Which engine family this is.
    fn kind(&self) -> BackendKind;

    /// Dimension of vectors accepted by this engine.
    fn dimension(&self) -> usize;

    /// Whether the engine is ready to accept `add` calls.
    ///
    /// Graph engines need no training phase and always report `true`.
    fn is_trained(&self) -> bool;

    /// Train the engine on a batch of vectors.
    ///
    /// One-time for cluster-quantization engines (a second call is a no-op);
    /// a maintenance no-op for graph engines. Fails on an empty or malformed
    /// batch.
    fn train(&mut self, batch: &[Vec<f32>]) -> AnnResult<()>;

    /// Commit a batch of vectors to the engine.
    ///
    /// Identifiers for the batch are `[item_count_before, item_count_after)`
    /// in batch order. Fails if the engine is untrained
    /// (cluster-quantization) or on dimension mismatch.
    fn add(&mut self, batch: &[Vec<f32>]) -> AnnResult<()>;

    /// Find the `k` nearest committed vectors to `query`.
    ///
    /// Fails with [`crate::AnnError::EmptyIndex`] when nothing has been
    /// committed yet.
    fn search(&self, query: &[f32], k: usize) -> AnnResult<Vec<SearchHit>>;

    /// Number of committed vectors.
    fn item_count(&self) -> u64;

    /// Discard all committed vectors and trained state, keeping the
    /// configuration. Identifier assignment restarts from 0.
    fn reset(&mut self);

    /// Snapshot the complete engine state as opaque bytes.
    fn serialize(&self) -> AnnResult<Vec<u8>>;

    /// Replace the engine state with a previously serialized snapshot.
    ///
    /// Fails if the snapshot was produced for a different dimension.
    fn deserialize(&mut self, bytes: &[u8]) -> AnnResult<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_id() {
        let id = VectorId::new(123);
        assert_eq!(id.value(), 123);
        assert_eq!(id.to_string(), "123");

        let from_u64: VectorId = 456u64.into();
        assert_eq!(from_u64.value(), 456);

        let from_usize: VectorId = 7usize.into();
        assert_eq!(from_usize.value(), 7);
    }

    #[test]
    fn test_vector_id_ordering() {
        let mut ids = vec![VectorId::new(5), VectorId::new(1), VectorId::new(3)];
        ids.sort();
        assert_eq!(ids, vec![VectorId::new(1), VectorId::new(3), VectorId::new(5)]);
    }

    #[test]
    fn test_search_hit() {
        let hit = SearchHit::new(9u64, 0.25);
        assert_eq!(hit.id.value(), 9);
        assert_eq!(hit.distance, 0.25);
    }
}
