//! The buffered dual-modality index manager.
//!
//! [`SiloIndex`] orchestrates the per-modality ingestion buffers, ANN
//! engines, and metadata stores: it owns flush timing, identifier
//! assignment, and the consistency between the three. Engines are consumed
//! strictly through the [`VectorBackend`] trait; the manager never inspects
//! engine internals.
//!
//! ## Commit protocol
//!
//! `store` appends to the named modality's buffer. Once either buffer
//! reaches the flush threshold, both modalities are committed in one joint
//! flush: a surge in one modality forces commitment of the other, even if
//! small. Each committed batch receives the contiguous identifier range the
//! engine allocated for it, and metadata is written through under those
//! identifiers before the flush returns. A flush failure restores the
//! drained batch to the front of its buffer, so nothing is lost and a later
//! flush retries it.
//!
//! ## Locking
//!
//! One manager-wide `RwLock` serializes mutation: `store`, `flush`, `reset`,
//! and `load` hold the write lock, `search` and the size/stats surfaces hold
//! the read lock. Searches therefore run concurrently with each other and
//! never observe an engine mid-add.

use std::fmt;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use silo_ann::{new_backend, AnnError, BackendKind, VectorBackend, VectorId};
use tracing::{debug, info, trace};

use crate::buffer::{IngestionBuffer, PendingItem};
use crate::config::{Modality, SiloConfig};
use crate::error::{SiloError, SiloResult};
use crate::metadata::MetadataStore;
use crate::persistence;

// ============================================================================
// SearchMatch
// ============================================================================

/// A single result from a manager-level search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Squared L2 distance to the query (smaller is closer).
    pub distance: f32,

    /// Identifier of the matched vector.
    pub id: VectorId,

    /// Metadata record attached when the vector was stored.
    pub metadata: Value,
}

impl SearchMatch {
    /// Create a new search match.
    pub fn new(distance: f32, id: impl Into<VectorId>, metadata: Value) -> Self {
        Self {
            distance,
            id: id.into(),
            metadata,
        }
    }
}

// ============================================================================
// SiloSizes
// ============================================================================

/// Committed item counts per modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiloSizes {
    /// Committed text items.
    pub text: u64,

    /// Committed image items.
    pub image: u64,
}

impl SiloSizes {
    /// Count for one modality.
    pub fn get(&self, modality: Modality) -> u64 {
        match modality {
            Modality::Text => self.text,
            Modality::Image => self.image,
        }
    }

    /// Total committed items across both modalities.
    pub fn total(&self) -> u64 {
        self.text + self.image
    }
}

impl fmt::Display for SiloSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "text={} image={}", self.text, self.image)
    }
}

// ============================================================================
// SiloStats
// ============================================================================

/// Per-modality observability counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalityStats {
    /// Items committed to the engine.
    pub committed: u64,

    /// Items buffered, awaiting the next flush.
    pub pending: usize,

    /// Whether the engine is ready to accept adds.
    pub trained: bool,
}

/// Snapshot of the manager's observable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiloStats {
    /// Engine kind as string.
    pub backend: String,

    /// Embedding dimension.
    pub dimension: usize,

    /// Flush threshold in effect.
    pub threshold: usize,

    /// Text modality counters.
    pub text: ModalityStats,

    /// Image modality counters.
    pub image: ModalityStats,
}

// ============================================================================
// Manager state
// ============================================================================

/// One modality's slice of manager state: buffer, engine, metadata.
pub(crate) struct ModalityState {
    pub(crate) buffer: IngestionBuffer,
    pub(crate) backend: Box<dyn VectorBackend>,
    pub(crate) metadata: MetadataStore,
}

impl ModalityState {
    fn stats(&self) -> ModalityStats {
        ModalityStats {
            committed: self.backend.item_count(),
            pending: self.buffer.size(),
            trained: self.backend.is_trained(),
        }
    }
}

/// Both modality slices, guarded together by the manager lock.
pub(crate) struct ManagerState {
    pub(crate) text: ModalityState,
    pub(crate) image: ModalityState,
}

impl ManagerState {
    pub(crate) fn get(&self, modality: Modality) -> &ModalityState {
        match modality {
            Modality::Text => &self.text,
            Modality::Image => &self.image,
        }
    }

    pub(crate) fn get_mut(&mut self, modality: Modality) -> &mut ModalityState {
        match modality {
            Modality::Text => &mut self.text,
            Modality::Image => &mut self.image,
        }
    }
}

// ============================================================================
// SiloIndex
// ============================================================================

/// The buffered dual-modality vector index manager.
///
/// Explicitly constructed and explicitly passed; there is no process-wide
/// instance. The manager is `Send + Sync`: wrap it in an `Arc` to share it
/// across threads, and run it on a dedicated worker when callers cannot
/// afford to block on a large flush.
pub struct SiloIndex {
    config: SiloConfig,
    threshold: usize,
    state: RwLock<ManagerState>,
}

impl SiloIndex {
    /// Create a manager with two freshly constructed engines.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid for the requested engines
    /// (zero counts, segment count not dividing the dimension, zero
    /// threshold).
    pub fn new(config: SiloConfig) -> SiloResult<Self> {
        config.validate()?;
        let threshold = config.effective_threshold();

        let state = ManagerState {
            text: ModalityState {
                buffer: IngestionBuffer::new(config.dimension),
                backend: new_backend(&config.backend, config.dimension)?,
                metadata: MetadataStore::new(),
            },
            image: ModalityState {
                buffer: IngestionBuffer::new(config.dimension),
                backend: new_backend(&config.backend, config.dimension)?,
                metadata: MetadataStore::new(),
            },
        };

        debug!(
            backend = %config.kind(),
            dimension = config.dimension,
            threshold,
            "constructed index manager"
        );

        Ok(Self {
            config,
            threshold,
            state: RwLock::new(state),
        })
    }

    /// The configuration the manager was constructed with.
    pub fn config(&self) -> &SiloConfig {
        &self.config
    }

    /// Embedding dimension every stored vector must match.
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Buffer size at which a store triggers the joint flush.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn read_state(&self) -> SiloResult<RwLockReadGuard<'_, ManagerState>> {
        self.state
            .read()
            .map_err(|e| SiloError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_state(&self) -> SiloResult<RwLockWriteGuard<'_, ManagerState>> {
        self.state
            .write()
            .map_err(|e| SiloError::internal(format!("Failed to acquire write lock: {}", e)))
    }

    /// Buffer one (vector, metadata) pair for `modality`.
    ///
    /// The vector must have exactly the configured number of components.
    /// When either modality's buffer reaches the flush threshold, the call
    /// commits **both** modalities before returning, so it may train an
    /// engine and write metadata as a side effect.
    ///
    /// # Errors
    ///
    /// A dimension mismatch is local to this call and leaves all state
    /// untouched. A flush failure restores the drained batch (see
    /// [`flush`](Self::flush)) and propagates.
    pub fn store(&self, modality: Modality, vector: Vec<f32>, metadata: Value) -> SiloResult<()> {
        let mut state = self.write_state()?;
        state.get_mut(modality).buffer.append(vector, metadata)?;
        trace!(
            %modality,
            pending = state.get(modality).buffer.size(),
            "buffered pending item"
        );

        let reached = Modality::ALL
            .iter()
            .any(|&m| state.get(m).buffer.size() >= self.threshold);
        if reached {
            debug!(
                text_pending = state.text.buffer.size(),
                image_pending = state.image.buffer.size(),
                threshold = self.threshold,
                "flush threshold reached, committing both modalities"
            );
            Self::flush_state(&mut state)?;
        }
        Ok(())
    }

    /// Commit all buffered items for both modalities.
    ///
    /// Modalities with empty buffers are skipped; an engine is never invoked
    /// with an empty batch. On a commit failure the failing modality's batch
    /// is restored to the front of its buffer in original order and a flush
    /// error is surfaced, so no data is lost and a later flush retries the
    /// same batch.
    pub fn flush(&self) -> SiloResult<()> {
        let mut state = self.write_state()?;
        Self::flush_state(&mut state)
    }

    /// Flush every non-empty buffer while holding the write lock.
    fn flush_state(state: &mut ManagerState) -> SiloResult<()> {
        for modality in Modality::ALL {
            let slice = state.get_mut(modality);
            if slice.buffer.is_empty() {
                continue;
            }
            Self::flush_modality(modality, slice)?;
        }
        Ok(())
    }

    /// Commit one modality's drained batch: train if needed, add, assign the
    /// contiguous identifier range, write metadata through.
    fn flush_modality(modality: Modality, slice: &mut ModalityState) -> SiloResult<()> {
        let items = slice.buffer.drain();
        let batch_size = items.len();
        let (vectors, metadata): (Vec<Vec<f32>>, Vec<Value>) = items
            .into_iter()
            .map(|item| (item.vector, item.metadata))
            .unzip();

        debug!(%modality, batch = batch_size, "flushing buffered items");

        match Self::commit_batch(modality, slice, &vectors) {
            Ok(first_id) => {
                for (offset, record) in metadata.into_iter().enumerate() {
                    slice.metadata.insert(first_id + offset as u64, record);
                }
                debug!(
                    %modality,
                    batch = batch_size,
                    first_id,
                    total = slice.backend.item_count(),
                    "committed batch"
                );
                Ok(())
            }
            Err(err) => {
                let restored = vectors
                    .into_iter()
                    .zip(metadata)
                    .map(|(vector, record)| PendingItem::new(vector, record))
                    .collect();
                slice.buffer.restore(restored);
                Err(SiloError::flush(modality, err.to_string()))
            }
        }
    }

    /// Train-if-needed, then add; returns the first identifier of the batch,
    /// derived from the engine's post-add item count.
    fn commit_batch(
        modality: Modality,
        slice: &mut ModalityState,
        vectors: &[Vec<f32>],
    ) -> Result<u64, AnnError> {
        if !slice.backend.is_trained() {
            info!(
                %modality,
                batch = vectors.len(),
                "training engine on first committed batch"
            );
            slice.backend.train(vectors)?;
        } else if slice.backend.kind() == BackendKind::Hnsw {
            // The graph engine has no training phase; this is its per-flush
            // maintenance call.
            slice.backend.train(vectors)?;
        }

        slice.backend.add(vectors)?;
        Ok(slice.backend.item_count() - vectors.len() as u64)
    }

    /// Find the `k` nearest committed vectors in `modality`, with their
    /// metadata, ordered ascending by distance.
    ///
    /// Buffered items are invisible to search until a flush commits them.
    ///
    /// # Errors
    ///
    /// Fails when the engine holds no committed items yet, when the query
    /// dimension is wrong, and when a returned identifier has no metadata
    /// record (an index/side-table inconsistency, never silently dropped).
    pub fn search(
        &self,
        modality: Modality,
        query: &[f32],
        k: usize,
    ) -> SiloResult<Vec<SearchMatch>> {
        let state = self.read_state()?;
        let slice = state.get(modality);

        let hits = slice.backend.search(query, k)?;
        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            let record = slice
                .metadata
                .get(hit.id)
                .ok_or_else(|| SiloError::metadata_missing(modality, hit.id))?;
            matches.push(SearchMatch::new(hit.distance, hit.id, record.clone()));
        }
        trace!(%modality, k, found = matches.len(), "search complete");
        Ok(matches)
    }

    /// Committed item counts per modality.
    pub fn current_size(&self) -> SiloResult<SiloSizes> {
        let state = self.read_state()?;
        Ok(SiloSizes {
            text: state.text.backend.item_count(),
            image: state.image.backend.item_count(),
        })
    }

    /// Snapshot of committed counts, pending counts, and trained flags.
    pub fn stats(&self) -> SiloResult<SiloStats> {
        let state = self.read_state()?;
        Ok(SiloStats {
            backend: self.config.kind().to_string(),
            dimension: self.config.dimension,
            threshold: self.threshold,
            text: state.text.stats(),
            image: state.image.stats(),
        })
    }

    /// Discard all engine state, buffers, and metadata for both modalities.
    ///
    /// A reset manager is indistinguishable from a freshly constructed one;
    /// identifier assignment restarts from 0.
    pub fn reset(&self) -> SiloResult<()> {
        let mut state = self.write_state()?;
        for modality in Modality::ALL {
            let slice = state.get_mut(modality);
            slice.backend.reset();
            slice.buffer.clear();
            slice.metadata.clear();
        }
        info!("index manager reset");
        Ok(())
    }

    /// Persist engine state and metadata for both modalities into `dir`.
    ///
    /// Pending buffered items are not part of the persisted state; call
    /// [`flush`](Self::flush) first to commit them. Every file is written to
    /// a temporary name and atomically renamed into place, so a crash
    /// mid-save never corrupts a previously valid artifact.
    pub fn save(&self, dir: &Path) -> SiloResult<()> {
        let state = self.read_state()?;
        persistence::save_state(dir, &self.config, &state)
    }

    /// Replace the in-memory state with the artifacts saved under `dir`.
    ///
    /// Fails with an artifact error when any expected file is missing, and
    /// with an incompatibility error when the saved descriptor does not
    /// match the live configuration; in both cases the in-memory state is
    /// untouched. On success pending buffers are cleared: the loaded state
    /// is exactly what [`save`](Self::save) captured.
    pub fn load(&self, dir: &Path) -> SiloResult<()> {
        let mut state = self.write_state()?;
        persistence::load_state(dir, &self.config, &mut state)
    }
}

// ============================================================================
// Tests
// ============================================================================
