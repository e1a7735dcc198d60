//! # silo-core
//!
//! **Silo** - buffered dual-modality vector index management.
//!
//! This crate provides the index manager that encoder pipelines hand their
//! text and image embeddings to. Vectors accumulate in per-modality buffers
//! and are committed to the ANN engines in batches; searches resolve engine
//! hits back to the metadata stored alongside each vector.
//!
//! ## Main Types
//!
//! - [`SiloIndex`] - the buffered dual-modality manager, the main entry point
//! - [`SiloConfig`] - engine selection, dimension, and flush threshold
//! - [`Modality`] - the `text` / `image` axis every operation is keyed by
//! - [`SiloError`] - domain-specific error type
//!
//! ## Modules
//!
//! - [`buffer`] - per-modality ingestion buffers
//! - [`config`] - configuration and the persisted state descriptor
//! - [`error`] - error types
//! - [`manager`] - the [`SiloIndex`] implementation
//! - [`metadata`] - identifier-keyed metadata records
//! - [`persistence`] - on-disk save/load of manager state
//!
//! ## Example
//!
//! ```ignore
//! use silo_core::{Modality, SiloConfig, SiloIndex};
//! use serde_json::json;
//!
//! // HNSW engine, 512-dimensional embeddings, flush every 1000 items
//! let index = SiloIndex::new(SiloConfig::hnsw())?;
//!
//! // Buffer embeddings; the manager commits both modalities in batches
//! index.store(Modality::Text, embedding, json!({"caption": "a red bus"}))?;
//!
//! // Query the committed vectors and get metadata back
//! let matches = index.search(Modality::Text, &query, 3)?;
//! for m in &matches {
//!     println!("{} {}: {}", m.distance, m.id, m.metadata);
//! }
//!
//! // Persist and restore
//! index.flush()?;
//! index.save(dir)?;
//! ```

// Modules
pub mod buffer;
pub mod config;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod persistence;

// Re-exports for convenience
pub use buffer::{IngestionBuffer, PendingItem};
pub use config::{
    Modality, SiloConfig, SiloMeta, DEFAULT_DIMENSION, DEFAULT_HNSW_THRESHOLD,
    DEFAULT_IVFPQ_THRESHOLD,
};
pub use error::{SiloError, SiloResult};
pub use manager::{ModalityStats, SearchMatch, SiloIndex, SiloSizes, SiloStats};
pub use metadata::MetadataStore;
pub use persistence::{index_path, meta_path, metadata_path, read_meta, META_FILENAME};

// silo-ann re-exports - engine configuration and the identifier type cross
// the crate boundary in the public API
pub use silo_ann::{BackendConfig, BackendKind, SearchHit, VectorBackend, VectorId};
