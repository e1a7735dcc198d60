//! # silo-ann
//!
//! Engine layer for Silo - trainable approximate-nearest-neighbor indexes.
//!
//! This crate owns the ANN math so the index manager in `silo-core` never
//! has to: engines are consumed strictly through the [`VectorBackend`]
//! trait, and their serialized state is an opaque byte artifact to callers.
//!
//! ## Architecture
//!
//! ```text
//! silo-core → VectorBackend (trait)
//!                  ↑
//!              silo-ann (implements the trait: IvfPqIndex, HnswIndex)
//! ```
//!
//! ## Engines
//!
//! - `ivfpq`: coarse k-means partitioning plus product-quantization codes
//!   over residuals; needs a one-time training batch before vectors can be
//!   committed
//! - `hnsw`: layered navigable proximity graph; no training phase
//!
//! ## Usage
//!
//! ```ignore
//! use silo_ann::{new_backend, BackendConfig};
//!
//! let mut backend = new_backend(&BackendConfig::hnsw(), 512)?;
//!
//! // Commit a batch; identifiers are [0, batch.len())
//! backend.add(&batch)?;
//!
//! // Query the nearest neighbors
//! let hits = backend.search(&query, 10)?;
//! ```

pub mod backend;
pub mod config;
pub mod distance;
pub mod error;
pub mod kmeans;
pub mod traits;

pub use backend::{available_backends, new_backend, HnswIndex, IvfPqIndex};
pub use config::{BackendConfig, BackendKind};
pub use error::{AnnError, AnnResult};
pub use traits::{SearchHit, VectorBackend, VectorId};
