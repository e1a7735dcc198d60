//! ANN engine implementations.
//!
//! ## Available Engines
//!
//! - `ivfpq`: cluster-quantization (coarse partitioning + product quantization)
//! - `hnsw`: layered navigable proximity graph

mod hnsw;
mod ivfpq;

pub use hnsw::HnswIndex;
pub use ivfpq::IvfPqIndex;

use tracing::debug;

use crate::config::BackendConfig;
use crate::error::AnnResult;
use crate::traits::VectorBackend;

/// Construct the engine selected by `config`.
///
/// This is the factory callers go through instead of naming concrete engine
/// types; the returned object is ready for `train`/`add` (the graph engine
/// skips straight to `add`).
///
/// # Errors
///
/// Returns a configuration error when the hyperparameters are invalid for
/// `dimension` (zero counts, segment count not dividing the dimension).
pub fn new_backend(config: &BackendConfig, dimension: usize) -> AnnResult<Box<dyn VectorBackend>> {
    config.validate(dimension)?;
    debug!(kind = %config.kind(), dimension, "constructing ANN engine");

    match *config {
        BackendConfig::IvfPq {
            clusters,
            sub_vectors,
        } => Ok(Box::new(IvfPqIndex::new(dimension, clusters, sub_vectors)?)),
        BackendConfig::Hnsw {
            fan_out,
            ef_construction,
            search_breadth,
        } => Ok(Box::new(HnswIndex::new(
            dimension,
            fan_out,
            ef_construction,
            search_breadth,
        )?)),
    }
}

/// Get a list of available engine names.
pub fn available_backends() -> Vec<&'static str> {
    vec!["ivfpq", "hnsw"]
}

// ============================================================================
// Tests
// ============================================================================
