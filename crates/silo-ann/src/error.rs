//! Error types for silo-ann.

use thiserror::Error;

/// Result type alias for silo-ann operations.
pub type AnnResult<T> = Result<T, AnnError>;

/// Errors that can occur in silo-ann operations.
#[derive(Debug, Error)]
pub enum AnnError {
    // ========================================================================
    // Input validation errors
    // ========================================================================
    /// Vector dimension mismatch.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid engine configuration.
    #[error("Invalid index configuration: {message}")]
    Config { message: String },

    // ========================================================================
    // Lifecycle errors
    // ========================================================================
    /// Training failed.
    #[error("Index training failed: {message}")]
    Training { message: String },

    /// Add rejected because the index has not been trained yet.
    #[error("Index is not trained; train before adding vectors")]
    UntrainedIndex,

    /// Adding vectors failed.
    #[error("Adding vectors failed: {message}")]
    Add { message: String },

    /// Search rejected because the index holds no vectors.
    #[error("Index is empty; nothing has been committed yet")]
    EmptyIndex,

    /// Search failed.
    #[error("Search failed: {message}")]
    Search { message: String },

    // ========================================================================
    // Artifact errors
    // ========================================================================
    /// Encoding or decoding an index artifact failed.
    #[error("Index artifact codec error: {message}")]
    Codec { message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AnnError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a training error.
    pub fn training(message: impl Into<String>) -> Self {
        Self::Training {
            message: message.into(),
        }
    }

    /// Create an add error.
    pub fn add(message: impl Into<String>) -> Self {
        Self::Add {
            message: message.into(),
        }
    }

    /// Create a search error.
    pub fn search(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    /// Create an artifact codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
