//! Error types for silo-core.

use std::path::PathBuf;

use silo_ann::{AnnError, VectorId};
use thiserror::Error;

use crate::config::Modality;

/// Result type alias for silo-core operations.
pub type SiloResult<T> = Result<T, SiloError>;

/// Errors that can occur in silo-core operations.
#[derive(Debug, Error)]
pub enum SiloError {
    // ========================================================================
    // Validation errors
    // ========================================================================
    /// Unrecognized modality tag.
    #[error("Invalid modality '{value}' (expected 'text' or 'image')")]
    InvalidModality { value: String },

    /// Invalid manager configuration.
    #[error("Invalid manager configuration: {message}")]
    Config { message: String },

    // ========================================================================
    // Flush errors
    // ========================================================================
    /// A flush failed partway; the drained batch was restored to the buffer.
    #[error("Flush failed for {modality} batch (items restored to buffer): {message}")]
    Flush { modality: Modality, message: String },

    /// A search hit has no metadata record, which means the side-table and
    /// the index disagree.
    #[error("Metadata record missing for {modality} identifier {id}")]
    MetadataMissing { modality: Modality, id: VectorId },

    // ========================================================================
    // Persistence errors
    // ========================================================================
    /// A required artifact is absent from the save directory.
    #[error("Index artifact not found at {path}")]
    ArtifactMissing { path: PathBuf },

    /// Reading or writing persisted state failed.
    #[error("Persistence error at {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    /// Saved state does not match the live configuration.
    #[error("Saved state incompatible: {message}")]
    Incompatible { message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// Engine error wrapper.
    #[error("Engine error: {0}")]
    Ann(#[from] AnnError),

    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SiloError {
    /// Create an invalid-modality error.
    pub fn invalid_modality(value: impl Into<String>) -> Self {
        Self::InvalidModality {
            value: value.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a flush error.
    pub fn flush(modality: Modality, message: impl Into<String>) -> Self {
        Self::Flush {
            modality,
            message: message.into(),
        }
    }

    /// Create a missing-metadata error.
    pub fn metadata_missing(modality: Modality, id: impl Into<VectorId>) -> Self {
        Self::MetadataMissing {
            modality,
            id: id.into(),
        }
    }

    /// Create a missing-artifact error.
    pub fn artifact_missing(path: impl Into<PathBuf>) -> Self {
        Self::ArtifactMissing { path: path.into() }
    }

    /// Create a persistence error.
    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an incompatibility error.
    pub fn incompatible(message: impl Into<String>) -> Self {
        Self::Incompatible {
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
