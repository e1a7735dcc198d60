//! Manager configuration and the persisted descriptor.
//!
//! This module provides:
//! - [`Modality`] - the two independent content domains (text, image)
//! - [`SiloConfig`] - construction-time configuration for a manager
//! - [`SiloMeta`] - on-disk descriptor written next to the saved artifacts
//!
//! Engine hyperparameters live in [`BackendConfig`] (re-exported from
//! `silo-ann`); this module only decides which engine to build and how the
//! manager batches around it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use silo_ann::{BackendConfig, BackendKind};

use crate::error::{SiloError, SiloResult};

// ============================================================================
// Constants
// ============================================================================

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 512;

/// Default flush threshold for the cluster-quantization engine.
pub const DEFAULT_IVFPQ_THRESHOLD: usize = 10_000;

/// Default flush threshold for the graph engine.
pub const DEFAULT_HNSW_THRESHOLD: usize = 1_000;

// ============================================================================
// Modality
// ============================================================================

/// The two independent content domains indexed in parallel.
///
/// Each modality owns its own ingestion buffer, engine instance, and metadata
/// store; identifiers are never shared across modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Text embeddings.
    Text,
    /// Image embeddings.
    Image,
}

impl Modality {
    /// Both modalities, in the order flushes walk them.
    pub const ALL: [Modality; 2] = [Modality::Text, Modality::Image];

    /// Get the modality name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Modality {
    type Err = SiloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Modality::Text),
            "image" => Ok(Modality::Image),
            other => Err(SiloError::invalid_modality(other)),
        }
    }
}

// ============================================================================
// SiloConfig
// ============================================================================

/// Configuration for a [`SiloIndex`](crate::SiloIndex), fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiloConfig {
    /// Embedding dimension every stored vector must match.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Engine selection and hyperparameters.
    pub backend: BackendConfig,

    /// Buffer size at which a store triggers the joint flush.
    ///
    /// `None` uses the per-kind default: 10 000 for the cluster-quantization
    /// engine, 1 000 for the graph engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

impl SiloConfig {
    /// Create a configuration with an explicit engine selection.
    pub fn new(dimension: usize, backend: BackendConfig) -> Self {
        Self {
            dimension,
            backend,
            threshold: None,
        }
    }

    /// Cluster-quantization configuration with the default dimension.
    pub fn ivfpq(clusters: usize) -> Self {
        Self::new(DEFAULT_DIMENSION, BackendConfig::ivfpq(clusters))
    }

    /// Graph configuration with the default dimension.
    pub fn hnsw() -> Self {
        Self::new(DEFAULT_DIMENSION, BackendConfig::hnsw())
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Set an explicit flush threshold.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Engine family selected by this configuration.
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Flush threshold in effect: the explicit value, or the per-kind default.
    pub fn effective_threshold(&self) -> usize {
        self.threshold.unwrap_or(match self.kind() {
            BackendKind::IvfPq => DEFAULT_IVFPQ_THRESHOLD,
            BackendKind::Hnsw => DEFAULT_HNSW_THRESHOLD,
        })
    }

    /// Validate the dimension, engine hyperparameters, and threshold.
    pub fn validate(&self) -> SiloResult<()> {
        self.backend.validate(self.dimension)?;
        if self.threshold == Some(0) {
            return Err(SiloError::config("flush threshold must be > 0"));
        }
        Ok(())
    }
}

// ============================================================================
// SiloMeta
// ============================================================================

/// On-disk descriptor for a saved manager state (`silo.meta.json`).
///
/// Captures enough of the live configuration to verify on load that the
/// artifacts in a directory belong to a compatible manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiloMeta {
    /// Descriptor schema version for compatibility checks.
    pub schema_version: u32,

    /// Engine kind as string ("ivfpq" or "hnsw").
    pub backend: String,

    /// Embedding dimension.
    pub dimension: usize,

    /// Flush threshold in effect when the state was saved.
    pub threshold: usize,

    /// Committed text items at save time.
    pub text_count: u64,

    /// Committed image items at save time.
    pub image_count: u64,

    /// Timestamp of the first save into this directory.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the most recent save.
    pub updated_at: DateTime<Utc>,
}

impl SiloMeta {
    /// Current descriptor schema version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a descriptor for the given configuration and committed counts.
    pub fn new(config: &SiloConfig, text_count: u64, image_count: u64) -> Self {
        let now = Utc::now();
        Self {
            schema_version: Self::CURRENT_VERSION,
            backend: config.kind().to_string(),
            dimension: config.dimension,
            threshold: config.effective_threshold(),
            text_count,
            image_count,
            created_at: now,
            updated_at: now,
        }
    }

    /// Verify the descriptor matches the live configuration.
    ///
    /// Engine kind and dimension must match exactly. Schema-version drift is
    /// not an error here; the load path warns about it and proceeds.
    pub fn check_compatible(&self, config: &SiloConfig) -> SiloResult<()> {
        let kind = config.kind().to_string();
        if self.backend != kind {
            return Err(SiloError::incompatible(format!(
                "saved state was built with backend '{}', configuration selects '{}'",
                self.backend, kind
            )));
        }
        if self.dimension != config.dimension {
            return Err(SiloError::incompatible(format!(
                "saved state has dimension {}, configuration expects {}",
                self.dimension, config.dimension
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
