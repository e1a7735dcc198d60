//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{AnnError, AnnResult};

// ============================================================================
// Constants
// ============================================================================

/// Default number of PQ segments per vector (cluster-quantization engine).
pub const DEFAULT_SUB_VECTORS: usize = 16;

/// Default graph fan-out (maximum neighbors per node above layer 0).
pub const DEFAULT_FAN_OUT: usize = 32;

/// Default construction breadth (candidate pool size while inserting).
pub const DEFAULT_EF_CONSTRUCTION: usize = 80;

/// Default search breadth (candidate pool size while querying).
pub const DEFAULT_SEARCH_BREADTH: usize = 16;

// ============================================================================
// BackendKind
// ============================================================================

/// The two engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Cluster-quantization engine: coarse partitioning + product quantization.
    IvfPq,
    /// Graph engine: layered navigable proximity graph.
    Hnsw,
}

impl BackendKind {
    /// Get the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::IvfPq => "ivfpq",
            BackendKind::Hnsw => "hnsw",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = AnnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ivfpq" => Ok(BackendKind::IvfPq),
            "hnsw" => Ok(BackendKind::Hnsw),
            other => Err(AnnError::config(format!(
                "unknown backend kind '{}' (expected 'ivfpq' or 'hnsw')",
                other
            ))),
        }
    }
}

// ============================================================================
// BackendConfig
// ============================================================================

/// Engine selection and hyperparameters, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BackendConfig {
    /// Cluster-quantization engine.
    #[serde(rename = "ivfpq", rename_all = "camelCase")]
    IvfPq {
        /// Number of coarse clusters (inverted lists).
        clusters: usize,

        /// Number of PQ segments each vector is split into.
        /// Must divide the embedding dimension evenly.
        #[serde(default = "default_sub_vectors")]
        sub_vectors: usize,
    },

    /// Graph engine.
    #[serde(rename = "hnsw", rename_all = "camelCase")]
    Hnsw {
        /// Maximum neighbors per node above layer 0 (layer 0 allows double).
        #[serde(default = "default_fan_out")]
        fan_out: usize,

        /// Candidate pool size while inserting.
        #[serde(default = "default_ef_construction")]
        ef_construction: usize,

        /// Candidate pool size while querying.
        #[serde(default = "default_search_breadth")]
        search_breadth: usize,
    },
}

fn default_sub_vectors() -> usize {
    DEFAULT_SUB_VECTORS
}

fn default_fan_out() -> usize {
    DEFAULT_FAN_OUT
}

fn default_ef_construction() -> usize {
    DEFAULT_EF_CONSTRUCTION
}

fn default_search_breadth() -> usize {
    DEFAULT_SEARCH_BREADTH
}

impl BackendConfig {
    /// Cluster-quantization config with the default segment count.
    pub fn ivfpq(clusters: usize) -> Self {
        BackendConfig::IvfPq {
            clusters,
            sub_vectors: DEFAULT_SUB_VECTORS,
        }
    }

    /// Graph config with default hyperparameters.
    pub fn hnsw() -> Self {
        BackendConfig::Hnsw {
            fan_out: DEFAULT_FAN_OUT,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            search_breadth: DEFAULT_SEARCH_BREADTH,
        }
    }

    /// Which engine family this config selects.
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::IvfPq { .. } => BackendKind::IvfPq,
            BackendConfig::Hnsw { .. } => BackendKind::Hnsw,
        }
    }

    /// Validate the hyperparameters against an embedding dimension.
    pub fn validate(&self, dimension: usize) -> AnnResult<()> {
        if dimension == 0 {
            return Err(AnnError::config("embedding dimension must be > 0"));
        }
        match self {
            BackendConfig::IvfPq {
                clusters,
                sub_vectors,
            } => {
                if *clusters == 0 {
                    return Err(AnnError::config("cluster count must be > 0"));
                }
                if *sub_vectors == 0 {
                    return Err(AnnError::config("sub-vector count must be > 0"));
                }
                if dimension % sub_vectors != 0 {
                    return Err(AnnError::config(format!(
                        "dimension {} is not divisible by sub-vector count {}",
                        dimension, sub_vectors
                    )));
                }
            }
            BackendConfig::Hnsw {
                fan_out,
                ef_construction,
                search_breadth,
            } => {
                if *fan_out == 0 {
                    return Err(AnnError::config("graph fan-out must be > 0"));
                }
                if *ef_construction == 0 {
                    return Err(AnnError::config("construction breadth must be > 0"));
                }
                if *search_breadth == 0 {
                    return Err(AnnError::config("search breadth must be > 0"));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(BackendKind::IvfPq.as_str(), "ivfpq");
        assert_eq!(BackendKind::Hnsw.as_str(), "hnsw");
        assert_eq!(BackendKind::IvfPq.to_string(), "ivfpq");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("ivfpq".parse::<BackendKind>().unwrap(), BackendKind::IvfPq);
        assert_eq!("HNSW".parse::<BackendKind>().unwrap(), BackendKind::Hnsw);
        assert!("flat".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_ivfpq_defaults() {
        let config = BackendConfig::ivfpq(128);
        assert_eq!(config.kind(), BackendKind::IvfPq);
        match config {
            BackendConfig::IvfPq {
                clusters,
                sub_vectors,
            } => {
                assert_eq!(clusters, 128);
                assert_eq!(sub_vectors, DEFAULT_SUB_VECTORS);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_hnsw_defaults() {
        match BackendConfig::hnsw() {
            BackendConfig::Hnsw {
                fan_out,
                ef_construction,
                search_breadth,
            } => {
                assert_eq!(fan_out, 32);
                assert_eq!(ef_construction, 80);
                assert_eq!(search_breadth, 16);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = BackendConfig::ivfpq(64);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"kind\":\"ivfpq\""));
        assert!(json.contains("\"subVectors\":16"));

        let parsed: BackendConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_json_defaults_fill_in() {
        let parsed: BackendConfig = serde_json::from_str(r#"{"kind":"hnsw"}"#).unwrap();
        assert_eq!(parsed, BackendConfig::hnsw());

        let parsed: BackendConfig =
            serde_json::from_str(r#"{"kind":"ivfpq","clusters":32}"#).unwrap();
        assert_eq!(parsed, BackendConfig::ivfpq(32));
    }

    #[test]
    fn test_validate_ivfpq() {
        assert!(BackendConfig::ivfpq(128).validate(512).is_ok());
        assert!(BackendConfig::ivfpq(0).validate(512).is_err());
        // 512 % 16 == 0, but 100 % 16 != 0
        assert!(BackendConfig::ivfpq(128).validate(100).is_err());
        assert!(BackendConfig::ivfpq(128).validate(0).is_err());
    }

    #[test]
    fn test_validate_hnsw() {
        assert!(BackendConfig::hnsw().validate(512).is_ok());
        let bad = BackendConfig::Hnsw {
            fan_out: 0,
            ef_construction: 80,
            search_breadth: 16,
        };
        assert!(bad.validate(512).is_err());
    }
}
