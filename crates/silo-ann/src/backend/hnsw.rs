//! Graph engine: layered navigable proximity graph.
//!
//! Every committed vector becomes a node with a randomly sampled top layer
//! (geometric distribution, normalized by the fan-out). Insertion descends
//! greedily from the entry point, then links the node into each of its
//! layers against the `ef_construction` best candidates, pruning neighbor
//! lists back to the fan-out cap (double at layer 0). Search descends the
//! same way and runs a best-first scan of layer 0 with breadth
//! `max(ef_search, k)`.
//!
//! There is no training phase; `train` is a maintenance no-op kept for
//! interface parity with the cluster-quantization engine.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{BackendConfig, BackendKind};
use crate::distance::l2_squared;
use crate::error::{AnnError, AnnResult};
use crate::traits::{SearchHit, VectorBackend};

/// Hard cap on sampled node layers.
const MAX_LEVEL: usize = 16;

/// Initial state of the level-sampling generator.
const LEVEL_SEED: u64 = 0x9E37_79B9_97F4_A7C5;

// ============================================================================
// Candidate ordering
// ============================================================================

/// A node paired with its distance to the current query.
///
/// Ordered by distance (ties by id), so a `BinaryHeap<Candidate>` keeps the
/// farthest on top and `BinaryHeap<Reverse<Candidate>>` the nearest.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    dist: f32,
    id: u64,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// HnswIndex
// ============================================================================

/// One graph node: the vector plus per-layer adjacency.
///
/// The node's top layer is `neighbors.len() - 1`.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
struct HnswNode {
    vector: Vec<f32>,
    neighbors: Vec<Vec<u64>>,
}

/// The graph engine.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct HnswIndex {
    dimension: usize,
    fan_out: usize,
    max_neighbors0: usize,
    ef_construction: usize,
    ef_search: usize,
    /// Level normalization factor, `1 / ln(fan_out)`.
    ml: f64,
    rng_state: u64,
    entry_point: Option<u64>,
    max_level: usize,
    nodes: Vec<HnswNode>,
}

impl HnswIndex {
    /// Create an empty graph.
    pub fn new(
        dimension: usize,
        fan_out: usize,
        ef_construction: usize,
        ef_search: usize,
    ) -> AnnResult<Self> {
        BackendConfig::Hnsw {
            fan_out,
            ef_construction,
            search_breadth: ef_search,
        }
        .validate(dimension)?;

        let ml = if fan_out > 1 {
            1.0 / (fan_out as f64).ln()
        } else {
            0.0
        };

        Ok(Self {
            dimension,
            fan_out,
            max_neighbors0: fan_out * 2,
            ef_construction,
            ef_search,
            ml,
            rng_state: LEVEL_SEED,
            entry_point: None,
            max_level: 0,
            nodes: Vec::new(),
        })
    }

    /// Sample a top layer for a new node (xorshift64 + geometric draw).
    fn random_level(&mut self) -> usize {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;

        let uniform = (x as f64 / u64::MAX as f64).max(f64::EPSILON);
        ((-uniform.ln() * self.ml).floor() as usize).min(MAX_LEVEL)
    }

    /// Best-first scan of one layer starting from `entry`.
    ///
    /// Returns up to `ef` candidates sorted ascending by distance.
    fn search_layer(&self, query: &[f32], entry: u64, ef: usize, layer: usize) -> Vec<Candidate> {
        let seed = Candidate {
            dist: l2_squared(&self.nodes[entry as usize].vector, query),
            id: entry,
        };

        let mut visited: HashSet<u64> = HashSet::new();
        visited.insert(entry);
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse(seed));
        let mut results: BinaryHeap<Candidate> = BinaryHeap::new();
        results.push(seed);

        while let Some(Reverse(current)) = frontier.pop() {
            let farthest = results.peek().map(|c| c.dist).unwrap_or(f32::MAX);
            if current.dist > farthest {
                break;
            }

            let links = match self.nodes[current.id as usize].neighbors.get(layer) {
                Some(links) => links,
                None => continue,
            };
            for &nid in links {
                if !visited.insert(nid) {
                    continue;
                }
                let dist = l2_squared(&self.nodes[nid as usize].vector, query);
                let farthest = results.peek().map(|c| c.dist).unwrap_or(f32::MAX);
                if results.len() < ef || dist < farthest {
                    let candidate = Candidate { dist, id: nid };
                    frontier.push(Reverse(candidate));
                    results.push(candidate);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out = results.into_vec();
        out.sort();
        out
    }

    /// Pick up to `m` links from `candidates` (sorted ascending).
    ///
    /// A candidate is kept when it is closer to the query than to every
    /// already-kept neighbor, which spreads links across directions;
    /// remaining slots are backfilled with the nearest rejects.
    fn select_neighbors(&self, candidates: &[Candidate], m: usize) -> Vec<u64> {
        let mut selected: Vec<Candidate> = Vec::with_capacity(m);
        for &c in candidates {
            if selected.len() >= m {
                break;
            }
            let keep = selected.iter().all(|s| {
                c.dist
                    < l2_squared(
                        &self.nodes[c.id as usize].vector,
                        &self.nodes[s.id as usize].vector,
                    )
            });
            if keep {
                selected.push(c);
            }
        }
        if selected.len() < m {
            for &c in candidates {
                if selected.len() >= m {
                    break;
                }
                if !selected.iter().any(|s| s.id == c.id) {
                    selected.push(c);
                }
            }
        }
        selected.into_iter().map(|c| c.id).collect()
    }

    /// Re-select a node's links at one layer after an overflow.
    fn prune_neighbors(&mut self, node_id: u64, layer: usize, cap: usize) {
        let base = self.nodes[node_id as usize].vector.clone();
        let ids = self.nodes[node_id as usize].neighbors[layer].clone();

        let mut candidates: Vec<Candidate> = ids
            .iter()
            .map(|&nid| Candidate {
                dist: l2_squared(&self.nodes[nid as usize].vector, &base),
                id: nid,
            })
            .collect();
        candidates.sort();

        let pruned = self.select_neighbors(&candidates, cap);
        self.nodes[node_id as usize].neighbors[layer] = pruned;
    }

    /// Insert one vector, returning its identifier.
    fn insert(&mut self, vector: Vec<f32>) -> u64 {
        let id = self.nodes.len() as u64;
        let level = self.random_level();
        self.nodes.push(HnswNode {
            vector,
            neighbors: vec![Vec::new(); level + 1],
        });

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return id;
        };

        let query = self.nodes[id as usize].vector.clone();
        let mut ep = entry;

        // Greedy descent through the layers above the node's top layer.
        let mut layer = self.max_level;
        while layer > level {
            if let Some(best) = self.search_layer(&query, ep, 1, layer).first() {
                ep = best.id;
            }
            layer -= 1;
        }

        // Link into every layer the node participates in.
        for layer in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(&query, ep, self.ef_construction, layer);
            let cap = if layer == 0 {
                self.max_neighbors0
            } else {
                self.fan_out
            };
            let selected = self.select_neighbors(&candidates, self.fan_out);
            for &nid in &selected {
                self.nodes[id as usize].neighbors[layer].push(nid);
                self.nodes[nid as usize].neighbors[layer].push(id);
                if self.nodes[nid as usize].neighbors[layer].len() > cap {
                    self.prune_neighbors(nid, layer, cap);
                }
            }
            if let Some(best) = candidates.first() {
                ep = best.id;
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(id);
        }
        id
    }

    fn check_batch(&self, batch: &[Vec<f32>]) -> AnnResult<()> {
        for vector in batch {
            if vector.len() != self.dimension {
                return Err(AnnError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        Ok(())
    }
}

impl VectorBackend for HnswIndex {
    fn kind(&self) -> BackendKind {
        BackendKind::Hnsw
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_trained(&self) -> bool {
        true
    }

    fn train(&mut self, batch: &[Vec<f32>]) -> AnnResult<()> {
        if batch.is_empty() {
            return Err(AnnError::training("cannot train on an empty batch"));
        }
        self.check_batch(batch)?;
        trace!("graph engine needs no training; maintenance call only");
        Ok(())
    }

    fn add(&mut self, batch: &[Vec<f32>]) -> AnnResult<()> {
        if batch.is_empty() {
            return Err(AnnError::add("cannot add an empty batch"));
        }
        self.check_batch(batch)?;

        for vector in batch {
            self.insert(vector.clone());
        }
        trace!(
            added = batch.len(),
            total = self.nodes.len(),
            "committed batch to graph"
        );
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AnnResult<Vec<SearchHit>> {
        let Some(entry) = self.entry_point else {
            return Err(AnnError::EmptyIndex);
        };
        if query.len() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut ep = entry;
        for layer in (1..=self.max_level).rev() {
            if let Some(best) = self.search_layer(query, ep, 1, layer).first() {
                ep = best.id;
            }
        }

        let ef = self.ef_search.max(k);
        let found = self.search_layer(query, ep, ef, 0);
        Ok(found
            .into_iter()
            .take(k)
            .map(|c| SearchHit::new(c.id, c.dist))
            .collect())
    }

    fn item_count(&self) -> u64 {
        self.nodes.len() as u64
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.entry_point = None;
        self.max_level = 0;
        self.rng_state = LEVEL_SEED;
        debug!("graph index reset");
    }

    fn serialize(&self) -> AnnResult<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| AnnError::codec(format!("failed to encode index state: {}", e)))
    }

    fn deserialize(&mut self, bytes: &[u8]) -> AnnResult<()> {
        let (decoded, _): (HnswIndex, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| AnnError::codec(format!("failed to decode index state: {}", e)))?;
        if decoded.dimension != self.dimension {
            return Err(AnnError::codec(format!(
                "artifact dimension {} does not match configured dimension {}",
                decoded.dimension, self.dimension
            )));
        }
        *self = decoded;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
