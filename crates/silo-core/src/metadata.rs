//! Identifier-keyed metadata side-table.
//!
//! One store per modality maps committed identifiers to the caller-supplied
//! JSON record attached at store time. Lookups key on the integer identifier
//! everywhere in memory; the JSON file format necessarily spells map keys as
//! decimal strings, a conversion serde performs at the serialization boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use silo_ann::VectorId;

// ============================================================================
// MetadataStore
// ============================================================================

/// Mapping from committed identifier to its metadata record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStore {
    records: BTreeMap<u64, Value>,
}

impl MetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `metadata` to `id`.
    ///
    /// Records are written once, at commit time; identifiers only repeat
    /// after a reset, which clears the store first.
    pub fn insert(&mut self, id: impl Into<VectorId>, metadata: Value) {
        self.records.insert(id.into().value(), metadata);
    }

    /// Look up the record for `id`.
    pub fn get(&self, id: impl Into<VectorId>) -> Option<&Value> {
        self.records.get(&id.into().value())
    }

    /// Whether a record exists for `id`.
    pub fn contains(&self, id: impl Into<VectorId>) -> bool {
        self.records.contains_key(&id.into().value())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let mut store = MetadataStore::new();
        assert!(store.is_empty());

        store.insert(0u64, json!({"path": "a.txt"}));
        store.insert(1u64, json!({"path": "b.txt"}));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0u64).unwrap()["path"], "a.txt");
        assert_eq!(store.get(1u64).unwrap()["path"], "b.txt");
        assert!(store.get(2u64).is_none());
        assert!(store.contains(1u64));
        assert!(!store.contains(9u64));
    }

    #[test]
    fn test_accepts_vector_id_keys() {
        let mut store = MetadataStore::new();
        store.insert(VectorId::new(7), json!("seven"));
        assert_eq!(store.get(VectorId::new(7)).unwrap(), "seven");
    }

    #[test]
    fn test_clear() {
        let mut store = MetadataStore::new();
        store.insert(0u64, json!({}));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_keys_are_decimal_strings() {
        let mut store = MetadataStore::new();
        store.insert(0u64, json!({"id": "a"}));
        store.insert(12u64, json!({"id": "b"}));

        let json = serde_json::to_string(&store).unwrap();
        assert!(json.contains("\"0\":"));
        assert!(json.contains("\"12\":"));

        let parsed: MetadataStore = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, store);
        assert_eq!(parsed.get(12u64).unwrap()["id"], "b");
    }
}
