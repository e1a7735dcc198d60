//! Integration tests for the silo-core public API.
//!
//! These tests exercise the complete manager flow, store through flush,
//! search, save, and load, using only the crate's public surface.
//!
//! # Test Strategy
//!
//! - Each test creates a fresh manager and, where needed, a temporary state
//!   directory
//! - Both engine kinds are taken through the full lifecycle
//! - Tests validate search results, filesystem artifacts, and error paths

use std::fs;

use serde_json::{json, Value};
use tempfile::TempDir;

use silo_core::{BackendConfig, Modality, SiloConfig, SiloError, SiloIndex};

/// Well-separated embedding: one strong axis per item, small tail.
fn embedding(i: usize, dim: usize) -> Vec<f32> {
    let mut v = vec![0.05 * (i % 3) as f32; dim];
    v[i % dim] = 10.0 + i as f32;
    v
}

/// Manager with a graph engine and an explicit flush threshold.
fn hnsw_index(dimension: usize, threshold: usize) -> SiloIndex {
    SiloIndex::new(
        SiloConfig::hnsw()
            .with_dimension(dimension)
            .with_threshold(threshold),
    )
    .expect("construct manager")
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_hnsw_store_flush_search_lifecycle() {
    let index = hnsw_index(8, 100);

    // Buffer five text items and two image items; nothing is committed yet.
    for i in 0..5 {
        index
            .store(Modality::Text, embedding(i, 8), json!({"n": i}))
            .expect("store text");
    }
    for i in 0..2 {
        index
            .store(Modality::Image, embedding(i, 8), json!({"img": i}))
            .expect("store image");
    }
    assert_eq!(index.current_size().expect("sizes").total(), 0);

    // Manual flush commits both modalities.
    index.flush().expect("flush");
    let sizes = index.current_size().expect("sizes");
    assert_eq!(sizes.text, 5);
    assert_eq!(sizes.image, 2);

    // Search resolves engine hits back to stored metadata, best first.
    let matches = index
        .search(Modality::Text, &embedding(2, 8), 3)
        .expect("search text");
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].id.value(), 2);
    assert_eq!(matches[0].metadata, json!({"n": 2}));
    assert!(matches[0].distance <= matches[1].distance);

    let matches = index
        .search(Modality::Image, &embedding(1, 8), 1)
        .expect("search image");
    assert_eq!(matches[0].metadata, json!({"img": 1}));
}

#[test]
fn test_ivfpq_lifecycle_with_undersized_training_batch() {
    // 64 configured clusters but only 30 training vectors: the engine
    // corrects the cluster count internally instead of failing.
    let config = SiloConfig::new(32, BackendConfig::ivfpq(64)).with_threshold(30);
    let index = SiloIndex::new(config).expect("construct manager");

    // The 30th store crosses the threshold and triggers train + commit.
    for i in 0..30 {
        index
            .store(Modality::Text, embedding(i, 32), json!({"n": i}))
            .expect("store text");
    }

    let stats = index.stats().expect("stats");
    assert_eq!(stats.backend, "ivfpq");
    assert_eq!(stats.text.committed, 30);
    assert_eq!(stats.text.pending, 0);
    assert!(stats.text.trained);

    for i in [0usize, 13, 29] {
        let matches = index
            .search(Modality::Text, &embedding(i, 32), 1)
            .expect("search text");
        assert_eq!(matches[0].metadata["n"], i);
    }
}

#[test]
fn test_surge_in_one_modality_commits_both() {
    let index = hnsw_index(8, 4);

    index
        .store(Modality::Image, embedding(0, 8), json!({"img": 0}))
        .expect("store image");
    assert_eq!(index.current_size().expect("sizes").image, 0);

    // Four text stores reach the threshold; the lone image item rides along.
    for i in 0..4 {
        index
            .store(Modality::Text, embedding(i, 8), json!({"n": i}))
            .expect("store text");
    }

    let sizes = index.current_size().expect("sizes");
    assert_eq!(sizes.text, 4);
    assert_eq!(sizes.image, 1);

    let matches = index
        .search(Modality::Image, &embedding(0, 8), 1)
        .expect("search image");
    assert_eq!(matches[0].id.value(), 0);
    assert_eq!(matches[0].metadata, json!({"img": 0}));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_persisted_state_reopens_in_fresh_manager() {
    let temp = TempDir::new().expect("create temp dir");
    let dir = temp.path();

    // First manager: commit five text items and one image item, then save.
    let first = hnsw_index(8, 100);
    for i in 0..5 {
        first
            .store(Modality::Text, embedding(i, 8), json!({"n": i}))
            .expect("store text");
    }
    first
        .store(Modality::Image, embedding(0, 8), json!({"img": 0}))
        .expect("store image");
    first.flush().expect("flush");
    first.save(dir).expect("save");

    let expected = first
        .search(Modality::Text, &embedding(3, 8), 2)
        .expect("search before save");

    // Second manager: same configuration, fresh process in spirit.
    let second = hnsw_index(8, 100);
    second.load(dir).expect("load");

    let sizes = second.current_size().expect("sizes");
    assert_eq!(sizes.text, 5);
    assert_eq!(sizes.image, 1);
    assert_eq!(
        second
            .search(Modality::Text, &embedding(3, 8), 2)
            .expect("search after load"),
        expected
    );

    // Ingestion continues where the saved state left off: the next commit
    // extends the identifier sequence.
    second
        .store(Modality::Text, embedding(5, 8), json!({"n": 5}))
        .expect("store after load");
    second.flush().expect("flush after load");
    let matches = second
        .search(Modality::Text, &embedding(5, 8), 1)
        .expect("search new item");
    assert_eq!(matches[0].id.value(), 5);
    assert_eq!(matches[0].metadata, json!({"n": 5}));
}

#[test]
fn test_save_captures_committed_state_only() {
    let temp = TempDir::new().expect("create temp dir");
    let index = hnsw_index(8, 100);

    index
        .store(Modality::Text, embedding(0, 8), json!({"n": 0}))
        .expect("store text");
    // No flush: the buffered item is not part of the persisted state.
    index.save(temp.path()).expect("save");

    let reopened = hnsw_index(8, 100);
    reopened.load(temp.path()).expect("load");
    assert_eq!(reopened.current_size().expect("sizes").total(), 0);
}

#[test]
fn test_load_rejects_mismatched_configuration() {
    let temp = TempDir::new().expect("create temp dir");
    let index = hnsw_index(8, 100);
    index
        .store(Modality::Text, embedding(0, 8), json!({"n": 0}))
        .expect("store text");
    index.flush().expect("flush");
    index.save(temp.path()).expect("save");

    // Different engine kind.
    let other_kind = SiloIndex::new(
        SiloConfig::new(8, BackendConfig::IvfPq {
            clusters: 4,
            sub_vectors: 2,
        })
        .with_threshold(10),
    )
    .expect("construct manager");
    assert!(matches!(
        other_kind.load(temp.path()).unwrap_err(),
        SiloError::Incompatible { .. }
    ));

    // Different dimension.
    let wider = hnsw_index(16, 100);
    assert!(matches!(
        wider.load(temp.path()).unwrap_err(),
        SiloError::Incompatible { .. }
    ));
}

#[test]
fn test_load_from_empty_directory_fails_loudly() {
    let temp = TempDir::new().expect("create temp dir");
    let index = hnsw_index(8, 100);

    assert!(matches!(
        index.load(temp.path()).unwrap_err(),
        SiloError::ArtifactMissing { .. }
    ));

    // The failed load leaves the manager fully usable.
    index
        .store(Modality::Text, embedding(0, 8), json!({"n": 0}))
        .expect("store after failed load");
    index.flush().expect("flush after failed load");
    assert_eq!(index.current_size().expect("sizes").text, 1);
}

#[test]
fn test_search_reports_missing_metadata_record() {
    let temp = TempDir::new().expect("create temp dir");
    let index = hnsw_index(8, 100);

    for i in 0..3 {
        index
            .store(Modality::Text, embedding(i, 8), json!({"n": i}))
            .expect("store text");
    }
    index.flush().expect("flush");
    index.save(temp.path()).expect("save");

    // Drop one record from the text metadata artifact behind the manager's
    // back, then reload.
    let records_path = temp.path().join("text_meta.json");
    let mut records: Value =
        serde_json::from_str(&fs::read_to_string(&records_path).expect("read text metadata"))
            .expect("parse text metadata");
    records
        .as_object_mut()
        .expect("metadata object")
        .remove("1")
        .expect("record for identifier 1");
    fs::write(&records_path, records.to_string()).expect("rewrite text metadata");

    index.load(temp.path()).expect("load");

    // The engine still returns identifier 1; the lost record surfaces as an
    // index/side-table inconsistency instead of an empty result.
    let err = index
        .search(Modality::Text, &embedding(1, 8), 1)
        .unwrap_err();
    match err {
        SiloError::MetadataMissing { modality, id } => {
            assert_eq!(modality, Modality::Text);
            assert_eq!(id.value(), 1);
        }
        other => panic!("expected MetadataMissing, got {:?}", other),
    }

    // Identifiers the side-table still covers resolve normally.
    let matches = index
        .search(Modality::Text, &embedding(0, 8), 1)
        .expect("search intact record");
    assert_eq!(matches[0].metadata, json!({"n": 0}));
}

// ============================================================================
// Artifact formats
// ============================================================================

#[test]
fn test_saved_artifacts_are_inspectable_json() {
    let temp = TempDir::new().expect("create temp dir");
    let index = hnsw_index(8, 100);

    for i in 0..3 {
        index
            .store(Modality::Text, embedding(i, 8), json!({"n": i}))
            .expect("store text");
    }
    index.flush().expect("flush");
    index.save(temp.path()).expect("save");

    // The descriptor is camelCase JSON.
    let descriptor = fs::read_to_string(temp.path().join("silo.meta.json"))
        .expect("read descriptor");
    let descriptor: Value = serde_json::from_str(&descriptor).expect("parse descriptor");
    assert_eq!(descriptor["schemaVersion"], 1);
    assert_eq!(descriptor["backend"], "hnsw");
    assert_eq!(descriptor["dimension"], 8);
    assert_eq!(descriptor["textCount"], 3);
    assert_eq!(descriptor["imageCount"], 0);
    assert!(descriptor["createdAt"].is_string());

    // Metadata records are keyed by decimal identifier strings.
    let records = fs::read_to_string(temp.path().join("text_meta.json"))
        .expect("read text metadata");
    let records: Value = serde_json::from_str(&records).expect("parse text metadata");
    let object = records.as_object().expect("metadata object");
    assert_eq!(object.len(), 3);
    for i in 0..3 {
        assert_eq!(object[&i.to_string()]["n"], i);
    }

    // Engine payloads exist alongside, one per modality.
    assert!(temp.path().join("text_index.bin").exists());
    assert!(temp.path().join("image_index.bin").exists());
    assert!(temp.path().join("image_meta.json").exists());
}
