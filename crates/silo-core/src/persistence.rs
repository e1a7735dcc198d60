//! On-disk persistence for manager state.
//!
//! Engine payloads are opaque byte blobs produced by the engines themselves;
//! metadata and the state descriptor are JSON. Storage layout:
//!
//! ```text
//! <dir>/
//! ├── silo.meta.json     # SiloMeta descriptor (backend, dimension, counts)
//! ├── text_index.bin     # Serialized text engine
//! ├── text_meta.json     # Text metadata records keyed by identifier
//! ├── image_index.bin    # Serialized image engine
//! └── image_meta.json    # Image metadata records keyed by identifier
//! ```
//!
//! Every file is written to a `.tmp` sibling and renamed into place, so a
//! crash mid-save leaves either the old artifact or the new one, never a
//! truncated mix.

use std::fs;
use std::path::{Path, PathBuf};

use silo_ann::{new_backend, VectorBackend};
use tracing::{debug, info, warn};

use crate::config::{Modality, SiloConfig, SiloMeta};
use crate::error::{SiloError, SiloResult};
use crate::manager::ManagerState;
use crate::metadata::MetadataStore;

/// Filename of the state descriptor.
pub const META_FILENAME: &str = "silo.meta.json";

/// Path of the serialized engine artifact for one modality.
pub fn index_path(dir: &Path, modality: Modality) -> PathBuf {
    dir.join(format!("{}_index.bin", modality.as_str()))
}

/// Path of the metadata records file for one modality.
pub fn metadata_path(dir: &Path, modality: Modality) -> PathBuf {
    dir.join(format!("{}_meta.json", modality.as_str()))
}

/// Path of the state descriptor file.
pub fn meta_path(dir: &Path) -> PathBuf {
    dir.join(META_FILENAME)
}

/// Write `bytes` to a temporary sibling of `path`, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> SiloResult<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SiloError::persistence(path, "artifact path has no file name"))?;
    let tmp = path.with_file_name(format!("{}.tmp", file_name));

    fs::write(&tmp, bytes)
        .map_err(|e| SiloError::persistence(&tmp, format!("Failed to write artifact: {}", e)))?;
    fs::rename(&tmp, path).map_err(|e| {
        SiloError::persistence(path, format!("Failed to move artifact into place: {}", e))
    })?;
    Ok(())
}

/// Read the state descriptor from `dir`, or `None` when no save exists.
///
/// # Errors
///
/// Returns an error when a descriptor file exists but cannot be read or
/// parsed.
pub fn read_meta(dir: &Path) -> SiloResult<Option<SiloMeta>> {
    let meta_file = meta_path(dir);
    if !meta_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&meta_file).map_err(|e| {
        SiloError::persistence(&meta_file, format!("Failed to read state descriptor: {}", e))
    })?;
    let meta: SiloMeta = serde_json::from_str(&content).map_err(|e| {
        SiloError::persistence(&meta_file, format!("Failed to parse state descriptor: {}", e))
    })?;
    Ok(Some(meta))
}

/// Persist both modalities' engine state and metadata into `dir`.
///
/// Creates the directory if needed. A pre-existing descriptor's `created_at`
/// is carried forward; everything else is rewritten.
pub(crate) fn save_state(dir: &Path, config: &SiloConfig, state: &ManagerState) -> SiloResult<()> {
    fs::create_dir_all(dir).map_err(|e| {
        SiloError::persistence(dir, format!("Failed to create state directory: {}", e))
    })?;

    for modality in Modality::ALL {
        let slice = state.get(modality);

        let index_file = index_path(dir, modality);
        let bytes = slice.backend.serialize().map_err(|e| {
            SiloError::persistence(
                &index_file,
                format!("Failed to serialize {} engine: {}", modality, e),
            )
        })?;
        write_atomic(&index_file, &bytes)?;

        let metadata_file = metadata_path(dir, modality);
        let records = serde_json::to_vec_pretty(&slice.metadata).map_err(|e| {
            SiloError::persistence(
                &metadata_file,
                format!("Failed to serialize {} metadata: {}", modality, e),
            )
        })?;
        write_atomic(&metadata_file, &records)?;

        debug!(
            %modality,
            items = slice.backend.item_count(),
            records = slice.metadata.len(),
            "saved modality state"
        );
    }

    let mut meta = SiloMeta::new(
        config,
        state.text.backend.item_count(),
        state.image.backend.item_count(),
    );
    // A corrupt previous descriptor is about to be replaced; only a readable
    // one contributes its creation timestamp.
    if let Some(existing) = read_meta(dir).ok().flatten() {
        meta.created_at = existing.created_at;
    }

    let meta_file = meta_path(dir);
    let descriptor = serde_json::to_vec_pretty(&meta).map_err(|e| {
        SiloError::persistence(
            &meta_file,
            format!("Failed to serialize state descriptor: {}", e),
        )
    })?;
    write_atomic(&meta_file, &descriptor)?;

    info!(
        dir = %dir.display(),
        text = meta.text_count,
        image = meta.image_count,
        "saved index state"
    );
    Ok(())
}

/// Decode one modality's artifacts into a fresh engine and metadata store.
fn load_modality(
    dir: &Path,
    config: &SiloConfig,
    modality: Modality,
) -> SiloResult<(Box<dyn VectorBackend>, MetadataStore)> {
    let index_file = index_path(dir, modality);
    let bytes = fs::read(&index_file).map_err(|e| {
        SiloError::persistence(
            &index_file,
            format!("Failed to read {} engine: {}", modality, e),
        )
    })?;
    let mut backend = new_backend(&config.backend, config.dimension)?;
    backend.deserialize(&bytes).map_err(|e| {
        SiloError::persistence(
            &index_file,
            format!("Failed to decode {} engine: {}", modality, e),
        )
    })?;

    let metadata_file = metadata_path(dir, modality);
    let content = fs::read_to_string(&metadata_file).map_err(|e| {
        SiloError::persistence(
            &metadata_file,
            format!("Failed to read {} metadata: {}", modality, e),
        )
    })?;
    let metadata: MetadataStore = serde_json::from_str(&content).map_err(|e| {
        SiloError::persistence(
            &metadata_file,
            format!("Failed to parse {} metadata: {}", modality, e),
        )
    })?;

    debug!(
        %modality,
        items = backend.item_count(),
        records = metadata.len(),
        "loaded modality state"
    );
    Ok((backend, metadata))
}

/// Replace `state` with the artifacts saved under `dir`.
///
/// Every expected file must exist and decode, and the descriptor must match
/// the live configuration, before anything is swapped in; a failure leaves
/// `state` untouched. Pending buffers are cleared on success.
pub(crate) fn load_state(
    dir: &Path,
    config: &SiloConfig,
    state: &mut ManagerState,
) -> SiloResult<()> {
    let required = [
        meta_path(dir),
        index_path(dir, Modality::Text),
        metadata_path(dir, Modality::Text),
        index_path(dir, Modality::Image),
        metadata_path(dir, Modality::Image),
    ];
    for path in &required {
        if !path.exists() {
            return Err(SiloError::artifact_missing(path));
        }
    }

    let meta = read_meta(dir)?.ok_or_else(|| SiloError::artifact_missing(meta_path(dir)))?;
    meta.check_compatible(config)?;
    if meta.schema_version != SiloMeta::CURRENT_VERSION {
        warn!(
            found = meta.schema_version,
            expected = SiloMeta::CURRENT_VERSION,
            "state descriptor schema version differs, attempting load anyway"
        );
    }

    let (text_backend, text_metadata) = load_modality(dir, config, Modality::Text)?;
    let (image_backend, image_metadata) = load_modality(dir, config, Modality::Image)?;

    let text = state.get_mut(Modality::Text);
    text.backend = text_backend;
    text.metadata = text_metadata;
    text.buffer.clear();

    let image = state.get_mut(Modality::Image);
    image.backend = image_backend;
    image.metadata = image_metadata;
    image.buffer.clear();

    info!(
        dir = %dir.display(),
        text = meta.text_count,
        image = meta.image_count,
        "loaded index state"
    );
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
