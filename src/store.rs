//! Durable storage for the similarity index.
//!
//! A saved index is a directory of three files:
//! - `meta.json` — embedding scheme tag, dimension, passage count,
//!   saved-at timestamp;
//! - `passages.json` — the passage payloads;
//! - `vectors.bin` — all vectors as contiguous little-endian f32.
//!
//! [`save`] is atomic from the reader's point of view: everything is
//! written into a sibling temp directory which is then renamed over the
//! destination, so a reader never observes a half-written index.
//!
//! [`load`] validates structure and scheme before handing an index
//! back. Unreadable content is `CorruptIndex`; a stored scheme or
//! dimension that differs from the configured embedder is
//! `SchemeMismatch`. Both are recoverable by a full rebuild.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::RetrievalError;
use crate::index::VectorIndex;
use crate::models::Passage;

const META_FILE: &str = "meta.json";
const PASSAGES_FILE: &str = "passages.json";
const VECTORS_FILE: &str = "vectors.bin";

/// Metadata persisted alongside the vectors.
#[derive(Debug, Serialize, Deserialize)]
struct IndexMeta {
    scheme: String,
    dims: usize,
    passages: usize,
    saved_at: i64,
}

/// Cheap existence check used to decide between load-and-validate and
/// build-from-scratch at startup.
pub fn exists(dir: &Path) -> bool {
    dir.join(META_FILE).is_file()
}

/// Serialize the full index to `dir`, replacing any prior content.
pub fn save(index: &VectorIndex, dir: &Path) -> io::Result<()> {
    let tmp = dir.with_extension("tmp");
    if tmp.exists() {
        std::fs::remove_dir_all(&tmp)?;
    }
    std::fs::create_dir_all(&tmp)?;

    let meta = IndexMeta {
        scheme: index.scheme().to_string(),
        dims: index.dims(),
        passages: index.len(),
        saved_at: chrono::Utc::now().timestamp(),
    };
    std::fs::write(tmp.join(META_FILE), serde_json::to_vec_pretty(&meta)?)?;
    std::fs::write(
        tmp.join(PASSAGES_FILE),
        serde_json::to_vec(index.passages())?,
    )?;

    let mut blob = Vec::with_capacity(index.len() * index.dims() * 4);
    for vec in index.vectors() {
        blob.extend_from_slice(&vec_to_blob(vec));
    }
    std::fs::write(tmp.join(VECTORS_FILE), blob)?;

    // Swap the finished directory into place.
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::rename(&tmp, dir)?;
    Ok(())
}

/// Deserialize a previously saved index, validating it against the
/// configured embedder's `dims` and `scheme`.
pub fn load(dir: &Path, dims: usize, scheme: &str) -> Result<VectorIndex, RetrievalError> {
    let corrupt = |reason: String| RetrievalError::CorruptIndex {
        path: dir.to_path_buf(),
        reason,
    };

    let meta_raw = std::fs::read(dir.join(META_FILE))
        .map_err(|e| corrupt(format!("cannot read {}: {}", META_FILE, e)))?;
    let meta: IndexMeta = serde_json::from_slice(&meta_raw)
        .map_err(|e| corrupt(format!("cannot parse {}: {}", META_FILE, e)))?;

    if meta.scheme != scheme || meta.dims != dims {
        return Err(RetrievalError::SchemeMismatch {
            stored: meta.scheme,
            stored_dims: meta.dims,
            configured: scheme.to_string(),
            configured_dims: dims,
        });
    }

    let passages_raw = std::fs::read(dir.join(PASSAGES_FILE))
        .map_err(|e| corrupt(format!("cannot read {}: {}", PASSAGES_FILE, e)))?;
    let passages: Vec<Passage> = serde_json::from_slice(&passages_raw)
        .map_err(|e| corrupt(format!("cannot parse {}: {}", PASSAGES_FILE, e)))?;

    if passages.len() != meta.passages {
        return Err(corrupt(format!(
            "meta says {} passages, payload has {}",
            meta.passages,
            passages.len()
        )));
    }

    let blob = std::fs::read(dir.join(VECTORS_FILE))
        .map_err(|e| corrupt(format!("cannot read {}: {}", VECTORS_FILE, e)))?;
    let expected_bytes = passages.len() * dims * 4;
    if blob.len() != expected_bytes {
        return Err(corrupt(format!(
            "{} is {} bytes, expected {}",
            VECTORS_FILE,
            blob.len(),
            expected_bytes
        )));
    }

    let vectors: Vec<Vec<f32>> = blob
        .chunks_exact(dims * 4)
        .map(blob_to_vec)
        .collect();

    VectorIndex::build(passages, vectors, dims, scheme).map_err(|e| corrupt(e.to_string()))
}
