//! Error kinds for the retrieval pipeline.
//!
//! Every failure here has a defined recovered state: embedding failures
//! degrade retrieval to empty context, load failures trigger a full
//! rebuild, ingest failures roll the slot back to empty. None of them
//! may crash the host process.

use std::path::PathBuf;

/// Errors produced by the retrieval core.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The embedding backend is unreachable or erroring. Retryable;
    /// callers on the query path degrade to an empty passage list.
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A persisted index could not be read or failed structural
    /// validation. Recoverable by a full rebuild.
    #[error("persisted index at {path} is corrupt: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    /// A persisted index was built with a different embedding scheme or
    /// dimension than the one currently configured. Recoverable by a
    /// full rebuild.
    #[error("persisted index scheme mismatch: stored {stored}/{stored_dims}d, configured {configured}/{configured_dims}d")]
    SchemeMismatch {
        stored: String,
        stored_dims: usize,
        configured: String,
        configured_dims: usize,
    },

    /// Ingesting a document failed (I/O, extraction, or index build).
    /// The slot has been rolled back to its pre-ingest state.
    #[error("ingest of '{document}' failed: {reason}")]
    Ingest { document: String, reason: String },

    /// Best-effort teardown left something behind. The slot state has
    /// still advanced; the leftover paths are logged by the caller.
    #[error("eviction left {0} path(s) behind")]
    Eviction(usize),
}

impl RetrievalError {
    pub fn ingest(document: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RetrievalError::Ingest {
            document: document.into(),
            reason: reason.to_string(),
        }
    }
}
