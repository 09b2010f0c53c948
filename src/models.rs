//! Core data models for the retrieval pipeline.
//!
//! These types represent the active document, its passages, and search
//! results as they flow through chunking, indexing, and retrieval.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the single active-document slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// No document is active; queries return empty results.
    Empty,
    /// Raw content is being persisted.
    Uploading,
    /// The index is being rebuilt; the slot is not yet queryable.
    Indexing,
    /// The document is indexed and queryable.
    Ready,
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentState::Empty => "empty",
            DocumentState::Uploading => "uploading",
            DocumentState::Indexing => "indexing",
            DocumentState::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// The currently active document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier: the uploaded file name.
    pub id: String,
    /// Extracted plain text body.
    pub body: String,
    /// Unix timestamp of ingestion.
    pub ingested_at: i64,
}

/// A bounded substring of a document used as the unit of retrieval.
///
/// Immutable once produced by the chunker; destroyed when the owning
/// document is evicted and the index rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    /// Owning document identifier.
    pub document_id: String,
    /// Ordinal position within the document, starting at 0.
    pub ordinal: usize,
    pub text: String,
    /// Number of characters at the start of `text` repeated from the end
    /// of the preceding passage. Zero for the first passage.
    pub overlap: usize,
    /// SHA-256 of `text`, for staleness checks.
    pub hash: String,
}

/// A passage scored against a query, ascending distance = more relevant.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Passage,
    /// Squared Euclidean distance between query and passage vectors.
    pub distance: f32,
}
