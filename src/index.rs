//! In-memory flat similarity index.
//!
//! Holds (passage, vector) pairs and answers nearest-neighbour queries
//! under squared Euclidean distance. The index is always built fresh
//! from a complete set of pairs; there is no incremental insert or
//! delete. Replacing or removing a document means discarding the whole
//! instance and building a new one, which is what keeps stale passages
//! from ever leaking into results.

use crate::error::RetrievalError;
use crate::models::{Passage, ScoredPassage};

/// A fixed set of passages and their vectors, queryable by distance.
///
/// An index with zero entries is a valid state: `search` returns empty
/// results, never an error. A missing or unreadable persisted index is
/// a different condition, reported by the store as `CorruptIndex`.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    passages: Vec<Passage>,
    vectors: Vec<Vec<f32>>,
    dims: usize,
    scheme: String,
}

impl VectorIndex {
    /// Build a fresh index from matched passage/vector pairs.
    ///
    /// `dims` and `scheme` describe the embedder the vectors came from
    /// and are persisted with the index so a later load can detect a
    /// scheme change. Every vector must have exactly `dims` components;
    /// mixed dimensions are never accepted.
    pub fn build(
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
        dims: usize,
        scheme: &str,
    ) -> Result<Self, RetrievalError> {
        if passages.len() != vectors.len() {
            return Err(RetrievalError::ingest(
                "index",
                format!(
                    "{} passages but {} vectors",
                    passages.len(),
                    vectors.len()
                ),
            ));
        }
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dims {
                return Err(RetrievalError::ingest(
                    "index",
                    format!("vector {} has {} dims, expected {}", i, v.len(), dims),
                ));
            }
        }

        Ok(Self {
            passages,
            vectors,
            dims,
            scheme: scheme.to_string(),
        })
    }

    /// An index with no entries, for the no-document state.
    pub fn empty(dims: usize, scheme: &str) -> Self {
        Self {
            passages: Vec::new(),
            vectors: Vec::new(),
            dims,
            scheme: scheme.to_string(),
        }
    }

    /// Return up to `k` passages closest to `query`, ascending by
    /// squared Euclidean distance; ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredPassage> {
        if self.passages.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_euclidean(query, v)))
            .collect();

        // Stable sort keeps insertion order for equal distances.
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, distance)| ScoredPassage {
                passage: self.passages[i].clone(),
                distance,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }
}

/// Squared Euclidean distance. Mismatched lengths compare the common
/// prefix plus the excess of the longer vector, which only arises if a
/// caller bypassed the build-time dimension check.
fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    let common: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    let excess: f32 = if a.len() > b.len() {
        a[b.len()..].iter().map(|x| x * x).sum()
    } else {
        b[a.len()..].iter().map(|x| x * x).sum()
    };
    common + excess
}
