//! Active-document slot lifecycle.
//!
//! [`DocumentSession`] owns the storage root and the single active
//! document: ingest runs the full pipeline (extract → chunk → embed →
//! build index → save) and rolls back completely on failure; evict
//! tears persisted state down best-effort but always advances the slot;
//! query degrades to empty results whenever no index is ready.
//!
//! The slot moves `empty → uploading → indexing → ready`, back to
//! `empty` on eviction, and through a full evict-then-reindex on
//! replacement. The index is rebuilt from scratch on every change; the
//! previous instance is discarded whole, so passages from a replaced
//! document can never linger in results.
//!
//! All mutating operations take `&mut self`, so a query can never
//! observe a partially built index: exclusive borrowing serialises
//! mutations against reads.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::chunk::split_text;
use crate::config::Config;
use crate::embedding;
use crate::error::RetrievalError;
use crate::extract::extract_text;
use crate::index::VectorIndex;
use crate::models::{Document, DocumentState, ScoredPassage};
use crate::store;

/// The single-session document retrieval pipeline.
pub struct DocumentSession {
    config: Config,
    state: DocumentState,
    document: Option<Document>,
    index: VectorIndex,
}

impl DocumentSession {
    /// Open a session over the configured storage root.
    ///
    /// If a previously saved index exists it is loaded and validated;
    /// a corrupt or scheme-mismatched index triggers a full rebuild
    /// from the persisted document. With no persisted state the slot
    /// starts empty. Never fails on bad persisted state, only on an
    /// unusable configuration.
    pub async fn open(config: Config) -> Result<Self, RetrievalError> {
        let scheme = config.embedding.scheme_tag();
        let dims = config.embedding.dims;

        let mut session = Self {
            index: VectorIndex::empty(dims, &scheme),
            state: DocumentState::Empty,
            document: None,
            config,
        };

        let document = match session.read_persisted_document() {
            Ok(doc) => doc,
            Err(e) => {
                warn!("ignoring unreadable persisted document: {}", e);
                None
            }
        };

        let index_dir = session.index_dir();
        if store::exists(&index_dir) {
            match store::load(&index_dir, dims, &scheme) {
                Ok(index) if document.is_some() => {
                    info!(passages = index.len(), "loaded persisted index");
                    session.index = index;
                    session.document = document;
                    session.state = DocumentState::Ready;
                    return Ok(session);
                }
                Ok(_) => {
                    // Index without a document is stale; discard it.
                    warn!("persisted index has no matching document, discarding");
                    session.teardown_storage();
                    return Ok(session);
                }
                Err(e) => {
                    warn!("persisted index unusable ({}), rebuilding", e);
                    session.discard_index_dir();
                }
            }
        }

        // A document without a usable index gets a full rebuild. If
        // that fails (say the embedding backend is down), the document
        // file stays on disk and the slot opens empty; the next open
        // tries again.
        if let Some(doc) = document {
            match session.rebuild_index(&doc).await {
                Ok(index) => {
                    info!(passages = index.len(), "rebuilt index on open");
                    session.index = index;
                    session.document = Some(doc);
                    session.state = DocumentState::Ready;
                }
                Err(e) => {
                    warn!("rebuild from persisted document failed: {}", e);
                    session.discard_index_dir();
                }
            }
        }

        Ok(session)
    }

    /// Ingest a document: persist its raw bytes, then chunk, embed,
    /// index, and save. Replaces (and first fully evicts) any currently
    /// active document. On any failure the slot rolls back to empty
    /// with no document file and no index left on disk.
    pub async fn ingest(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), RetrievalError> {
        // Extraction needs no rollback, so run it before touching disk.
        let body = extract_text(file_name, bytes)
            .map_err(|e| RetrievalError::ingest(file_name, e))?;

        if self.document.is_some() {
            debug!("evicting previous document before ingest");
            if let Err(e) = self.evict() {
                warn!("eviction before ingest was incomplete: {}", e);
            }
        }

        // The documents directory may still hold a file from a previous
        // session whose rebuild failed on open; it is not the active
        // document, but it must not survive next to the new upload.
        let docs_dir = self.documents_dir();
        if docs_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&docs_dir) {
                warn!("could not clear {}: {}", docs_dir.display(), e);
            }
        }

        self.state = DocumentState::Uploading;
        let doc_path = self.documents_dir().join(file_name);
        let persist = std::fs::create_dir_all(self.documents_dir())
            .and_then(|_| std::fs::write(&doc_path, bytes));
        if let Err(e) = persist {
            self.rollback_ingest(file_name);
            return Err(RetrievalError::ingest(file_name, e));
        }

        self.state = DocumentState::Indexing;
        let document = Document {
            id: file_name.to_string(),
            body,
            ingested_at: chrono::Utc::now().timestamp(),
        };

        match self.rebuild_index(&document).await {
            Ok(index) => {
                info!(
                    document = file_name,
                    passages = index.len(),
                    "document indexed"
                );
                self.index = index;
                self.document = Some(document);
                self.state = DocumentState::Ready;
                Ok(())
            }
            Err(e) => {
                self.rollback_ingest(file_name);
                Err(RetrievalError::ingest(file_name, e))
            }
        }
    }

    /// Remove the active document and its index from disk and return
    /// the slot to empty. Removal is best-effort: each failure is
    /// logged and skipped, and the in-memory state always advances so
    /// the slot cannot deadlock. Safe to call when nothing exists.
    pub fn evict(&mut self) -> Result<(), RetrievalError> {
        let leftovers = self.teardown_storage();

        self.document = None;
        self.index =
            VectorIndex::empty(self.config.embedding.dims, &self.config.embedding.scheme_tag());
        self.state = DocumentState::Empty;

        if leftovers == 0 {
            Ok(())
        } else {
            Err(RetrievalError::Eviction(leftovers))
        }
    }

    /// Retrieve the `k` most relevant passages for `text`.
    ///
    /// Returns an empty list when no document is ready, when the index
    /// has no entries, or when the embedding backend is unavailable —
    /// the caller answers from general knowledge instead of aborting.
    pub async fn query(&self, text: &str, k: usize) -> Vec<ScoredPassage> {
        if self.state != DocumentState::Ready || self.index.is_empty() {
            return Vec::new();
        }

        let query_vec = match embedding::embed_query(&self.config.embedding, text).await {
            Ok(v) => v,
            Err(e) => {
                warn!("query embedding failed, returning no context: {}", e);
                return Vec::new();
            }
        };

        self.index.search(&query_vec, k)
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn documents_dir(&self) -> PathBuf {
        self.config.storage.root.join("documents")
    }

    fn index_dir(&self) -> PathBuf {
        self.config.storage.root.join("index")
    }

    /// Run the full chunk → embed → build → save pipeline for `doc`.
    async fn rebuild_index(&self, doc: &Document) -> Result<VectorIndex, RetrievalError> {
        let chunking = &self.config.chunking;
        let passages = split_text(&doc.id, &doc.body, chunking.chunk_size, chunking.overlap);
        debug!(passages = passages.len(), "chunked document");

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = embedding::embed_texts(&self.config.embedding, &texts).await?;

        let index = VectorIndex::build(
            passages,
            vectors,
            self.config.embedding.dims,
            &self.config.embedding.scheme_tag(),
        )?;

        store::save(&index, &self.index_dir())
            .map_err(|e| RetrievalError::ingest(&doc.id, format!("saving index: {}", e)))?;

        Ok(index)
    }

    /// Undo a failed ingest: no document file, no index, slot empty.
    fn rollback_ingest(&mut self, file_name: &str) {
        warn!(document = file_name, "rolling back failed ingest");
        self.teardown_storage();
        self.document = None;
        self.index =
            VectorIndex::empty(self.config.embedding.dims, &self.config.embedding.scheme_tag());
        self.state = DocumentState::Empty;
    }

    /// Best-effort removal of just the index directory, used when a
    /// persisted index is unusable but the document should survive.
    fn discard_index_dir(&self) {
        for dir in [self.index_dir(), self.index_dir().with_extension("tmp")] {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    warn!("could not remove {}: {}", dir.display(), e);
                }
            }
        }
    }

    /// Best-effort removal of everything under the storage root.
    /// Returns the number of paths that could not be removed; each
    /// failure is logged and skipped so teardown always completes.
    fn teardown_storage(&self) -> usize {
        let mut leftovers = 0;

        for dir in [self.documents_dir(), self.index_dir()] {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    warn!("could not remove {}: {}", dir.display(), e);
                    leftovers += 1;
                }
            }
        }

        // The tmp directory from an interrupted save, if any.
        let stale_tmp = self.index_dir().with_extension("tmp");
        if stale_tmp.exists() {
            if let Err(e) = std::fs::remove_dir_all(&stale_tmp) {
                warn!("could not remove {}: {}", stale_tmp.display(), e);
                leftovers += 1;
            }
        }

        let root = &self.config.storage.root;
        if root.exists() {
            if let Err(e) = std::fs::remove_dir(root) {
                warn!("could not remove {}: {}", root.display(), e);
                leftovers += 1;
            }
        }

        leftovers
    }

    /// Read the raw document file persisted by a previous session, if
    /// one exists, and re-extract its text.
    fn read_persisted_document(&self) -> Result<Option<Document>, RetrievalError> {
        let dir = self.documents_dir();
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| RetrievalError::ingest("documents", e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        let Some(path) = entries.into_iter().next() else {
            return Ok(None);
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes =
            std::fs::read(&path).map_err(|e| RetrievalError::ingest(&file_name, e))?;
        let body =
            extract_text(&file_name, &bytes).map_err(|e| RetrievalError::ingest(&file_name, e))?;

        let ingested_at = std::fs::metadata(&path)
            .ok()
            .and_then(|m| m.modified().ok())
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp())
            .unwrap_or_else(|| chrono::Utc::now().timestamp());

        Ok(Some(Document {
            id: file_name,
            body,
            ingested_at,
        }))
    }
}
