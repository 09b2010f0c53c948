//! End-to-end lifecycle tests for the retrieval pipeline, driven
//! through [`DocumentSession`] with the local hash embedder and a
//! temporary storage root.

use tempfile::TempDir;

use docket::config::{ChunkingConfig, Config, EmbeddingConfig, RetrievalConfig, StorageConfig};
use docket::error::RetrievalError;
use docket::models::DocumentState;
use docket::session::DocumentSession;

fn test_config(tmp: &TempDir) -> Config {
    Config {
        storage: StorageConfig {
            root: tmp.path().join("data"),
        },
        chunking: ChunkingConfig {
            chunk_size: 120,
            overlap: 20,
        },
        retrieval: RetrievalConfig { top_k: 5 },
        embedding: EmbeddingConfig {
            provider: "hash".to_string(),
            dims: 64,
            ..Default::default()
        },
        answer: Default::default(),
    }
}

const DOC_A: &str = "Alpha document about contract law.\n\nIt discusses breach of contract, \
    damages, and specific performance remedies in commercial disputes.\n\nA final paragraph \
    about arbitration clauses and their enforceability.";

const DOC_B: &str = "Beta document about criminal procedure.\n\nIt covers arrest, bail \
    applications, and the rights of the accused during investigation.\n\nSentencing guidelines \
    and appeals round out the discussion.";

#[tokio::test]
async fn test_ingest_then_query() {
    let tmp = TempDir::new().unwrap();
    let mut session = DocumentSession::open(test_config(&tmp)).await.unwrap();
    assert_eq!(session.state(), DocumentState::Empty);

    session.ingest("alpha.txt", DOC_A.as_bytes()).await.unwrap();
    assert_eq!(session.state(), DocumentState::Ready);

    let results = session.query("breach of contract damages", 3).await;
    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    for r in &results {
        assert_eq!(r.passage.document_id, "alpha.txt");
    }
    // Ascending distance order.
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
async fn test_query_on_empty_slot_returns_empty() {
    let tmp = TempDir::new().unwrap();
    let session = DocumentSession::open(test_config(&tmp)).await.unwrap();
    assert!(session.query("anything at all", 5).await.is_empty());
}

#[tokio::test]
async fn test_replacement_leaves_no_stale_passages() {
    let tmp = TempDir::new().unwrap();
    let mut session = DocumentSession::open(test_config(&tmp)).await.unwrap();

    session.ingest("alpha.txt", DOC_A.as_bytes()).await.unwrap();
    session.ingest("beta.txt", DOC_B.as_bytes()).await.unwrap();
    assert_eq!(session.state(), DocumentState::Ready);
    assert_eq!(session.active_document().unwrap().id, "beta.txt");

    // Even a query aimed squarely at the old document must only ever
    // surface passages from the new one.
    let results = session.query("breach of contract damages arbitration", 10).await;
    assert!(!results.is_empty());
    for r in &results {
        assert_eq!(r.passage.document_id, "beta.txt");
    }

    // The old raw file is gone from disk too.
    let docs_dir = session.config().storage.root.join("documents");
    let names: Vec<String> = std::fs::read_dir(&docs_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["beta.txt"]);
}

#[tokio::test]
async fn test_ingest_clears_stale_document_files() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let docs_dir = config.storage.root.join("documents");

    // A file left behind by an earlier session that never became the
    // active document (its extension is unreadable, so opening leaves
    // the slot empty without touching it).
    std::fs::create_dir_all(&docs_dir).unwrap();
    std::fs::write(docs_dir.join("aaa.bin"), [0x00]).unwrap();

    let mut session = DocumentSession::open(config).await.unwrap();
    assert_eq!(session.state(), DocumentState::Empty);

    session.ingest("beta.txt", DOC_B.as_bytes()).await.unwrap();
    let names: Vec<String> = std::fs::read_dir(&docs_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["beta.txt"]);

    // A later open must pair the index with the ingested document, not
    // whatever sorted first among leftovers.
    let session = DocumentSession::open(test_config(&tmp)).await.unwrap();
    assert_eq!(session.state(), DocumentState::Ready);
    assert_eq!(session.active_document().unwrap().id, "beta.txt");
}

#[tokio::test]
async fn test_evict_returns_slot_to_empty() {
    let tmp = TempDir::new().unwrap();
    let mut session = DocumentSession::open(test_config(&tmp)).await.unwrap();

    session.ingest("alpha.txt", DOC_A.as_bytes()).await.unwrap();
    let root = session.config().storage.root.clone();
    assert!(root.exists());

    session.evict().unwrap();
    assert_eq!(session.state(), DocumentState::Empty);
    assert!(session.active_document().is_none());
    assert!(session.query("contract", 5).await.is_empty());
    assert!(!root.exists(), "storage root should be removed entirely");

    // Eviction is idempotent.
    session.evict().unwrap();
    assert_eq!(session.state(), DocumentState::Empty);
}

#[tokio::test]
async fn test_failed_ingest_rolls_back_to_empty() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.embedding.provider = "disabled".to_string();
    let root = config.storage.root.clone();

    let mut session = DocumentSession::open(config).await.unwrap();
    let err = session.ingest("alpha.txt", DOC_A.as_bytes()).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Ingest { .. }));

    assert_eq!(session.state(), DocumentState::Empty);
    assert!(session.active_document().is_none());
    assert!(!root.exists(), "no orphaned files after rollback");
}

#[tokio::test]
async fn test_unsupported_file_type_is_ingest_failure() {
    let tmp = TempDir::new().unwrap();
    let mut session = DocumentSession::open(test_config(&tmp)).await.unwrap();

    let err = session.ingest("image.png", &[0x89, 0x50]).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Ingest { .. }));
    assert_eq!(session.state(), DocumentState::Empty);
}

#[tokio::test]
async fn test_rejected_replacement_keeps_old_document() {
    let tmp = TempDir::new().unwrap();
    let mut session = DocumentSession::open(test_config(&tmp)).await.unwrap();
    session.ingest("alpha.txt", DOC_A.as_bytes()).await.unwrap();

    // Extraction fails before the old document is touched, so the slot
    // stays ready with the previous document intact.
    let err = session.ingest("beta.bin", &[0x00]).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Ingest { .. }));
    assert_eq!(session.state(), DocumentState::Ready);
    assert_eq!(session.active_document().unwrap().id, "alpha.txt");
}

#[tokio::test]
async fn test_session_reopens_from_persisted_state() {
    let tmp = TempDir::new().unwrap();

    {
        let mut session = DocumentSession::open(test_config(&tmp)).await.unwrap();
        session.ingest("alpha.txt", DOC_A.as_bytes()).await.unwrap();
    }

    let session = DocumentSession::open(test_config(&tmp)).await.unwrap();
    assert_eq!(session.state(), DocumentState::Ready);
    assert_eq!(session.active_document().unwrap().id, "alpha.txt");

    let results = session.query("arbitration clauses", 3).await;
    assert!(!results.is_empty());
    for r in &results {
        assert_eq!(r.passage.document_id, "alpha.txt");
    }
}

#[tokio::test]
async fn test_reopen_with_changed_dims_rebuilds() {
    let tmp = TempDir::new().unwrap();

    {
        let mut session = DocumentSession::open(test_config(&tmp)).await.unwrap();
        session.ingest("alpha.txt", DOC_A.as_bytes()).await.unwrap();
    }

    // Changing the embedding dimension invalidates the persisted index;
    // opening must rebuild rather than misload or crash.
    let mut config = test_config(&tmp);
    config.embedding.dims = 128;
    let session = DocumentSession::open(config).await.unwrap();
    assert_eq!(session.state(), DocumentState::Ready);

    let results = session.query("specific performance remedies", 3).await;
    assert!(!results.is_empty());
}

#[tokio::test]
async fn test_reopen_with_corrupt_index_rebuilds() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let meta_path = config.storage.root.join("index").join("meta.json");

    {
        let mut session = DocumentSession::open(test_config(&tmp)).await.unwrap();
        session.ingest("alpha.txt", DOC_A.as_bytes()).await.unwrap();
    }

    std::fs::write(&meta_path, b"{ corrupted").unwrap();

    let session = DocumentSession::open(config).await.unwrap();
    assert_eq!(session.state(), DocumentState::Ready);
    assert!(!session.query("contract law", 3).await.is_empty());
}
