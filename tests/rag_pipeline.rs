//! End-to-end pipeline tests: corpus on disk → vector store → retrieval →
//! mocked Gemini generation. Embeddings use the deterministic hash backend so
//! rankings are reproducible without a local model runtime.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use httpmock::{Method::POST, MockServer};
use serde_json::json;

use ragserve::chunking::ChunkPolicy;
use ragserve::embedding::HashEmbeddingClient;
use ragserve::llm::GeminiClient;
use ragserve::rag::{RagError, RagOutcome, RagSearch};
use ragserve::store::{StoreError, VectorStore};

const DIMENSION: usize = 48;

fn store_in(dir: &Path) -> VectorStore {
    VectorStore::new(
        dir,
        Arc::new(HashEmbeddingClient::new(DIMENSION)),
        ChunkPolicy {
            max_tokens: 128,
            overlap: 0,
        },
        "all-minilm".to_string(),
    )
}

fn gemini_for(server: &MockServer) -> Arc<GeminiClient> {
    Arc::new(
        GeminiClient::new(
            &server.base_url(),
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
            Duration::from_secs(5),
        )
        .expect("client"),
    )
}

fn write_corpus(dir: &Path) {
    std::fs::write(dir.join("01_orchard.txt"), "orchard pruning happens in late winter")
        .expect("doc 1");
    std::fs::write(dir.join("02_bread.txt"), "sourdough levain doubles overnight")
        .expect("doc 2");
    std::fs::write(dir.join("03_bees.txt"), "beehives need ventilation in summer")
        .expect("doc 3");
}

#[tokio::test]
async fn builds_from_corpus_and_answers_through_the_llm() {
    let corpus = tempfile::tempdir().expect("corpus dir");
    let store_dir = tempfile::tempdir().expect("store dir");
    write_corpus(corpus.path());

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .body_contains("sourdough levain");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "The levain doubles overnight." }] }
                }]
            }));
        })
        .await;

    let rag = RagSearch::open_or_build(
        store_in(store_dir.path()),
        gemini_for(&server),
        corpus.path(),
    )
    .await
    .expect("open_or_build");
    assert_eq!(rag.store().len(), 3);

    // The query text repeats document 2's unique wording, so its chunk ranks
    // first and lands in the prompt the mock inspects.
    let outcome = rag
        .search_and_summarize("sourdough levain doubles overnight", 1)
        .await
        .expect("rag answer");
    mock.assert_async().await;
    assert_eq!(
        outcome,
        RagOutcome::Generated("The levain doubles overnight.".to_string())
    );
}

#[tokio::test]
async fn second_open_loads_the_persisted_pair() {
    let corpus = tempfile::tempdir().expect("corpus dir");
    let store_dir = tempfile::tempdir().expect("store dir");
    write_corpus(corpus.path());

    let server = MockServer::start_async().await;
    let first = RagSearch::open_or_build(
        store_in(store_dir.path()),
        gemini_for(&server),
        corpus.path(),
    )
    .await
    .expect("initial build");
    assert_eq!(first.store().len(), 3);

    // Corpus gone; a reopen must come from the artifacts, not a rebuild.
    drop(corpus);
    let reopened = RagSearch::open_or_build(
        store_in(store_dir.path()),
        gemini_for(&server),
        Path::new("/nonexistent"),
    )
    .await
    .expect("reopen from disk");
    assert_eq!(reopened.store().len(), 3);
}

#[tokio::test]
async fn empty_corpus_yields_sentinel_and_no_llm_traffic() {
    let corpus = tempfile::tempdir().expect("corpus dir");
    let store_dir = tempfile::tempdir().expect("store dir");

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({ "candidates": [] }));
        })
        .await;

    let rag = RagSearch::open_or_build(
        store_in(store_dir.path()),
        gemini_for(&server),
        corpus.path(),
    )
    .await
    .expect("open_or_build");

    let outcome = rag
        .search_and_summarize("anything at all", 5)
        .await
        .expect("rag answer");
    assert_eq!(outcome, RagOutcome::NoMatches);
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn half_written_pair_is_corrupt_not_rebuilt() {
    let store_dir = tempfile::tempdir().expect("store dir");
    std::fs::write(store_dir.path().join("vectors.bin"), b"leftover bytes")
        .expect("stray vector artifact");

    let server = MockServer::start_async().await;
    let error = RagSearch::open_or_build(
        store_in(store_dir.path()),
        gemini_for(&server),
        Path::new("/nonexistent"),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        error,
        RagError::Retrieval(StoreError::Corrupt(_))
    ));
}

#[tokio::test]
async fn over_requesting_returns_each_record_once_in_distance_order() {
    let corpus = tempfile::tempdir().expect("corpus dir");
    let store_dir = tempfile::tempdir().expect("store dir");
    write_corpus(corpus.path());

    let server = MockServer::start_async().await;
    let rag = RagSearch::open_or_build(
        store_in(store_dir.path()),
        gemini_for(&server),
        corpus.path(),
    )
    .await
    .expect("open_or_build");

    let hits = rag
        .store()
        .query("beehives need ventilation in summer", 50)
        .await
        .expect("query");
    assert_eq!(hits.len(), 3);
    let mut sources: Vec<&str> = hits.iter().map(|hit| hit.metadata.source.as_str()).collect();
    sources.dedup();
    assert_eq!(sources.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    assert!(hits[0].metadata.text.contains("beehives"));
}
