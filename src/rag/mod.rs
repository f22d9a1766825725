//! Retrieval-augmented search: load-or-build the store, retrieve context,
//! and condition the LLM on it.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::llm::{LlmClient, LlmError};
use crate::loader::{self, LoaderError};
use crate::store::{BuildMode, StoreError, VectorStore};

/// Delimiter placed between retrieved chunks inside the prompt context.
const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a retrieval-augmented summarization assistant. \
     Ground your answer strictly in the provided context.";

/// Errors raised by the RAG pipeline, split so callers can tell a failed
/// retrieval backend from a failed generation backend.
#[derive(Debug, Error)]
pub enum RagError {
    /// Corpus enumeration failed while building the store.
    #[error("Failed to load document corpus: {0}")]
    Corpus(#[from] LoaderError),
    /// Embedding or index access failed.
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] StoreError),
    /// The LLM invocation failed.
    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),
}

/// Result of a retrieval-augmented query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RagOutcome {
    /// Retrieval produced no context; the LLM was never invoked.
    NoMatches,
    /// Text generated by the LLM, returned verbatim.
    Generated(String),
}

impl RagOutcome {
    /// Render the outcome as user-facing text.
    pub fn into_text(self) -> String {
        match self {
            Self::NoMatches => "No relevant documents found.".to_string(),
            Self::Generated(text) => text,
        }
    }
}

/// Orchestrates the vector store and the LLM for query answering.
pub struct RagSearch {
    store: VectorStore,
    llm: Arc<dyn LlmClient>,
}

impl std::fmt::Debug for RagSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagSearch")
            .field("records", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl RagSearch {
    /// Load the persisted store if present, otherwise build it from the
    /// corpus directory and persist the result. Never both.
    ///
    /// A corrupt artifact pair propagates as
    /// [`RagError::Retrieval`]`(`[`StoreError::Corrupt`]`)`; it is not
    /// treated as "not built yet".
    pub async fn open_or_build(
        mut store: VectorStore,
        llm: Arc<dyn LlmClient>,
        corpus_dir: &Path,
    ) -> Result<Self, RagError> {
        match store.load() {
            Ok(()) => {
                tracing::info!(records = store.len(), "Using persisted vector store");
            }
            Err(StoreError::NotFound) => {
                tracing::info!(corpus = %corpus_dir.display(), "No persisted store; building");
                let documents = loader::load_documents(corpus_dir)?;
                store
                    .build_from_documents(&documents, BuildMode::Replace)
                    .await?;
                store.persist()?;
            }
            Err(err) => return Err(RagError::Retrieval(err)),
        }
        Ok(Self { store, llm })
    }

    /// Wrap an already-prepared store. Used by the CLI and tests.
    pub fn with_store(store: VectorStore, llm: Arc<dyn LlmClient>) -> Self {
        Self { store, llm }
    }

    /// Retrieve the `top_k` closest chunks and summarize them for `query`.
    ///
    /// When retrieval yields no context the sentinel
    /// [`RagOutcome::NoMatches`] is returned and no LLM call is made.
    pub async fn search_and_summarize(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<RagOutcome, RagError> {
        let hits = self.store.query(query, top_k).await?;
        let context = hits
            .iter()
            .map(|hit| hit.metadata.text.as_str())
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER);

        if context.is_empty() {
            tracing::debug!(query, "No retrieval context; skipping generation");
            return Ok(RagOutcome::NoMatches);
        }

        let user_prompt = format!(
            "Summarize the following context for the query: '{query}'\n\n\
             Context:\n{context}\n\nSummary:"
        );
        let answer = self
            .llm
            .generate(SUMMARY_SYSTEM_PROMPT, &user_prompt)
            .await?;
        tracing::info!(query, hits = hits.len(), "RAG query answered");
        Ok(RagOutcome::Generated(answer))
    }

    /// Read access to the underlying store (record counts, status).
    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}
