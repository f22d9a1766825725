//! Shared types and error definitions for the vector store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunking::ChunkError;
use crate::embedding::EmbeddingClientError;

/// Errors returned by vector store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Neither persisted artifact exists; the store has never been built.
    #[error("Vector store not found on disk")]
    NotFound,
    /// The persisted artifact pair is unreadable or internally inconsistent.
    #[error("Vector store corrupt: {0}")]
    Corrupt(String),
    /// The store has not been built or loaded in this process.
    #[error("Vector store not loaded")]
    NotLoaded,
    /// `top_k` must be a positive integer.
    #[error("top_k must be greater than zero")]
    InvalidTopK,
    /// A vector's width does not match the configured dimensionality.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality every stored vector must have.
        expected: usize,
        /// Dimensionality actually produced.
        actual: usize,
    },
    /// Chunking failed while preparing documents.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Filesystem error while persisting or loading artifacts.
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Artifact encoding failed during persist.
    #[error("Failed to encode store artifacts: {0}")]
    Encode(String),
}

/// Metadata stored alongside each vector, keyed by the same ordinal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Chunk text, retained so query hits can be quoted back verbatim.
    pub text: String,
    /// Originating document path for provenance and citation.
    pub source: String,
}

/// One embedded unit of text owned by the store.
#[derive(Debug, Clone)]
pub struct Record {
    /// Identifier assigned at build time.
    pub id: String,
    /// Embedding vector; same width as every other record.
    pub vector: Vec<f32>,
    /// Text and provenance for the chunk.
    pub metadata: RecordMetadata,
}

/// A similarity hit returned by [`crate::store::VectorStore::query`].
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Identifier of the matching record.
    pub record_id: String,
    /// Squared L2 distance to the query vector; smaller is closer.
    pub distance: f32,
    /// Metadata of the matching record.
    pub metadata: RecordMetadata,
}

/// Whether a build replaces the current contents or extends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Discard existing records first. The default, so repeated builds never
    /// accumulate silent duplicates.
    #[default]
    Replace,
    /// Keep existing records and append the new ones.
    Append,
}

/// Typed lifecycle of the in-memory index, replacing filesystem probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreStatus {
    /// No build or load has happened yet; queries are rejected.
    #[default]
    NotLoaded,
    /// Index is in memory (possibly with zero records) and queryable.
    Ready,
}

/// Counters describing a completed build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildSummary {
    /// Documents consumed from the corpus.
    pub documents: usize,
    /// Records appended to the index.
    pub chunks: usize,
    /// Chunks dropped because an identical chunk was already indexed.
    pub skipped_duplicates: usize,
}
