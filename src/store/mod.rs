//! File-persisted vector index and brute-force similarity search.
//!
//! The store owns an ordered collection of records and persists them as a
//! paired artifact set: `vectors.bin` (bincode: dimension, ids, vectors) and
//! `metadata.json` (one metadata entry per vector, same ordinal order). The
//! pair is written atomically (temp file + rename) and must always be loaded
//! together; a mismatched pair is surfaced as [`StoreError::Corrupt`] rather
//! than silently degrading to an empty store.
//!
//! Similarity search is an exhaustive squared-L2 scan. Corpus sizes this
//! service targets make an ANN structure unnecessary.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::chunking::ChunkPolicy;
use crate::embedding::EmbeddingClient;
use crate::loader::Document;

pub mod types;

pub use types::{
    BuildMode, BuildSummary, QueryResult, Record, RecordMetadata, StoreError, StoreStatus,
};

const VECTORS_FILE: &str = "vectors.bin";
const METADATA_FILE: &str = "metadata.json";

/// On-disk layout of the numeric artifact.
#[derive(Serialize, Deserialize)]
struct VectorArtifact {
    dimension: usize,
    built_at: String,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

/// In-memory vector index with paired-file persistence.
pub struct VectorStore {
    dir: PathBuf,
    embedder: Arc<dyn EmbeddingClient>,
    policy: ChunkPolicy,
    embedding_model: String,
    records: Vec<Record>,
    status: StoreStatus,
}

impl VectorStore {
    /// Create an empty, unloaded store rooted at `dir`.
    pub fn new(
        dir: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingClient>,
        policy: ChunkPolicy,
        embedding_model: String,
    ) -> Self {
        Self {
            dir: dir.into(),
            embedder,
            policy,
            embedding_model,
            records: Vec::new(),
            status: StoreStatus::NotLoaded,
        }
    }

    /// Current lifecycle status of the in-memory index.
    pub fn status(&self) -> StoreStatus {
        self.status
    }

    /// Number of records currently held in memory.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the in-memory index holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Chunk, embed, and index the given documents.
    ///
    /// [`BuildMode::Replace`] discards existing records first; building from
    /// an empty document set still marks the store ready, so queries return
    /// an empty result list instead of `NotLoaded`.
    pub async fn build_from_documents(
        &mut self,
        documents: &[Document],
        mode: BuildMode,
    ) -> Result<BuildSummary, StoreError> {
        if mode == BuildMode::Replace {
            self.records.clear();
        }

        let mut seen: HashSet<String> = self
            .records
            .iter()
            .map(|record| compute_chunk_hash(&record.metadata.text))
            .collect();

        let mut pending: Vec<RecordMetadata> = Vec::new();
        let mut skipped_duplicates = 0;
        for document in documents {
            let chunks = self.policy.split(&document.text, &self.embedding_model)?;
            for chunk in chunks {
                if chunk.trim().is_empty() {
                    continue;
                }
                if seen.insert(compute_chunk_hash(&chunk)) {
                    pending.push(RecordMetadata {
                        text: chunk,
                        source: document.source_path.display().to_string(),
                    });
                } else {
                    skipped_duplicates += 1;
                }
            }
        }

        let chunk_count = pending.len();
        if chunk_count > 0 {
            let texts: Vec<String> = pending.iter().map(|meta| meta.text.clone()).collect();
            let vectors = self.embedder.embed(texts).await?;
            debug_assert_eq!(vectors.len(), pending.len());
            let expected = self.embedder.dimension();
            for (metadata, vector) in pending.into_iter().zip(vectors) {
                if vector.len() != expected {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                self.records.push(Record {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    metadata,
                });
            }
        }

        self.status = StoreStatus::Ready;
        let summary = BuildSummary {
            documents: documents.len(),
            chunks: chunk_count,
            skipped_duplicates,
        };
        tracing::info!(
            documents = summary.documents,
            chunks = summary.chunks,
            skipped_duplicates,
            total_records = self.records.len(),
            "Store built"
        );
        Ok(summary)
    }

    /// Write the paired artifacts to disk atomically.
    ///
    /// Both files are staged as temporaries and renamed into place, so a
    /// concurrent `load` never observes a half-written pair.
    pub fn persist(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let artifact = VectorArtifact {
            dimension: self.embedder.dimension(),
            built_at: current_timestamp_rfc3339(),
            ids: self.records.iter().map(|record| record.id.clone()).collect(),
            vectors: self
                .records
                .iter()
                .map(|record| record.vector.clone())
                .collect(),
        };
        let vector_bytes =
            bincode::serialize(&artifact).map_err(|err| StoreError::Encode(err.to_string()))?;

        let metadata: Vec<&RecordMetadata> =
            self.records.iter().map(|record| &record.metadata).collect();
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)
            .map_err(|err| StoreError::Encode(err.to_string()))?;

        stage_and_rename(&self.dir.join(VECTORS_FILE), &vector_bytes)?;
        stage_and_rename(&self.dir.join(METADATA_FILE), &metadata_bytes)?;

        tracing::info!(
            dir = %self.dir.display(),
            records = self.records.len(),
            "Store persisted"
        );
        Ok(())
    }

    /// Load the paired artifacts from disk.
    ///
    /// Fails with [`StoreError::NotFound`] when neither artifact exists and
    /// with [`StoreError::Corrupt`] when the pair is incomplete, undecodable,
    /// or disagrees in record count.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let vectors_path = self.dir.join(VECTORS_FILE);
        let metadata_path = self.dir.join(METADATA_FILE);

        match (vectors_path.exists(), metadata_path.exists()) {
            (false, false) => return Err(StoreError::NotFound),
            (true, false) => {
                return Err(StoreError::Corrupt(format!(
                    "metadata artifact missing: {}",
                    metadata_path.display()
                )));
            }
            (false, true) => {
                return Err(StoreError::Corrupt(format!(
                    "vector artifact missing: {}",
                    vectors_path.display()
                )));
            }
            (true, true) => {}
        }

        let vector_bytes = std::fs::read(&vectors_path)
            .map_err(|err| StoreError::Corrupt(format!("vector artifact unreadable: {err}")))?;
        let artifact: VectorArtifact = bincode::deserialize(&vector_bytes)
            .map_err(|err| StoreError::Corrupt(format!("vector artifact undecodable: {err}")))?;

        let metadata_bytes = std::fs::read(&metadata_path)
            .map_err(|err| StoreError::Corrupt(format!("metadata artifact unreadable: {err}")))?;
        let metadata: Vec<RecordMetadata> = serde_json::from_slice(&metadata_bytes)
            .map_err(|err| StoreError::Corrupt(format!("metadata artifact undecodable: {err}")))?;

        if artifact.vectors.len() != metadata.len() || artifact.ids.len() != metadata.len() {
            return Err(StoreError::Corrupt(format!(
                "record count mismatch: {} vectors, {} ids, {} metadata entries",
                artifact.vectors.len(),
                artifact.ids.len(),
                metadata.len()
            )));
        }

        let expected = self.embedder.dimension();
        if artifact.dimension != expected {
            return Err(StoreError::Corrupt(format!(
                "persisted dimension {} does not match configured dimension {expected}",
                artifact.dimension
            )));
        }
        for vector in &artifact.vectors {
            if vector.len() != artifact.dimension {
                return Err(StoreError::Corrupt(format!(
                    "vector of width {} in index of dimension {}",
                    vector.len(),
                    artifact.dimension
                )));
            }
        }

        self.records = artifact
            .ids
            .into_iter()
            .zip(artifact.vectors)
            .zip(metadata)
            .map(|((id, vector), metadata)| Record {
                id,
                vector,
                metadata,
            })
            .collect();
        self.status = StoreStatus::Ready;
        tracing::info!(
            dir = %self.dir.display(),
            records = self.records.len(),
            built_at = %artifact.built_at,
            "Store loaded"
        );
        Ok(())
    }

    /// Embed `text` and return up to `top_k` records in ascending distance order.
    ///
    /// Requesting more results than exist returns all records; querying a
    /// never-built store fails with [`StoreError::NotLoaded`].
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<QueryResult>, StoreError> {
        if top_k == 0 {
            return Err(StoreError::InvalidTopK);
        }
        if self.status == StoreStatus::NotLoaded {
            return Err(StoreError::NotLoaded);
        }
        if self.records.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(vec![text.to_string()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| StoreError::Embedding(
                crate::embedding::EmbeddingClientError::GenerationFailed(
                    "provider returned no vectors for the query".to_string(),
                ),
            ))?;
        let expected = self.embedder.dimension();
        if query_vector.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            });
        }

        let mut hits: Vec<QueryResult> = self
            .records
            .iter()
            .map(|record| QueryResult {
                record_id: record.id.clone(),
                distance: squared_l2(&record.vector, &query_vector),
                metadata: record.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);

        tracing::debug!(top_k, hits = hits.len(), "Store queried");
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn stage_and_rename(target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let staged = target.with_extension("tmp");
    std::fs::write(&staged, bytes)?;
    std::fs::rename(&staged, target)?;
    Ok(())
}

/// Compute a deterministic SHA-256 hash for a chunk of text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
