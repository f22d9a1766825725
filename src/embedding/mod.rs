//! Embedding client abstraction and adapters.
//!
//! Two backends ship with the crate: a local Ollama runtime (the production
//! path) and a deterministic byte-hash encoder used for tests and air-gapped
//! setups. Both honor a fixed output dimensionality so that every record in
//! the vector store shares one width.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, EmbeddingProvider};

pub mod ollama;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider endpoint could not be constructed from configuration.
    #[error("Invalid embedding endpoint: {0}")]
    InvalidEndpoint(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Fixed width of every vector this client produces.
    fn dimension(&self) -> usize;
}

/// Deterministic embedding client that folds bytes into a normalized vector.
///
/// Not semantically meaningful, but stable across processes: identical text
/// always maps to the identical vector, which is exactly what store tests and
/// offline smoke runs need.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Construct a client producing vectors of the given width.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % self.dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Build the embedding client selected by configuration.
pub fn build_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Initializing embedding client"
    );
    match config.embedding_provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbeddingClient::new(
            config.embedding_dimension,
        ))),
        EmbeddingProvider::Ollama => Ok(Arc::new(ollama::OllamaEmbeddingClient::new(
            config.ollama_url.as_deref(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_embeds_identically() {
        let client = HashEmbeddingClient::new(16);
        let first = client.embed(vec!["attention".to_string()]).await.unwrap();
        let second = client.embed(vec!["attention".to_string()]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].len(), 16);
    }

    #[tokio::test]
    async fn vectors_are_normalized() {
        let client = HashEmbeddingClient::new(8);
        let vectors = client
            .embed(vec!["some document text".to_string()])
            .await
            .unwrap();
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let client = HashEmbeddingClient::new(8);
        let error = client.embed(Vec::new()).await.unwrap_err();
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn zero_dimension_is_rejected() {
        let client = HashEmbeddingClient::new(0);
        let error = client.embed(vec!["text".to_string()]).await.unwrap_err();
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }
}
