//! Ollama-backed embedding client.

use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use super::{EmbeddingClient, EmbeddingClientError};

/// Embedding client talking to a local Ollama runtime.
pub struct OllamaEmbeddingClient {
    ollama: Ollama,
    model: String,
    dimension: usize,
}

impl OllamaEmbeddingClient {
    /// Construct a client for the given endpoint (or the default local one).
    pub fn new(
        url: Option<&str>,
        model: String,
        dimension: usize,
    ) -> Result<Self, EmbeddingClientError> {
        let ollama = match url {
            Some(url) => Ollama::try_new(url)
                .map_err(|err| EmbeddingClientError::InvalidEndpoint(err.to_string()))?,
            None => Ollama::default(),
        };
        Ok(Self {
            ollama,
            model,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let batch = texts.len();
        let request = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Multiple(texts),
        );
        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|err| EmbeddingClientError::GenerationFailed(err.to_string()))?;

        if response.embeddings.len() != batch {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "expected {batch} embeddings, provider returned {}",
                response.embeddings.len()
            )));
        }
        for vector in &response.embeddings {
            if vector.len() != self.dimension {
                return Err(EmbeddingClientError::GenerationFailed(format!(
                    "expected dimension {}, provider returned {}",
                    self.dimension,
                    vector.len()
                )));
            }
        }

        tracing::debug!(model = %self.model, batch, "Embeddings generated");
        Ok(response.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
