//! Document question-answering service shared by the HTTP surface.
//!
//! The service owns the LLM client handle and the request counters; the
//! router is generic over [`DocQaApi`] so tests can substitute a stub without
//! touching the network. Uploaded documents bypass the vector store entirely:
//! the full extracted text is pasted into the prompt, matching the live
//! endpoints' contract.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::extract::{self, ExtractError};
use crate::llm::{LlmClient, LlmError};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};

const ASK_SYSTEM_PROMPT: &str = "You are an expert RAG system. Answer the user's QUESTION strictly based on the \
     provided CONTEXT. Do NOT use external knowledge. If the information is not in the \
     CONTEXT, state clearly that it is not available in the document. Respond concisely.";

const SUMMARIZE_SYSTEM_PROMPT: &str = "You are a professional summarization assistant. Provide a comprehensive, \
     multi-paragraph summary of the following document. Structure the summary logically, \
     using headings or lists if appropriate.";

/// Errors surfaced by the document QA pipeline.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request was structurally invalid (missing part, empty query).
    #[error("{0}")]
    BadRequest(String),
    /// Uploaded file could not be turned into text.
    #[error("Unsupported file format or unable to extract text: {0}")]
    Extract(#[from] ExtractError),
    /// LLM invocation failed.
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
}

/// An uploaded document held in memory.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Client-supplied file name; drives format detection.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Abstraction over the document QA pipeline used by the HTTP surface.
#[async_trait]
pub trait DocQaApi: Send + Sync {
    /// Answer `query` using only the uploaded document as context.
    async fn ask(&self, upload: DocumentUpload, query: &str) -> Result<String, ServiceError>;

    /// Produce a structured summary of the uploaded document.
    async fn summarize(&self, upload: DocumentUpload) -> Result<String, ServiceError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production implementation backed by a hosted LLM.
pub struct DocQaService {
    llm: Arc<dyn LlmClient>,
    metrics: Arc<ServiceMetrics>,
}

impl DocQaService {
    /// Build a service around an initialized LLM client.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    fn extract_upload(&self, upload: &DocumentUpload) -> Result<String, ServiceError> {
        extract::extract_text(&upload.filename, &upload.bytes).map_err(|err| {
            self.metrics.record_extraction_failure();
            tracing::warn!(file = %upload.filename, error = %err, "Text extraction failed");
            ServiceError::Extract(err)
        })
    }
}

#[async_trait]
impl DocQaApi for DocQaService {
    async fn ask(&self, upload: DocumentUpload, query: &str) -> Result<String, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::BadRequest(
                "File and query are required.".to_string(),
            ));
        }

        let context = self.extract_upload(&upload)?;
        let user_prompt =
            format!("CONTEXT:\n---\n{context}\n---\n\nQUESTION: {query}\n\nANSWER:");
        let answer = self.llm.generate(ASK_SYSTEM_PROMPT, &user_prompt).await?;

        self.metrics.record_question();
        tracing::info!(file = %upload.filename, "Question answered");
        Ok(answer)
    }

    async fn summarize(&self, upload: DocumentUpload) -> Result<String, ServiceError> {
        let context = self.extract_upload(&upload)?;
        let user_prompt = format!(
            "DOCUMENT CONTENT:\n---\n{context}\n---\n\n\
             Provide a detailed, structured summary of this document."
        );
        let summary = self
            .llm
            .generate(SUMMARIZE_SYSTEM_PROMPT, &user_prompt)
            .await?;

        self.metrics.record_summary();
        tracing::info!(file = %upload.filename, "Document summarized");
        Ok(summary)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
