#![deny(missing_docs)]

//! Core library for the ragserve document question-answering server.

/// HTTP routing and REST handlers.
pub mod api;
/// Chunk-size policy and text splitting.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Uploaded-file text extraction (PDF, CSV, XLSX).
pub mod extract;
/// Hosted LLM client abstraction and the Gemini adapter.
pub mod llm;
/// Document corpus loading.
pub mod loader;
/// Structured logging and tracing setup.
pub mod logging;
/// Request counters.
pub mod metrics;
/// Retrieval-augmented search orchestration.
pub mod rag;
/// Document question-answering service shared by the HTTP surface.
pub mod service;
/// File-persisted vector index and similarity search.
pub mod store;
