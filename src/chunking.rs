//! Chunk-size policy and text splitting.
//!
//! Oversized documents are split before embedding because every embedding
//! model has a bounded input window. The policy is explicit and testable:
//! a hard token budget per chunk plus an optional sliding overlap so spans
//! around chunk boundaries stay visible to retrieval.
//!
//! Token counting prefers `tiktoken-rs` when the model maps to a known
//! encoding and falls back to whitespace counting otherwise (typical for
//! locally aliased Ollama models). Semantic splitting is delegated to
//! `semchunk-rs`.

use anyhow::Error as TokenizerError;
use semchunk_rs::Chunker;
use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, r50k_base};

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

const MIN_AUTOMATIC_BUDGET: usize = 256;
const MAX_AUTOMATIC_BUDGET: usize = 1024;

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Policy configured an impossible token budget.
    #[error("chunk token budget must be greater than zero")]
    InvalidBudget,
    /// Tokenizer resources were unavailable for the configured model.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Tokenizer {
        /// Embedding model we attempted to load.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}

/// Windowing policy applied to documents before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    /// Hard upper bound on tokens per chunk.
    pub max_tokens: usize,
    /// Sliding token overlap carried from the previous chunk.
    pub overlap: usize,
}

impl ChunkPolicy {
    /// Derive a policy for an embedding model, honoring explicit overrides.
    ///
    /// Without an override the budget is a quarter of the model's context
    /// window, clamped into `[256, 1024]`.
    pub fn for_model(
        model: &str,
        max_tokens_override: Option<usize>,
        overlap: Option<usize>,
    ) -> Self {
        let max_tokens = match max_tokens_override {
            Some(explicit) => explicit.max(1),
            None => (embedding_context_window(model) / 4)
                .clamp(MIN_AUTOMATIC_BUDGET, MAX_AUTOMATIC_BUDGET),
        };
        Self {
            max_tokens,
            overlap: overlap.unwrap_or(0),
        }
    }

    /// Split `text` into chunks that respect the token budget.
    ///
    /// Returns an empty vector for whitespace-only input.
    pub fn split(&self, text: &str, model: &str) -> Result<Vec<String>, ChunkError> {
        if self.max_tokens == 0 {
            return Err(ChunkError::InvalidBudget);
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let counter = token_counter_for(model);
        let counter_for_chunker = counter.clone();
        let chunker = Chunker::new(
            self.max_tokens,
            Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
        );
        let chunks = chunker.chunk(text);
        Ok(self.apply_overlap(chunks, &counter))
    }

    /// Prefix each chunk after the first with the token-limited tail of its
    /// predecessor, trimming from the front so the budget still holds.
    fn apply_overlap(&self, chunks: Vec<String>, counter: &TokenCounter) -> Vec<String> {
        let overlap = self.overlap.min(self.max_tokens.saturating_sub(1));
        if overlap == 0 || chunks.len() < 2 {
            return chunks;
        }

        let mut out = Vec::with_capacity(chunks.len());
        let mut iter = chunks.into_iter();
        let mut previous = iter.next().expect("len checked above");
        out.push(previous.clone());

        for current in iter {
            let tail = word_tail(&previous, overlap, counter);
            let combined = if tail.is_empty() {
                current.clone()
            } else {
                trim_to_budget(&format!("{tail} {current}"), self.max_tokens, counter)
            };
            out.push(combined);
            previous = current;
        }
        out
    }
}

/// Longest whitespace-delimited suffix of `text` within `limit` tokens.
fn word_tail(text: &str, limit: usize, counter: &TokenCounter) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    for start in 0..words.len() {
        let candidate = words[start..].join(" ");
        if counter.as_ref()(&candidate) <= limit {
            return candidate;
        }
    }
    String::new()
}

/// Drop leading words until `text` fits the token budget.
fn trim_to_budget(text: &str, budget: usize, counter: &TokenCounter) -> String {
    if counter.as_ref()(text) <= budget {
        return text.to_string();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    for start in 1..words.len() {
        let candidate = words[start..].join(" ");
        if counter.as_ref()(&candidate) <= budget {
            return candidate;
        }
    }
    String::new()
}

/// Approximate input window, in tokens, for known embedding models.
pub fn embedding_context_window(model: &str) -> usize {
    let normalized = model.to_lowercase();
    match normalized.as_str() {
        "nomic-embed-text" | "mxbai-embed-large" | "mxbai-embed-large-v1" => 8192,
        value if value.starts_with("text-embedding-3") => 8192,
        value if value.contains("all-minilm") => 512,
        value if value.contains("e5-large") => 4096,
        _ => {
            tracing::trace!(model, "Using default context window estimate");
            4096
        }
    }
}

/// Resolve a token counter for the model, falling back to whitespace counting.
fn token_counter_for(model: &str) -> TokenCounter {
    match tiktoken_counter(model) {
        Ok(counter) => counter,
        Err(error) => {
            tracing::debug!(
                model,
                error = %error,
                "Tokenizer unavailable; falling back to whitespace counter"
            );
            whitespace_counter()
        }
    }
}

fn tiktoken_counter(model: &str) -> Result<TokenCounter, TokenizerError> {
    let encoding = match get_bpe_from_model(model) {
        Ok(encoding) => encoding,
        Err(_) => encoding_from_name(model)?,
    };
    let encoding = Arc::new(encoding);
    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

fn encoding_from_name(name: &str) -> Result<CoreBPE, TokenizerError> {
    match name {
        "cl100k_base" => cl100k_base(),
        "o200k_base" => o200k_base(),
        "p50k_base" => p50k_base(),
        "r50k_base" | "gpt2" => r50k_base(),
        other => Err(TokenizerError::msg(format!("unknown encoding: {other}"))),
    }
}

fn whitespace_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}
