//! Hosted LLM client abstraction and the Gemini adapter.
//!
//! The service only needs one narrow contract from the model provider:
//! `generate(system_prompt, user_prompt) -> text`. [`GeminiClient`] fulfils it
//! over the `generateContent` REST API. The base URL is injectable so tests
//! can stand up a mock server, and every call is wrapped in a bounded timeout
//! since the upstream design defines none.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

/// Errors returned while interacting with the LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider credential is missing; raised at construction, before any
    /// network call is attempted.
    #[error("LLM provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected LLM response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Generation did not complete within the configured deadline.
    #[error("LLM call timed out after {0} seconds")]
    Timeout(u64),
    /// Provider answered 200 but returned no generated text.
    #[error("LLM response contained no generated text")]
    EmptyResponse,
}

/// Interface implemented by generation backends.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text conditioned on a system instruction and a user prompt.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// HTTP client for the Gemini `generateContent` API.
#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Construct a client from runtime configuration.
    ///
    /// Fails with [`LlmError::ProviderUnavailable`] when no API key is
    /// configured; no network traffic happens here.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let api_key = config.gemini_api_key.clone().ok_or_else(|| {
            LlmError::ProviderUnavailable("GEMINI_API_KEY is not set".to_string())
        })?;
        Self::new(
            &config.llm_base_url,
            api_key,
            config.llm_model.clone(),
            Duration::from_secs(config.llm_timeout_secs),
        )
    }

    /// Construct a client against an explicit endpoint.
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::ProviderUnavailable(
                "API key is empty".to_string(),
            ));
        }
        let client = Client::builder().user_agent("ragserve/0.1").build()?;
        tracing::debug!(model = %model, timeout_secs = timeout.as_secs(), "Initialized LLM client");
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout,
        })
    }

    async fn generate_inner(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "system_instruction": { "parts": [{ "text": system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": user_prompt }] }],
        });

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "LLM request failed");
            return Err(error);
        }

        let payload: GenerateResponse = response.json().await?;
        let text = collect_candidate_text(payload);
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

fn collect_candidate_text(payload: GenerateResponse) -> String {
    payload
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let deadline = self.timeout;
        match tokio::time::timeout(deadline, self.generate_inner(system_prompt, user_prompt)).await
        {
            Ok(result) => result,
            Err(_) => {
                let error = LlmError::Timeout(deadline.as_secs());
                tracing::error!(error = %error, "LLM call exceeded deadline");
                Err(error)
            }
        }
    }
}
