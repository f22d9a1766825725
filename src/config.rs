use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ragserve process.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// API key for the hosted LLM. Absence is surfaced as `ProviderUnavailable`
    /// when the client is constructed, never as a startup panic.
    pub gemini_api_key: Option<String>,
    /// Generation model identifier passed to the LLM API.
    pub llm_model: String,
    /// Base URL of the LLM API (overridable so tests can point at a mock).
    pub llm_base_url: String,
    /// Upper bound applied to every generation call, in seconds.
    pub llm_timeout_secs: u64,
    /// Embedding backend used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Optional Ollama base URL override (defaults to the local runtime).
    pub ollama_url: Option<String>,
    /// Directory holding the persisted vector-index artifact pair.
    pub store_dir: PathBuf,
    /// Directory scanned for source documents when building the store.
    pub corpus_dir: PathBuf,
    /// Optional override for the automatic chunk token budget.
    pub chunk_max_tokens: Option<usize>,
    /// Optional sliding token overlap between adjacent chunks.
    pub chunk_overlap: Option<usize>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Default number of hits retrieved per RAG query.
    pub rag_default_top_k: usize,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic byte-hash vectors; no external process required.
    Hash,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gemini_api_key: load_env_optional("GEMINI_API_KEY"),
            llm_model: load_env_or("LLM_MODEL", "gemini-2.5-flash"),
            llm_base_url: load_env_or("LLM_BASE_URL", "https://generativelanguage.googleapis.com"),
            llm_timeout_secs: parse_env_or("LLM_TIMEOUT_SECS", 60)?,
            embedding_provider: load_env_or("EMBEDDING_PROVIDER", "hash")
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            embedding_model: load_env_or("EMBEDDING_MODEL", "all-minilm"),
            embedding_dimension: parse_env_or("EMBEDDING_DIMENSION", 384)?,
            ollama_url: load_env_optional("OLLAMA_URL"),
            store_dir: PathBuf::from(load_env_or("STORE_DIR", "vector_store")),
            corpus_dir: PathBuf::from(load_env_or("CORPUS_DIR", "data")),
            chunk_max_tokens: parse_env_optional("CHUNK_MAX_TOKENS")?,
            chunk_overlap: parse_env_optional("CHUNK_OVERLAP")?,
            server_port: parse_env_optional("SERVER_PORT")?,
            rag_default_top_k: parse_env_or("RAG_DEFAULT_TOP_K", 5)?,
        })
    }
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    Ok(parse_env_optional(key)?.unwrap_or(default))
}

fn parse_env_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        llm_model = %config.llm_model,
        embedding_provider = ?config.embedding_provider,
        store_dir = %config.store_dir.display(),
        corpus_dir = %config.corpus_dir.display(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}
