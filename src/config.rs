//! TOML configuration for the question-answering pipeline.
//!
//! Every field carries a default, so an empty file (or [`Config::default`])
//! yields a working configuration. Defaults reproduce the constants the
//! pipeline was tuned with: 500/50 chunking, top-3 retrieval, all-MiniLM
//! embeddings, and the DeepSeek chat endpoint.
//!
//! The completion credential is never part of the file: only the *name* of
//! the environment variable holding it is configured (`api_key_env`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in chars, overlap prefix included.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Chars of trailing context carried into the next chunk.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    /// Split points in priority order; separators stay attached to the
    /// piece they terminate.
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
            separators: default_separators(),
        }
    }
}

fn default_max_chars() -> usize {
    500
}
fn default_overlap_chars() -> usize {
    50
}
fn default_separators() -> Vec<String> {
    vec![
        "\n\n".to_string(),
        "\n".to_string(),
        "。".to_string(),
        ".".to_string(),
        " ".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Passages retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// One of `"ollama"`, `"openai"`, `"local"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    /// Endpoint override; each HTTP provider has its own default.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "all-minilm".to_string()
}
fn default_embedding_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            model: default_completion_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_completion_base_url() -> String {
    "https://api.deepseek.com".to_string()
}
fn default_completion_model() -> String {
    "deepseek-chat".to_string()
}
fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}
fn default_completion_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }

    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!(
            "chunking.overlap_chars ({}) must be smaller than chunking.max_chars ({})",
            config.chunking.overlap_chars,
            config.chunking.max_chars
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding
    if config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 for provider '{}'",
            config.embedding.provider
        );
    }
    if config.embedding.model.is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }

    match config.embedding.provider.as_str() {
        "ollama" | "openai" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be ollama, openai, or local.",
            other
        ),
    }

    // Validate completion
    if config.completion.base_url.is_empty() {
        anyhow::bail!("completion.base_url must not be empty");
    }
    if config.completion.model.is_empty() {
        anyhow::bail!("completion.model must not be empty");
    }
    if config.completion.api_key_env.is_empty() {
        anyhow::bail!("completion.api_key_env must not be empty");
    }

    Ok(config)
}
