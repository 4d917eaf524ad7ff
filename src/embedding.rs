//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`OllamaEmbeddingProvider`]** — calls a local Ollama instance's `/api/embed` endpoint (default).
//! - **[`OpenAiEmbeddingProvider`]** — calls an OpenAI-compatible `/v1/embeddings` endpoint.
//! - **`LocalEmbeddingProvider`** — runs models in-process via fastembed
//!   (behind the `local-embeddings` feature); no network calls after model download.
//!
//! Use [`create_provider`] to instantiate the provider named in the
//! configuration. All providers return one vector per input text, in input
//! order, with a dimension fixed per provider instance; the HTTP providers
//! verify the response count before returning.
//!
//! # Retry Strategy
//!
//! The HTTP providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;

/// Embedding failure, distinguishable by kind.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider misconfigured: {0}")]
    Config(String),
    #[error("embedding request failed: {0}")]
    Network(String),
    #[error("embedding API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
    #[error("embedding backend error: {0}")]
    Backend(String),
}

/// Capability boundary for turning text into fixed-dimension vectors.
///
/// Implementations must be deterministic for the same input text and keep
/// `dims` constant for the lifetime of the instance.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embed a single text. Convenience wrapper for query embedding.
pub async fn embed_one(
    provider: &dyn EmbeddingProvider,
    text: &str,
) -> Result<Vec<f32>, EmbeddingError> {
    let vectors = provider.embed_batch(&[text.to_string()]).await?;
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
}

/// Create the [`EmbeddingProvider`] named in the configuration.
///
/// | Config value | Provider |
/// |--------------|----------|
/// | `"ollama"` | [`OllamaEmbeddingProvider`] |
/// | `"openai"` | [`OpenAiEmbeddingProvider`] |
/// | `"local"` | `LocalEmbeddingProvider` (requires the `local-embeddings` feature) |
pub fn create_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbeddingProvider::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiEmbeddingProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalEmbeddingProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => Err(EmbeddingError::Config(
            "embedding.provider = \"local\" requires building with --features local-embeddings"
                .to_string(),
        )),
        other => Err(EmbeddingError::Config(format!(
            "unknown embedding provider: '{other}'"
        ))),
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client, EmbeddingError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EmbeddingError::Config(e.to_string()))
}

// ============ Ollama Provider ============

/// Embedding provider backed by a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). Requires Ollama to be running with an
/// embedding model pulled (e.g. `ollama pull all-minilm`).
pub struct OllamaEmbeddingProvider {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            url,
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(batch = texts.len(), model = %self.model, "embedding batch via ollama");

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, delay_secs = delay.as_secs(), "retrying ollama embedding");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/embed", self.url))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: OllamaEmbedResponse = response
                            .json()
                            .await
                            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
                        return check_count(parsed.embeddings, texts.len());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let message = response.text().await.unwrap_or_default();
                        last_err = Some(EmbeddingError::Api {
                            status: status.as_u16(),
                            message,
                        });
                        continue;
                    }

                    let message = response.text().await.unwrap_or_default();
                    return Err(EmbeddingError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    last_err = Some(EmbeddingError::Network(format!(
                        "ollama connection error (is Ollama running at {}?): {}",
                        self.url, e
                    )));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            EmbeddingError::Network("ollama embedding failed after retries".to_string())
        }))
    }
}

// ============ OpenAI-compatible Provider ============

/// Embedding provider for OpenAI-compatible `/v1/embeddings` endpoints.
///
/// Requires the `OPENAI_API_KEY` environment variable. The endpoint base
/// defaults to `https://api.openai.com` and can be overridden with
/// `embedding.url` for compatible services.
pub struct OpenAiEmbeddingProvider {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            EmbeddingError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            url,
            api_key,
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(batch = texts.len(), model = %self.model, "embedding batch via openai");

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, delay_secs = delay.as_secs(), "retrying openai embedding");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/v1/embeddings", self.url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: OpenAiEmbedResponse = response
                            .json()
                            .await
                            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

                        // Responses are ordered by the index field, not
                        // necessarily by position.
                        let mut data = parsed.data;
                        data.sort_by_key(|d| d.index);
                        let vectors: Vec<Vec<f32>> =
                            data.into_iter().map(|d| d.embedding).collect();
                        return check_count(vectors, texts.len());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let message = response.text().await.unwrap_or_default();
                        last_err = Some(EmbeddingError::Api {
                            status: status.as_u16(),
                            message,
                        });
                        continue;
                    }

                    let message = response.text().await.unwrap_or_default();
                    return Err(EmbeddingError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    last_err = Some(EmbeddingError::Network(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            EmbeddingError::Network("openai embedding failed after retries".to_string())
        }))
    }
}

// ============ Local Provider (fastembed) ============

/// In-process embedding via fastembed. Models are downloaded on first use
/// and cached; afterwards embedding runs entirely offline.
#[cfg(feature = "local-embeddings")]
pub struct LocalEmbeddingProvider {
    model: String,
    dims: usize,
    batch_size: usize,
}

#[cfg(feature = "local-embeddings")]
impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        // Fail on unknown model names at construction, not first embed.
        local_model_for(&config.model)?;
        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            batch_size: config.batch_size,
        })
    }
}

#[cfg(feature = "local-embeddings")]
fn local_model_for(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    match name {
        "all-minilm" | "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        other => Err(EmbeddingError::Config(format!(
            "unknown local embedding model: '{}'. Supported: all-minilm, \
             bge-small-en-v1.5, bge-base-en-v1.5, multilingual-e5-small, \
             multilingual-e5-base",
            other
        ))),
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(batch = texts.len(), model = %self.model, "embedding batch locally");

        let model = local_model_for(&self.model)?;
        let batch_size = self.batch_size;
        let texts = texts.to_vec();
        let expected = texts.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut backend = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(model).with_show_download_progress(false),
            )
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;

            backend
                .embed(texts, Some(batch_size))
                .map_err(|e| EmbeddingError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::Backend(e.to_string()))??;

        check_count(vectors, expected)
    }
}

/// Verify the provider honored the one-vector-per-input contract.
fn check_count(
    vectors: Vec<Vec<f32>>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            vectors.len()
        )));
    }
    Ok(vectors)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors, vectors of
/// different lengths, or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn cosine_zero_magnitude() {
        let zero = vec![0.0, 0.0];
        let v = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
    }

    #[test]
    fn check_count_rejects_short_response() {
        let err = check_count(vec![vec![0.0]], 2).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[test]
    fn create_provider_rejects_unknown_name() {
        let config = EmbeddingConfig {
            provider: "quantum".to_string(),
            ..EmbeddingConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, EmbeddingError::Config(_)));
    }

    #[tokio::test]
    async fn embed_one_returns_first_vector() {
        use crate::testing::MockEmbeddingProvider;

        let provider = MockEmbeddingProvider::new(8);
        let vector = embed_one(&provider, "hello").await.unwrap();
        assert_eq!(vector.len(), 8);
    }
}
