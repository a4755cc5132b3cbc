//! Embedding service abstraction
//!
//! Provides a unified interface for embedding providers:
//! - OpenAI (text-embedding-3-small, text-embedding-3-large, ada-002)
//! - Azure OpenAI deployments
//! - A deterministic offline embedder for development and tests
//!
//! [`EmbeddingProvider`] sits on top of an [`Embedder`] and turns every
//! failure into `None` so retrieval never aborts on a provider problem.

mod provider;

pub use provider::EmbeddingProvider;

use crate::config::{ApiProvider, EmbeddingConfig};
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Embedding vector
pub type Embedding = Vec<f32>;

/// Longest input, in characters, submitted to the embedding service
pub const MAX_EMBEDDING_INPUT_CHARS: usize = 8000;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// OpenAI-compatible embedding client (OpenAI or Azure OpenAI)
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    provider: ApiProvider,
    api_key: String,
    model: String,
    dimension: usize,
    url: String,
    timeout: Duration,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create a new embedder from configuration
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let dimension = match config.model.as_str() {
            "text-embedding-ada-002" => 1536,
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            _ => config.dimension,
        };

        let url = match config.provider {
            ApiProvider::Azure => {
                let endpoint = config.api_base.as_deref().ok_or_else(|| {
                    AppError::Configuration {
                        message: "embedding.api_base is required for the azure provider".into(),
                    }
                })?;
                format!(
                    "{}/openai/deployments/{}/embeddings?api-version={}",
                    endpoint.trim_end_matches('/'),
                    config.model,
                    config.api_version
                )
            }
            _ => format!(
                "{}/embeddings",
                config
                    .api_base
                    .as_deref()
                    .unwrap_or("https://api.openai.com/v1")
                    .trim_end_matches('/')
            ),
        };

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            provider: config.provider,
            api_key,
            model: config.model.clone(),
            dimension,
            url,
            timeout,
            max_retries: config.max_retries,
        })
    }

    /// Make request with retry
    async fn request_with_retry(&self, text: &str) -> Result<Embedding> {
        let attempts = self.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "Embedding request failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::EmbeddingError {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, text: &str) -> Result<Embedding> {
        let request = EmbeddingRequest {
            input: vec![text],
            model: &self.model,
        };

        let builder = self.client.post(&self.url).json(&request);
        let builder = match self.provider {
            ApiProvider::Azure => builder.header("api-key", &self.api_key),
            _ => builder.bearer_auth(&self.api_key),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::EmbeddingTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                AppError::EmbeddingError {
                    message: format!("Request failed: {}", e),
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: EmbeddingResponse =
            response.json().await.map_err(|e| AppError::EmbeddingError {
                message: format!("Failed to parse response: {}", e),
            })?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::EmbeddingError {
                message: "Empty response".to_string(),
            })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let start = Instant::now();
        let result = self.request_with_retry(text).await;
        metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Offline embedder hashing words into a fixed number of buckets.
///
/// Texts sharing vocabulary get similar vectors, which is enough to make
/// the relevance threshold behave sensibly without network access.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vector = vec![0.0_f32; self.dimension];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match (config.provider, config.api_key.clone()) {
        (ApiProvider::Mock, _) => Ok(Arc::new(MockEmbedder::new(config.dimension))),
        (provider, Some(key)) if !key.is_empty() => {
            tracing::info!(provider = ?provider, model = %config.model, "Using remote embedder");
            Ok(Arc::new(OpenAIEmbedder::new(config, key)?))
        }
        (provider, _) => {
            tracing::warn!(
                provider = ?provider,
                "Embedding API key not configured, using mock embedder"
            );
            Ok(Arc::new(MockEmbedder::new(config.dimension)))
        }
    }
}
