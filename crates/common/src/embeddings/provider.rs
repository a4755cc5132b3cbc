//! Null-on-failure embedding access used by the retrieval pipeline

use super::{Embedder, Embedding, MAX_EMBEDDING_INPUT_CHARS};
use crate::retrieval::truncate_chars;
use std::sync::Arc;
use tracing::{debug, warn};

/// Wraps an [`Embedder`] so that empty input and provider failures yield
/// `None` instead of an error.
#[derive(Clone)]
pub struct EmbeddingProvider {
    embedder: Arc<dyn Embedder>,
    max_input_chars: usize,
}

impl EmbeddingProvider {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            max_input_chars: MAX_EMBEDDING_INPUT_CHARS,
        }
    }

    /// Override the input cap (characters)
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Embed `text`, or `None` when the text is blank or the provider fails.
    pub async fn embed(&self, text: &str) -> Option<Embedding> {
        if text.trim().is_empty() {
            debug!("Skipping embedding for blank input");
            return None;
        }

        let input = truncate_chars(text, self.max_input_chars);
        match self.embedder.embed(input).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(
                    model = self.embedder.model_name(),
                    error = %e,
                    "Embedding generation failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every input it receives and answers with its length
    struct RecordingEmbedder {
        inputs: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingEmbedder {
        fn new(fail: bool) -> Self {
            Self {
                inputs: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding> {
            self.inputs.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(AppError::EmbeddingError {
                    message: "rate limited".into(),
                });
            }
            Ok(vec![text.chars().count() as f32])
        }

        fn model_name(&self) -> &str {
            "recording"
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_blank_input_returns_none_without_calling_provider() {
        let embedder = Arc::new(RecordingEmbedder::new(false));
        let provider = EmbeddingProvider::new(embedder.clone());

        assert!(provider.embed("").await.is_none());
        assert!(provider.embed(" \n\t ").await.is_none());
        assert!(embedder.inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_input_is_truncated() {
        let embedder = Arc::new(RecordingEmbedder::new(false));
        let provider = EmbeddingProvider::new(embedder.clone());

        let text = "é".repeat(9000);
        let embedding = provider.embed(&text).await.unwrap();

        assert_eq!(embedding, vec![8000.0]);
        assert_eq!(embedder.inputs.lock().unwrap()[0].chars().count(), 8000);
    }

    #[tokio::test]
    async fn test_custom_cap() {
        let embedder = Arc::new(RecordingEmbedder::new(false));
        let provider = EmbeddingProvider::new(embedder).with_max_input_chars(5);

        assert_eq!(provider.embed("abcdefgh").await, Some(vec![5.0]));
    }

    #[tokio::test]
    async fn test_provider_failure_returns_none() {
        let embedder = Arc::new(RecordingEmbedder::new(true));
        let provider = EmbeddingProvider::new(embedder.clone());

        assert!(provider.embed("tell me about cats").await.is_none());
        assert_eq!(embedder.inputs.lock().unwrap().len(), 1);
    }
}
