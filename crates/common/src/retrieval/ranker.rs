//! Relevance ranking over uploaded documents

use super::{
    cosine_similarity, truncate_chars, Document, RelevanceResult, DEFAULT_RELEVANCE_THRESHOLD,
    DOCUMENT_PREFIX_CHARS,
};
use crate::embeddings::EmbeddingProvider;
use crate::metrics;
use std::time::Instant;
use tracing::{debug, info};

/// Scores documents against a query and assembles the answer context
#[derive(Clone)]
pub struct RelevanceRanker {
    provider: EmbeddingProvider,
    threshold: f32,
    prefix_chars: usize,
}

impl RelevanceRanker {
    pub fn new(provider: EmbeddingProvider) -> Self {
        Self {
            provider,
            threshold: DEFAULT_RELEVANCE_THRESHOLD,
            prefix_chars: DOCUMENT_PREFIX_CHARS,
        }
    }

    /// Minimum score (inclusive) for a document to match
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Characters of each document used for embedding and context
    pub fn with_prefix_chars(mut self, prefix_chars: usize) -> Self {
        self.prefix_chars = prefix_chars;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Rank with the configured threshold
    pub async fn rank(&self, query: &str, documents: &[Document]) -> RelevanceResult {
        self.rank_with_threshold(query, documents, self.threshold).await
    }

    /// Rank documents against `query`.
    ///
    /// Documents are embedded one at a time in input order. A document
    /// matches when its score is `>= threshold`; matches keep input order.
    /// An unavailable query embedding yields an empty result without
    /// touching any document.
    pub async fn rank_with_threshold(
        &self,
        query: &str,
        documents: &[Document],
        threshold: f32,
    ) -> RelevanceResult {
        let start = Instant::now();
        let mut result = RelevanceResult::default();

        let Some(query_embedding) = self.provider.embed(query).await else {
            info!("Query embedding unavailable, skipping document ranking");
            return result;
        };

        for document in documents {
            debug!(document = %document.name, "Scoring document");
            let prefix = truncate_chars(&document.content, self.prefix_chars);
            let document_embedding = self.provider.embed(prefix).await;
            let score = cosine_similarity(Some(query_embedding.as_slice()), document_embedding.as_deref());

            if score >= threshold {
                info!(document = %document.name, score = score, "Document matched");
                result.matched.push(document.name.clone());
                result.context.push_str("\n\n### ");
                result.context.push_str(&document.name);
                result.context.push('\n');
                result.context.push_str(prefix);
            } else {
                info!(document = %document.name, score = score, "Document ignored");
            }
        }

        metrics::record_retrieval(
            start.elapsed().as_secs_f64(),
            documents.len(),
            result.matched.len(),
        );
        result
    }
}
