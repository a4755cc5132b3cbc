//! DocChat Common Library
//!
//! Shared code for the DocChat gateway including:
//! - Document retrieval pipeline (extraction, scoring, ranking, citations)
//! - Embedding and chat-completion client abstractions
//! - Assistant services (intent, weather, geocoding, clock)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod assistant;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod retrieval;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::{Embedder, EmbeddingProvider};
pub use errors::{AppError, Result};
pub use llm::ChatModel;
pub use retrieval::{Document, DocumentStore, RelevanceRanker, RelevanceResult};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
