//! Document retrieval pipeline
//!
//! Turns the uploaded files into grounding context for a question:
//! - Text extraction from PDF, DOCX and plain-text files
//! - Query and document embedding
//! - Cosine scoring against a fixed threshold
//! - Context assembly and citation rendering
//!
//! Nothing here is cached or persisted; every query re-reads storage and
//! re-embeds every document.

mod extract;
mod ranker;
mod references;
mod similarity;

pub use extract::{allowed_file, extract_text, secure_filename, DocumentFormat, DocumentStore};
pub use ranker::RelevanceRanker;
pub use references::{escape_html, render_references};
pub use similarity::cosine_similarity;

use serde::{Deserialize, Serialize};

/// Default minimum similarity for a document to count as relevant
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.78;

/// Characters of each document that are embedded and copied into context
pub const DOCUMENT_PREFIX_CHARS: usize = 4000;

/// An uploaded file with its extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Storage filename
    pub name: String,

    /// Extracted plain text
    pub content: String,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Documents that passed the threshold and the context built from them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevanceResult {
    /// Matched document names, in input order
    pub matched: Vec<String>,

    /// Concatenated `### name` sections
    pub context: String,
}

impl RelevanceResult {
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
