//! Message intent classification

use crate::llm::{ChatModel, CompletionOptions};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

const CLASSIFIER_PROMPT: &str = "You are an intent classifier. Respond with one of: \
'chat', 'document', 'weather', 'time', 'general'.";

const CLASSIFIER_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.0,
    max_tokens: 2,
};

/// Coarse label deciding which handler answers a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Chat,
    Document,
    Weather,
    Time,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Chat => "chat",
            Intent::Document => "document",
            Intent::Weather => "weather",
            Intent::Time => "time",
            Intent::General => "general",
        }
    }

    /// Parse a model reply, falling back to `General`
    pub fn from_reply(reply: &str) -> Self {
        reply.parse().unwrap_or(Intent::General)
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().trim_matches(|c| c == '\'' || c == '"' || c == '.');
        match label.to_lowercase().as_str() {
            "chat" => Ok(Intent::Chat),
            "document" => Ok(Intent::Document),
            "weather" => Ok(Intent::Weather),
            "time" => Ok(Intent::Time),
            "general" => Ok(Intent::General),
            other => Err(format!("unknown intent: {}", other)),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ask the model for the message intent. Any failure yields `General`.
pub async fn classify_intent(model: &dyn ChatModel, message: &str) -> Intent {
    match model
        .complete(CLASSIFIER_PROMPT, message, &CLASSIFIER_OPTIONS)
        .await
    {
        Ok(reply) => {
            let intent = Intent::from_reply(&reply);
            debug!(reply = %reply.trim(), intent = %intent, "Classified message");
            intent
        }
        Err(e) => {
            warn!(error = %e, "Intent classification failed");
            Intent::General
        }
    }
}
