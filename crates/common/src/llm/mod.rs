//! Chat-completion client
//!
//! Provides:
//! - A `ChatModel` seam for one system + user prompt completion
//! - OpenAI and Azure OpenAI implementations
//! - A canned offline model for development and tests

use crate::config::{ApiProvider, LlmConfig};
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Sampling options for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Maximum output tokens
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 400,
        }
    }
}

/// Trait for text completion
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete `user` under the `system` instruction
    async fn complete(&self, system: &str, user: &str, options: &CompletionOptions)
        -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completion client (OpenAI or Azure OpenAI)
pub struct OpenAIChatModel {
    client: reqwest::Client,
    provider: ApiProvider,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAIChatModel {
    /// Create a new client from configuration
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let url = match config.provider {
            ApiProvider::Azure => {
                let endpoint = config.api_base.as_deref().ok_or_else(|| {
                    AppError::Configuration {
                        message: "llm.api_base is required for the azure provider".into(),
                    }
                })?;
                format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    endpoint.trim_end_matches('/'),
                    config.model,
                    config.api_version
                )
            }
            _ => format!(
                "{}/chat/completions",
                config
                    .api_base
                    .as_deref()
                    .unwrap_or("https://api.openai.com/v1")
                    .trim_end_matches('/')
            ),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            provider: config.provider,
            api_key,
            model: config.model.clone(),
            url,
        })
    }

    async fn request(&self, system: &str, user: &str, options: &CompletionOptions) -> Result<String> {
        let request = ChatRequest {
            // Azure selects the model through the deployment in the URL
            model: match self.provider {
                ApiProvider::Azure => None,
                _ => Some(self.model.as_str()),
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let builder = self.client.post(&self.url).json(&request);
        let builder = match self.provider {
            ApiProvider::Azure => builder.header("api-key", &self.api_key),
            _ => builder.bearer_auth(&self.api_key),
        };

        let response = builder.send().await.map_err(|e| AppError::CompletionError {
            message: format!("Request failed: {}", e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::CompletionError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| AppError::CompletionError {
                message: format!("Failed to parse response: {}", e),
            })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::CompletionError {
                message: "Empty response from model".to_string(),
            })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let result = self.request(system, user, options).await;
        metrics::record_completion(&self.model, result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(model = %self.model, error = %e, "Completion request failed");
        }
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Offline model that answers without network access.
///
/// Classification-style prompts (tiny token budgets) get a one-word label
/// guessed from keywords; everything else gets an HTML paragraph echoing
/// the question.
pub struct MockChatModel;

impl MockChatModel {
    fn guess_label(user: &str) -> &'static str {
        let lower = user.to_lowercase();
        if ["weather", "rain", "temperature", "forecast"]
            .iter()
            .any(|k| lower.contains(k))
        {
            "weather"
        } else if ["time", "clock", "date"].iter().any(|k| lower.contains(k)) {
            "time"
        } else if ["document", "file", "pdf", "report", "upload"]
            .iter()
            .any(|k| lower.contains(k))
        {
            "document"
        } else {
            "general"
        }
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(
        &self,
        _system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        if options.max_tokens <= 5 {
            return Ok(Self::guess_label(user).to_string());
        }

        let question = user
            .lines()
            .rev()
            .find_map(|line| line.trim().strip_prefix("Question:"))
            .unwrap_or(user)
            .trim();

        Ok(format!(
            "<p>Mock answer about <b>{}</b>. Configure an LLM API key for real responses.</p>",
            crate::retrieval::escape_html(question)
        ))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

/// Create a chat model based on configuration
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match (config.provider, config.api_key.clone()) {
        (ApiProvider::Mock, _) => Ok(Arc::new(MockChatModel)),
        (provider, Some(key)) if !key.is_empty() => {
            tracing::info!(provider = ?provider, model = %config.model, "Using remote chat model");
            Ok(Arc::new(OpenAIChatModel::new(config, key)?))
        }
        (provider, _) => {
            tracing::warn!(provider = ?provider, "LLM API key not configured, using mock chat model");
            Ok(Arc::new(MockChatModel))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_classifies_with_small_budget() {
        let model = MockChatModel;
        let options = CompletionOptions {
            temperature: 0.0,
            max_tokens: 2,
        };
        let label = model
            .complete("classify", "Is it going to rain in Paris?", &options)
            .await
            .unwrap();
        assert_eq!(label, "weather");
    }

    #[tokio::test]
    async fn test_mock_answers_question_line() {
        let model = MockChatModel;
        let prompt = "<context>\n### a.txt\ncats\n</context>\n\nQuestion: what about <cats>?\n";
        let answer = model
            .complete("system", prompt, &CompletionOptions::default())
            .await
            .unwrap();
        assert!(answer.starts_with("<p>"));
        assert!(answer.contains("what about &lt;cats&gt;?"));
    }

    #[test]
    fn test_azure_url_and_model_omitted() {
        let config = LlmConfig {
            provider: ApiProvider::Azure,
            api_base: Some("https://example.openai.azure.com".into()),
            model: "gpt-4o".into(),
            ..LlmConfig::default()
        };
        let model = OpenAIChatModel::new(&config, "key".into()).unwrap();
        assert_eq!(
            model.url,
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-15-preview"
        );

        let request = ChatRequest {
            model: None,
            messages: vec![],
            max_tokens: 2,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("model").is_none());
    }

    #[test]
    fn test_openai_default_base() {
        let config = LlmConfig {
            provider: ApiProvider::OpenAI,
            ..LlmConfig::default()
        };
        let model = OpenAIChatModel::new(&config, "key".into()).unwrap();
        assert_eq!(model.url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_missing_key_uses_mock() {
        let model = create_chat_model(&LlmConfig::default()).unwrap();
        assert_eq!(model.model_name(), "mock-chat");
    }
}
