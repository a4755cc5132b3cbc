//! Configuration management for DocChat services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::retrieval::{DEFAULT_RELEVANCE_THRESHOLD, DOCUMENT_PREFIX_CHARS};
use crate::embeddings::MAX_EMBEDDING_INPUT_CHARS;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upload storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chat-completion service configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Relevance ranking configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Weather lookup configuration
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Time lookup configuration
    #[serde(default)]
    pub clock: ClockConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Directory holding the chat UI
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory where uploaded documents are stored
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Route under which stored documents are served
    #[serde(default = "default_public_route")]
    pub public_route: String,
}

/// Flavour of an OpenAI-compatible API
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    /// api.openai.com or any compatible endpoint
    OpenAI,
    /// Azure OpenAI deployments
    Azure,
    /// Offline deterministic responses
    Mock,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, azure, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: ApiProvider,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (OpenAI base or Azure resource endpoint)
    pub api_base: Option<String>,

    /// API version (Azure only)
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Model (OpenAI) or deployment name (Azure)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (used by the mock provider)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Input longer than this many characters is truncated
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Completion provider: openai, azure, mock
    #[serde(default = "default_llm_provider")]
    pub provider: ApiProvider,

    /// API key
    pub api_key: Option<String>,

    /// API base URL (OpenAI base or Azure resource endpoint)
    pub api_base: Option<String>,

    /// API version (Azure only)
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Model (OpenAI) or deployment name (Azure)
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a document to be used as context
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Characters of each document that are embedded and placed in context
    #[serde(default = "default_document_prefix_chars")]
    pub document_prefix_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: Option<String>,

    /// City used when the user gives none
    #[serde(default = "default_city")]
    pub default_city: String,

    /// OpenWeatherMap base URL
    #[serde(default = "default_weather_base")]
    pub api_base: String,

    /// BigDataCloud base URL (reverse geocoding fallback)
    #[serde(default = "default_geocode_fallback_base")]
    pub geocode_fallback_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClockConfig {
    /// IANA timezone name
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info", "docchat_common=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_request_timeout() -> u64 { 120 }
fn default_static_dir() -> PathBuf { PathBuf::from("static") }
fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_max_upload_bytes() -> usize { 25 * 1024 * 1024 }
fn default_public_route() -> String { "/uploads".to_string() }
fn default_embedding_provider() -> ApiProvider { ApiProvider::Azure }
fn default_llm_provider() -> ApiProvider { ApiProvider::Azure }
fn default_api_version() -> String { "2024-02-15-preview".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-large".to_string() }
fn default_embedding_dimension() -> usize { 3072 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 2 }
fn default_max_input_chars() -> usize { MAX_EMBEDDING_INPUT_CHARS }
fn default_llm_model() -> String { "gpt-4o-mini".to_string() }
fn default_llm_timeout() -> u64 { 60 }
fn default_threshold() -> f32 { DEFAULT_RELEVANCE_THRESHOLD }
fn default_document_prefix_chars() -> usize { DOCUMENT_PREFIX_CHARS }
fn default_city() -> String { "Nairobi".to_string() }
fn default_weather_base() -> String { "https://api.openweathermap.org".to_string() }
fn default_geocode_fallback_base() -> String { "https://api.bigdatacloud.net".to_string() }
fn default_weather_timeout() -> u64 { 10 }
fn default_timezone() -> String { "Africa/Nairobi".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_service_name() -> String { "docchat".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            public_route: default_public_route(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            api_version: default_api_version(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_base: None,
            api_version: default_api_version(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            document_prefix_chars: default_document_prefix_chars(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_city: default_city(),
            api_base: default_weather_base(),
            geocode_fallback_base: default_geocode_fallback_base(),
            timeout_secs: default_weather_timeout(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            weather: WeatherConfig::default(),
            clock: ClockConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__EMBEDDING__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
