//! Assistant services behind the chat endpoint
//!
//! Everything here renders HTML fragments for the chat UI. Upstream
//! failures are turned into explanatory markup instead of errors so a chat
//! turn always has something to show.

mod answer;
mod clock;
mod geocode;
mod intent;
mod weather;

pub use answer::{answer_from_documents, answer_general, DOCUMENT_ANSWER_OPTIONS, GENERAL_ANSWER_OPTIONS};
pub use clock::Clock;
pub use geocode::{ReverseGeocoder, UNKNOWN_CITY};
pub use intent::{classify_intent, Intent};
pub use weather::{WeatherQuery, WeatherService};

use crate::config::WeatherConfig;
use crate::errors::{AppError, Result};
use std::time::Duration;

/// Build the HTTP client shared by the weather and geocoding lookups
pub fn weather_http_client(config: &WeatherConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}
