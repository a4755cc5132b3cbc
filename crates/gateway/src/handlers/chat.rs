//! Chat handler
//!
//! Routes one message to the location card, weather, clock, document
//! question answering, or a general answer. Every branch replies with an
//! HTML fragment in `{"response": ...}`.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;
use docchat_common::{
    assistant::{answer_from_documents, answer_general, classify_intent, Intent, WeatherQuery},
    errors::{AppError, Result},
    metrics,
    retrieval::{escape_html, render_references},
};

const LOCATION_PHRASES: &[&str] = &["my location", "where am i", "current location", "show location"];

const DOCUMENT_KEYWORDS: &[&str] = &["file", "document", "report", "pdf", "upload", "summarize", "extract"];

const NO_DOCUMENTS: &str = "<p>No documents uploaded yet.</p>";

const NO_RELEVANT_DOCUMENTS: &str =
    "<p>❌ I couldn’t find relevant info in your uploaded documents.</p>";

const FALLBACK: &str = "<p>🤖 Sorry, I couldn’t understand that. Please ask a clear question \
or upload a document for analysis.</p>";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Location the browser saved in cookies
#[derive(Debug, Default, Clone, PartialEq)]
struct UserLocation {
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
}

impl UserLocation {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            lat: cookie(headers, "lat").and_then(|v| v.parse().ok()),
            lon: cookie(headers, "lon").and_then(|v| v.parse().ok()),
            city: cookie(headers, "city").filter(|c| !c.is_empty()),
        }
    }

    fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

fn is_location_request(lower: &str) -> bool {
    LOCATION_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn mentions_documents(lower: &str) -> bool {
    DOCUMENT_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// First capitalised word longer than three characters
fn city_in_message(message: &str) -> Option<String> {
    message
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .find(|word| {
            word.chars().next().is_some_and(char::is_uppercase) && word.chars().count() > 3
        })
        .map(str::to_string)
}

/// Answer one chat message
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let start = Instant::now();
    let message = request.message.trim();
    let location = UserLocation::from_headers(&headers);

    let (route, response) = respond(&state, message, &location).await;

    metrics::record_chat(route);
    tracing::info!(
        route = route,
        latency_ms = start.elapsed().as_millis() as u64,
        "Chat message answered"
    );

    Ok(Json(ChatResponse { response }))
}

async fn respond(state: &AppState, message: &str, location: &UserLocation) -> (&'static str, String) {
    let lower = message.to_lowercase();

    if is_location_request(&lower) {
        return ("location", location_card(state, location).await);
    }

    let intent = classify_intent(state.chat_model.as_ref(), message).await;
    tracing::debug!(intent = %intent, "Routing chat message");

    match intent {
        Intent::Weather => (intent.as_str(), weather(state, message, &lower, location).await),
        Intent::Time => (intent.as_str(), state.clock.now_html()),
        Intent::Document => (intent.as_str(), answer_documents(state, message).await),
        _ if mentions_documents(&lower) => ("document", answer_documents(state, message).await),
        Intent::Chat | Intent::General => {
            let html = match answer_general(state.chat_model.as_ref(), message).await {
                Ok(html) if !html.is_empty() => html,
                Ok(_) => FALLBACK.to_string(),
                Err(e) => answer_failed(&e),
            };
            (intent.as_str(), html)
        }
    }
}

async fn location_card(state: &AppState, location: &UserLocation) -> String {
    let (Some((lat, lon)), Some(city)) = (location.coordinates(), location.city.as_deref()) else {
        return "<p>⚠️ I can’t determine your location yet. Please enable location access in the chat above.</p>"
            .to_string();
    };

    let weather = state
        .weather
        .current(WeatherQuery::Coordinates { lat, lon })
        .await;

    format!(
        concat!(
            "<div class='card p-3 bg-light border'>",
            "<h5 class='fw-bold mb-2'>📍 Your Current Location</h5>",
            "<p>You’re currently near <b>{}</b> (<code>{:.2}, {:.2}</code>).</p>",
            "<hr>{}",
            "<p class='text-muted small mt-2'>You can update your location anytime ",
            "using the “Change My Location” button above.</p>",
            "</div>"
        ),
        escape_html(city),
        lat,
        lon,
        weather
    )
}

async fn weather(state: &AppState, message: &str, lower: &str, location: &UserLocation) -> String {
    let query = if lower.contains("here") || lower.contains("my location") {
        match (location.coordinates(), &location.city) {
            (Some((lat, lon)), _) => WeatherQuery::Coordinates { lat, lon },
            (None, Some(city)) => WeatherQuery::City(city.clone()),
            (None, None) => {
                return "<p>❌ Location not found. Please enable location access.</p>".to_string()
            }
        }
    } else if let Some(city) = city_in_message(message) {
        WeatherQuery::City(city)
    } else if let Some(city) = &location.city {
        WeatherQuery::City(city.clone())
    } else {
        WeatherQuery::Default
    };

    state.weather.current(query).await
}

async fn answer_documents(state: &AppState, message: &str) -> String {
    let store = state.store.clone();
    let documents = tokio::task::spawn_blocking(move || store.load_documents())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Document loading task failed");
            Vec::new()
        });

    if documents.is_empty() {
        return NO_DOCUMENTS.to_string();
    }

    let relevant = state.ranker.rank(message, &documents).await;
    if relevant.context.trim().is_empty() {
        return NO_RELEVANT_DOCUMENTS.to_string();
    }

    match answer_from_documents(state.chat_model.as_ref(), &relevant.context, message).await {
        Ok(html) => {
            let references =
                render_references(&relevant.matched, &state.config.storage.public_route);
            html + &references
        }
        Err(e) => answer_failed(&e),
    }
}

fn answer_failed(error: &AppError) -> String {
    tracing::warn!(error = %error, "Answer generation failed");
    "<p>⚠️ I couldn’t generate an answer right now. Please try again later.</p>".to_string()
}
