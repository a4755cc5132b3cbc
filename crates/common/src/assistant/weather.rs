//! Current weather lookups rendered as a chat card

use crate::config::WeatherConfig;
use serde::Deserialize;
use tracing::{info, warn};

/// Where to look up the weather
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinates { lat: f64, lon: f64 },
    City(String),
    /// The configured default city
    Default,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    name: Option<String>,
    weather: Vec<Condition>,
    main: Readings,
    #[serde(default)]
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: Option<serde_json::Value>,
}

/// OpenWeatherMap client
#[derive(Clone)]
pub struct WeatherService {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    default_city: String,
}

impl WeatherService {
    pub fn new(client: reqwest::Client, config: &WeatherConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            default_city: config.default_city.clone(),
        }
    }

    /// Fetch current conditions and render them. Never fails; problems
    /// are described in the returned HTML.
    pub async fn current(&self, query: WeatherQuery) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return "<p>❌ Weather API key not configured. Set APP__WEATHER__API_KEY.</p>".to_string();
        };

        let url = format!("{}/data/2.5/weather", self.api_base);
        let mut params: Vec<(&str, String)> = match &query {
            WeatherQuery::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
            WeatherQuery::City(city) => vec![("q", city.clone())],
            WeatherQuery::Default => vec![("q", self.default_city.clone())],
        };
        params.push(("appid", api_key.to_string()));
        params.push(("units", "metric".to_string()));

        let response = match self.client.get(&url).query(&params).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(query = ?query, "Weather request timed out");
                return "<p>⏱️ Weather request timed out. Please try again.</p>".to_string();
            }
            Err(e) => {
                warn!(query = ?query, error = %e, "Weather request failed");
                return format!("<p>⚠️ Weather lookup failed: {}</p>", e);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return format!("<p>⚠️ Weather lookup failed: {}</p>", e),
        };

        if !status.is_success() {
            let message = upstream_message(&body);
            warn!(status = %status, message = %message, "Weather API returned an error");
            return format!("<p>⚠️ Could not retrieve weather: {}.</p>", capitalize(&message));
        }

        let fallback_name = match &query {
            WeatherQuery::City(city) => Some(city.as_str()),
            _ => None,
        };
        match serde_json::from_str::<WeatherResponse>(&body) {
            Ok(data) if !data.weather.is_empty() => {
                info!(city = ?data.name, "Weather retrieved");
                render_weather_card(&data, fallback_name)
            }
            Ok(_) | Err(_) => format!(
                "<p>⚠️ Could not retrieve weather: {}.</p>",
                capitalize(&upstream_message(&body))
            ),
        }
    }
}

fn upstream_message(body: &str) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .ok()
        .and_then(|m| m.message)
        .map(|m| match m {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| "Unable to fetch weather data".to_string())
}

/// Uppercase the first character and lowercase the rest
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn condition_emoji(description: &str) -> &'static str {
    let lower = description.to_lowercase();
    if lower.contains("rain") {
        "🌧"
    } else if lower.contains("cloud") {
        "☁️"
    } else if lower.contains("clear") {
        "☀️"
    } else if lower.contains("storm") {
        "⛈"
    } else if lower.contains("snow") {
        "❄️"
    } else {
        "🌤"
    }
}

fn reading(value: Option<f64>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

fn render_weather_card(data: &WeatherResponse, fallback_name: Option<&str>) -> String {
    let city = data
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(fallback_name)
        .unwrap_or("Unknown location");
    let description = data
        .weather
        .first()
        .map(|c| capitalize(&c.description))
        .unwrap_or_default();
    let wind = data.wind.as_ref().and_then(|w| w.speed);

    format!(
        concat!(
            r#"<div class="card p-3 bg-light border mt-2 weather-card">"#,
            r#"<h5 class="fw-bold mb-2">{emoji} Weather in {city}</h5>"#,
            r#"<ul class="mb-0 ps-3">"#,
            "<li><b>Condition:</b> {description}</li>",
            "<li><b>Temperature:</b> {temp}°C (feels like {feels}°C)</li>",
            "<li><b>Humidity:</b> {humidity}%</li>",
            "<li><b>Wind Speed:</b> {wind} m/s</li>",
            "</ul></div>"
        ),
        emoji = condition_emoji(&description),
        city = crate::retrieval::escape_html(city),
        description = crate::retrieval::escape_html(&description),
        temp = reading(data.main.temp),
        feels = reading(data.main.feels_like),
        humidity = reading(data.main.humidity),
        wind = reading(wind),
    )
}
