//! Reverse geocoding of browser coordinates to a city name

use crate::config::WeatherConfig;
use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// City reported when every lookup fails
pub const UNKNOWN_CITY: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct OpenWeatherPlace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    local_names: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BigDataCloudPlace {
    #[serde(default)]
    locality: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    principal_subdivision: Option<String>,
}

/// OpenWeather reverse geocoding with a BigDataCloud fallback
#[derive(Clone)]
pub struct ReverseGeocoder {
    client: reqwest::Client,
    api_key: Option<String>,
    openweather_base: String,
    fallback_base: String,
}

impl ReverseGeocoder {
    pub fn new(client: reqwest::Client, config: &WeatherConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            openweather_base: config.api_base.trim_end_matches('/').to_string(),
            fallback_base: config.geocode_fallback_base.trim_end_matches('/').to_string(),
        }
    }

    /// Nearest city for the coordinates, or [`UNKNOWN_CITY`]
    pub async fn city(&self, lat: f64, lon: f64) -> String {
        match self.openweather(lat, lon).await {
            Ok(Some(city)) => {
                info!(city = %city, "Detected city via OpenWeather");
                return city;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "OpenWeather reverse geocode failed"),
        }

        match self.bigdatacloud(lat, lon).await {
            Ok(city) => {
                info!(city = %city, "Detected city via fallback geocoder");
                city
            }
            Err(e) => {
                warn!(error = %e, "Reverse geocode failed");
                UNKNOWN_CITY.to_string()
            }
        }
    }

    async fn openweather(&self, lat: f64, lon: f64) -> Result<Option<String>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };
        let url = format!("{}/geo/1.0/reverse", self.openweather_base);
        let places: Vec<OpenWeatherPlace> = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("limit", "1".to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(places.into_iter().next().and_then(openweather_city))
    }

    async fn bigdatacloud(&self, lat: f64, lon: f64) -> Result<String> {
        let url = format!("{}/data/reverse-geocode-client", self.fallback_base);
        let place: BigDataCloudPlace = self
            .client
            .get(&url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("localityLanguage", "en".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(bigdatacloud_city(place))
    }
}

fn openweather_city(place: OpenWeatherPlace) -> Option<String> {
    let english = place.local_names.and_then(|mut names| names.remove("en"));
    place
        .name
        .filter(|n| !n.is_empty())
        .or(english)
        .filter(|n| !n.eq_ignore_ascii_case(UNKNOWN_CITY))
}

fn bigdatacloud_city(place: BigDataCloudPlace) -> String {
    [place.locality, place.city, place.principal_subdivision]
        .into_iter()
        .flatten()
        .find(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_CITY.to_string())
}
