//! Reverse geocoding for the browser's coordinates

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use docchat_common::{
    assistant::UNKNOWN_CITY,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CityRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CityResponse {
    pub city: String,
}

/// Resolve coordinates to the nearest city name
pub async fn get_city(
    State(state): State<AppState>,
    Json(request): Json<CityRequest>,
) -> Result<(StatusCode, Json<CityResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let (Some(lat), Some(lon)) = (request.lat, request.lon) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(CityResponse {
                city: UNKNOWN_CITY.to_string(),
            }),
        ));
    };

    let city = state.geocoder.city(lat, lon).await;
    Ok((StatusCode::OK, Json(CityResponse { city })))
}
