//! `POST /api/weather`: forecast straight from WeatherAPI with the server-held key.

use crate::error::ProxyError;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_DAYS: u32 = 7;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/weather", post(forecast))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    DEFAULT_DAYS
}

#[tracing::instrument(skip_all)]
async fn forecast(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ProxyError> {
    let weather_api = &state.config.weather_api;
    let Some(api_key) = weather_api.api_key.as_deref().filter(|k| !k.is_empty()) else {
        tracing::error!("WEATHER_API_KEY is not set");
        return Err(ProxyError::MissingApiKey);
    };

    let query: WeatherQuery =
        serde_json::from_slice(&body).map_err(|e| ProxyError::InvalidBody(e.to_string()))?;
    let location = match query.location {
        Some(location) if !location.is_empty() => location,
        _ => return Err(ProxyError::MissingLocation),
    };

    let url = format!("{}/forecast.json", weather_api.base_url.trim_end_matches('/'));
    let days = query.days.to_string();
    tracing::debug!("Requesting {} day forecast for {}", days, location);

    let response = state
        .http
        .get(&url)
        .query(&[
            ("key", api_key),
            ("q", location.as_str()),
            ("days", days.as_str()),
            ("aqi", "no"),
            ("alerts", "no"),
        ])
        .send()
        .await
        .map_err(transport_failure)?;

    let status = response.status();
    let text = response.text().await.map_err(transport_failure)?;
    // Non-JSON bodies are passed along as plain strings.
    let payload = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        tracing::error!("WeatherAPI returned {}: {}", status, payload);
        return Err(ProxyError::WeatherApi {
            status,
            details: payload,
        });
    }

    Ok(Json(payload))
}

fn transport_failure(e: reqwest::Error) -> ProxyError {
    tracing::error!("Error fetching from WeatherAPI: {}", e);
    ProxyError::WeatherApi {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        details: Value::String(e.to_string()),
    }
}
