use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Failures the HTTP surface turns into fixed JSON envelopes.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The forwarding call itself failed (connect, TLS, body stream)
    #[error("Proxy error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(#[from] axum::http::Error),

    #[error("Weather API key is not configured")]
    MissingApiKey,

    #[error("Location is required")]
    MissingLocation,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Failed to fetch weather data")]
    WeatherApi { status: StatusCode, details: Value },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Transport(_) | ProxyError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            ProxyError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::MissingLocation | ProxyError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::WeatherApi { status, .. } => *status,
        }
    }

    fn body(&self) -> Value {
        match self {
            ProxyError::Transport(e) => json!({ "error": "Proxy error", "message": e.to_string() }),
            ProxyError::InvalidResponse(e) => {
                json!({ "error": "Proxy error", "message": e.to_string() })
            }
            ProxyError::WeatherApi { details, .. } => {
                json!({ "error": self.to_string(), "details": details })
            }
            ProxyError::MissingApiKey
            | ProxyError::MissingLocation
            | ProxyError::InvalidBody(_) => json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed with {}: {}", status, self);
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self);
        }
        (status, Json(self.body())).into_response()
    }
}
