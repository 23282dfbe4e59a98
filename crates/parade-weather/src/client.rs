//! Weather backend client.
//!
//! Pointed either at the dashboard's `/api/proxy` prefix or straight at the
//! backend; the routes are the same.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::types::*;

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, WeatherError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, WeatherError> {
        Url::parse(base_url).map_err(|e| WeatherError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Current conditions for a location.
    #[instrument(skip(self), level = "info")]
    pub async fn current(&self, location: &str) -> Result<CurrentWeatherResponse, WeatherError> {
        if location.is_empty() {
            return Err(WeatherError::MissingLocation);
        }

        let response = self
            .client
            .get(self.endpoint("weather/current"))
            .query(&[("location", location)])
            .send()
            .await?;

        handle_response(response, "Failed to fetch current weather").await
    }

    /// AI forecast for a location at a date and time.
    #[instrument(skip(self), level = "info")]
    pub async fn forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ForecastAiResponse, WeatherError> {
        if request.location.is_empty() {
            return Err(WeatherError::MissingLocation);
        }

        let response = self
            .client
            .post(self.endpoint("weather/forecast"))
            .json(request)
            .send()
            .await?;

        handle_response(response, "Failed to fetch forecast").await
    }

    /// AI recommendations for a location at a date and time.
    #[instrument(skip(self), level = "info")]
    pub async fn recommendations(
        &self,
        request: &ForecastRequest,
    ) -> Result<RecommendationsResponse, WeatherError> {
        if request.location.is_empty() {
            return Err(WeatherError::MissingLocation);
        }

        let response = self
            .client
            .post(self.endpoint("weather/recommendations"))
            .json(request)
            .send()
            .await?;

        handle_response(response, "Failed to fetch recommendations").await
    }

    /// True if the backend answers `/health` with a truthy JSON body.
    #[instrument(skip(self), level = "debug")]
    pub async fn health(&self) -> bool {
        let response = match self.client.get(self.endpoint("health")).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Health check failed: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Health check returned status {}", response.status());
            return false;
        }

        match response.json::<Value>().await {
            Ok(body) => is_truthy(&body),
            Err(e) => {
                tracing::debug!("Health check body unreadable: {}", e);
                false
            }
        }
    }
}

/// Decode a 2xx body, or turn the body text into the error message.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    fallback: &str,
) -> Result<T, WeatherError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = if text.is_empty() {
        fallback.to_string()
    } else {
        text
    };
    tracing::warn!("Backend returned {}: {}", status, message);

    Err(WeatherError::Backend {
        status: status.as_u16(),
        message,
    })
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
