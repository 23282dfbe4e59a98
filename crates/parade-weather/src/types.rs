use chrono::{NaiveDate, NaiveTime};
use parade_core::{AppError, NetworkError, ReqwestErrorExt};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Geographic coordinates as reported by the backend or a geolocation source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Location string understood by the backend: `"lat,lon"`
    pub fn to_location_string(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }
}

/// `GET /weather/current` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherResponse {
    pub location: CurrentLocation,
    pub current: CurrentConditions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentLocation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub condition: String,
    pub humidity: f64,
    pub wind_kph: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<String>,
}

/// Body of `POST /weather/forecast` and `POST /weather/recommendations`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub location: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:mm`
    pub time: String,
}

impl ForecastRequest {
    pub fn new(location: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            location: location.into(),
            date: date.format(DATE_FORMAT).to_string(),
            time: time.format(TIME_FORMAT).to_string(),
        }
    }
}

/// `POST /weather/forecast` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastAiResponse {
    pub location: NamedLocation,
    pub date: String,
    pub time: String,
    pub weather: ForecastWeather,
    pub ai_analysis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedLocation {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastWeather {
    pub temperature: ForecastTemperature,
    pub condition: ConditionText,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastTemperature {
    pub current: f64,
    pub feels_like: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionText {
    pub text: String,
}

/// `POST /weather/recommendations` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub location: String,
    pub date: String,
    pub time: String,
    /// Newline-delimited bullet text
    pub recommendations: String,
}

impl RecommendationsResponse {
    pub fn items(&self) -> Vec<String> {
        crate::recommendations::parse_recommendations(&self.recommendations)
    }
}

/// Parse a `HH:mm` time string
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).ok()
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Backend client errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response; the message is the response body text
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("Location is required")]
    MissingLocation,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Task failed: {0}")]
    Task(String),
}

impl WeatherError {
    /// Classify into the application error hierarchy
    pub fn to_app_error(&self) -> AppError {
        match self {
            WeatherError::Network(e) => AppError::Network(e.to_network_error()),
            WeatherError::Backend { status, message } => AppError::Network(NetworkError::ServerError {
                status: *status,
                message: message.clone(),
            }),
            WeatherError::MissingLocation => {
                AppError::Weather(parade_core::WeatherError::LocationRequired)
            }
            WeatherError::InvalidUrl(s) => {
                AppError::Config(parade_core::ConfigError::Invalid(s.clone()))
            }
            WeatherError::Task(s) => {
                AppError::Weather(parade_core::WeatherError::ApiError(s.clone()))
            }
        }
    }

    /// Text safe to show in a view, next to the raw message
    pub fn user_message(&self) -> &'static str {
        self.to_app_error().user_message()
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        e.to_app_error()
    }
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        AppError::Location(self.to_string()).user_message()
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        AppError::Location(e.to_string())
    }
}
