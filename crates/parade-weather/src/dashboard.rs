//! Dashboard session: location, theme and per-view queries for one user.

use chrono::{NaiveDate, NaiveTime};
use parade_core::DashboardConfig;
use std::sync::Arc;

use crate::client::BackendClient;
use crate::daily::{self, DayOutlook};
use crate::hourly::{self, TemperaturePoint};
use crate::location::{GeolocationSource, LocationStatus, LocationStore};
use crate::query::{Query, QueryState};
use crate::theme::{ThemeStore, WeatherThemeKey};
use crate::types::*;

/// Parsed recommendations ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    pub location: String,
    pub date: String,
    pub time: String,
    pub items: Vec<String>,
}

impl From<RecommendationsResponse> for Recommendations {
    fn from(response: RecommendationsResponse) -> Self {
        let items = response.items();
        Self {
            location: response.location,
            date: response.date,
            time: response.time,
            items,
        }
    }
}

pub struct Dashboard {
    client: BackendClient,
    location: LocationStore,
    theme: ThemeStore,
    settings: DashboardConfig,
    current: Query<String, CurrentWeatherResponse>,
    outlook: Query<ForecastRequest, ForecastAiResponse>,
    hourly: Query<(String, NaiveDate), Vec<ForecastAiResponse>>,
}

impl Dashboard {
    pub fn new(
        client: BackendClient,
        geolocation: Arc<dyn GeolocationSource>,
        settings: DashboardConfig,
    ) -> Self {
        Self {
            client,
            location: LocationStore::new(geolocation),
            theme: ThemeStore::new(),
            settings,
            current: Query::new("current"),
            outlook: Query::new("outlook"),
            hourly: Query::new("hourly"),
        }
    }

    /// First-load behaviour: try geolocation once.
    pub async fn start(&self) -> LocationStatus {
        self.location.request_location().await
    }

    pub fn location(&self) -> &LocationStore {
        &self.location
    }

    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Manual location entry. Cached results for other locations are dropped.
    pub fn set_location(&self, value: &str) {
        if self.location.set_location(value) {
            self.evict_other_locations();
        }
    }

    /// Retry geolocation after an error
    pub async fn retry_location(&self) -> LocationStatus {
        let status = self.location.request_location().await;
        if status == LocationStatus::Success {
            self.evict_other_locations();
        }
        status
    }

    fn evict_other_locations(&self) {
        let location = self.location.location();
        self.current.retain(|l| *l == location);
        self.outlook.retain(|r| r.location == location);
        self.hourly.retain(|(l, _)| *l == location);
    }

    /// Time used when a forecast form is submitted without one
    pub fn default_time(&self) -> NaiveTime {
        parse_time(&self.settings.default_time)
            .or_else(|| NaiveTime::from_hms_opt(14, 0, 0))
            .unwrap_or_default()
    }

    /// Current conditions for the session location. Updates the theme.
    pub async fn current_weather(&self) -> QueryState<CurrentWeatherResponse> {
        let location = self.location.snapshot().query_location().map(str::to_string);
        let client = &self.client;

        let state = self
            .current
            .load(location.clone(), || async {
                client.current(location.as_deref().unwrap_or_default()).await
            })
            .await;

        if let (QueryState::Ready(data), Some(requested)) = (&state, location.as_deref()) {
            self.apply_theme_if_current(requested, &data.current.condition);
        }
        state
    }

    /// Fetch current conditions again even if cached.
    ///
    /// A failed refresh keeps the previous conditions as stale data and leaves
    /// the theme alone.
    pub async fn refresh_current(&self) -> QueryState<CurrentWeatherResponse> {
        let Some(location) = self.location.snapshot().query_location().map(str::to_string) else {
            return QueryState::Idle;
        };
        let client = &self.client;

        let state = self
            .current
            .revalidate(location.clone(), || async { client.current(&location).await })
            .await;

        if let QueryState::Ready(data) = &state {
            self.apply_theme_if_current(&location, &data.current.condition);
        }
        state
    }

    /// AI forecast for a date and time. Not cached; each call is a new request.
    pub async fn forecast(
        &self,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<ForecastAiResponse, WeatherError> {
        let request = self.request_for(date, time)?;
        let response = self.client.forecast(&request).await?;
        self.apply_theme_if_current(&request.location, &response.weather.condition.text);
        Ok(response)
    }

    /// AI recommendations for a date and time. Not cached.
    pub async fn recommendations(
        &self,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<Recommendations, WeatherError> {
        let request = self.request_for(date, time)?;
        let response = self.client.recommendations(&request).await?;
        Ok(response.into())
    }

    /// Hourly forecasts for `date`, cached per location and date.
    pub async fn hourly(&self, date: NaiveDate) -> QueryState<Vec<ForecastAiResponse>> {
        let location = self.location.snapshot().query_location().map(str::to_string);
        let key = location.map(|l| (l, date));
        let client = &self.client;
        let concurrency = self.settings.hourly_concurrency;

        let location = key.as_ref().map(|(l, _)| l.clone()).unwrap_or_default();
        self.hourly
            .load(key, || async move {
                hourly::fetch_hourly(client, &location, date, concurrency).await
            })
            .await
    }

    /// Chart-ready hourly trend
    pub async fn hourly_chart(&self, date: NaiveDate) -> QueryState<Vec<TemperaturePoint>> {
        match self.hourly(date).await {
            QueryState::Ready(hours) => QueryState::Ready(Arc::new(hourly::chart_points(&hours))),
            QueryState::Failed {
                message,
                user_message,
                stale,
            } => QueryState::Failed {
                message,
                user_message,
                stale: stale.map(|hours| Arc::new(hourly::chart_points(&hours))),
            },
            QueryState::Idle => QueryState::Idle,
            QueryState::Loading => QueryState::Loading,
        }
    }

    /// Midday outlook for the configured number of days from `start`
    pub async fn outlook(&self, start: NaiveDate) -> Vec<DayOutlook> {
        let location = self.location.location();
        daily::fetch_outlook(
            &self.client,
            &self.outlook,
            &location,
            start,
            self.settings.outlook_days,
        )
        .await
    }

    pub async fn health(&self) -> bool {
        self.client.health().await
    }

    fn request_for(
        &self,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<ForecastRequest, WeatherError> {
        let snapshot = self.location.snapshot();
        let location = snapshot
            .query_location()
            .ok_or(WeatherError::MissingLocation)?;
        Ok(ForecastRequest::new(
            location,
            date,
            time.unwrap_or_else(|| self.default_time()),
        ))
    }

    /// Results for a superseded location are discarded rather than themed.
    fn apply_theme_if_current(&self, requested: &str, condition: &str) -> Option<WeatherThemeKey> {
        if self.location.location() != requested {
            tracing::debug!("Discarding theme update for superseded location {}", requested);
            return None;
        }
        Some(self.theme.apply_condition(condition))
    }
}
