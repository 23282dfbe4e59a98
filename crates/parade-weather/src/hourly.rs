//! Hourly temperature trend.
//!
//! One forecast request per hour of the day, fanned out over a bounded task
//! group. Fan-in is all-or-nothing: the first failed hour aborts the rest and
//! fails the whole batch, so a partial trend is never shown.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::BackendClient;
use crate::types::{ForecastAiResponse, ForecastRequest, WeatherError};

pub const HOURS_PER_DAY: u32 = 24;

/// One point on the trend chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperaturePoint {
    pub time: String,
    pub temperature: f64,
}

/// Requests for 00:00 through 23:00 on `date`
pub fn hourly_requests(location: &str, date: NaiveDate) -> Vec<ForecastRequest> {
    (0..HOURS_PER_DAY)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .map(|time| ForecastRequest::new(location, date, time))
        .collect()
}

/// Fetch every hour of `date`, at most `concurrency` requests in flight.
///
/// Results come back ordered by hour.
pub async fn fetch_hourly(
    client: &BackendClient,
    location: &str,
    date: NaiveDate,
    concurrency: usize,
) -> Result<Vec<ForecastAiResponse>, WeatherError> {
    if location.is_empty() {
        return Err(WeatherError::MissingLocation);
    }

    let requests = hourly_requests(location, date);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, request) in requests.into_iter().enumerate() {
        let client = client.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| WeatherError::Task(e.to_string()))?;
            client.forecast(&request).await.map(|r| (index, r))
        });
    }

    let mut results: Vec<Option<ForecastAiResponse>> = vec![None; HOURS_PER_DAY as usize];
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.map_err(|e| WeatherError::Task(e.to_string()))?;
        match outcome {
            Ok((index, response)) => results[index] = Some(response),
            Err(e) => {
                tracing::warn!(
                    "Hourly forecast for {} on {} failed, dropping batch: {}",
                    location,
                    date,
                    e
                );
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    results
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| WeatherError::Task("hourly batch incomplete".to_string()))
}

/// Every second hour, to keep the chart readable
pub fn chart_points(hours: &[ForecastAiResponse]) -> Vec<TemperaturePoint> {
    hours
        .iter()
        .step_by(2)
        .map(|h| TemperaturePoint {
            time: h.time.clone(),
            temperature: h.weather.temperature.current,
        })
        .collect()
}
