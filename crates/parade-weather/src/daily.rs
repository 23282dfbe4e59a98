//! Multi-day outlook: a midday forecast for each of the next few days.
//!
//! Days are independent. A failed day is reported on its own and the other
//! days still render.

use chrono::{Days, NaiveDate, NaiveTime};
use tokio::task::JoinSet;

use crate::client::BackendClient;
use crate::query::{Query, QueryState};
use crate::types::{ForecastAiResponse, ForecastRequest};

/// Hour every outlook day is forecast for
pub const OUTLOOK_HOUR: u32 = 12;

#[derive(Debug, Clone)]
pub struct DayOutlook {
    pub date: NaiveDate,
    pub forecast: QueryState<ForecastAiResponse>,
}

/// `days` consecutive dates starting at `start`
pub fn outlook_dates(start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .filter_map(|offset| start.checked_add_days(Days::new(u64::from(offset))))
        .collect()
}

pub fn outlook_request(location: &str, date: NaiveDate) -> ForecastRequest {
    let noon = NaiveTime::from_hms_opt(OUTLOOK_HOUR, 0, 0).unwrap_or_default();
    ForecastRequest::new(location, date, noon)
}

/// Load each day through `cache`, concurrently, in date order.
///
/// An empty location yields no days and issues no requests.
pub async fn fetch_outlook(
    client: &BackendClient,
    cache: &Query<ForecastRequest, ForecastAiResponse>,
    location: &str,
    start: NaiveDate,
    days: u32,
) -> Vec<DayOutlook> {
    if location.is_empty() {
        return Vec::new();
    }

    let mut tasks = JoinSet::new();
    for date in outlook_dates(start, days) {
        let client = client.clone();
        let cache = cache.clone();
        let request = outlook_request(location, date);
        tasks.spawn(async move {
            let forecast = cache
                .load(Some(request.clone()), || async move {
                    client.forecast(&request).await
                })
                .await;
            DayOutlook { date, forecast }
        });
    }

    let mut outlook = Vec::with_capacity(days as usize);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(day) => outlook.push(day),
            Err(e) => tracing::warn!("Outlook task failed: {}", e),
        }
    }
    outlook.sort_by_key(|day| day.date);
    outlook
}
