//! HTTP surface of the dashboard: the backend proxy and the direct
//! WeatherAPI route.

pub mod error;
pub mod proxy;
pub mod state;
pub mod weather_api;

use axum::Router;
use parade_core::Config;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::ProxyError;
pub use state::AppState;

/// Mount point of the backend proxy
pub const PROXY_PREFIX: &str = "/api/proxy";

/// Build the application router.
pub fn create_app(config: Arc<Config>) -> Result<Router, reqwest::Error> {
    let state = AppState::new(config)?;
    Ok(router(state))
}

/// Router over an existing state, mostly for tests
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest(PROXY_PREFIX, proxy::routes(state.clone()))
        .merge(weather_api::routes(state))
        .layer(TraceLayer::new_for_http())
}
