//! Dashboard session logic for Parade
//!
//! Talks to the weather backend (usually through the `/api/proxy` endpoint),
//! caches per-view results by key, tracks the user's location and derives the
//! presentation theme from the latest condition text.

pub mod client;
pub mod daily;
pub mod dashboard;
pub mod display;
pub mod hourly;
pub mod location;
pub mod query;
pub mod recommendations;
pub mod theme;
pub mod types;

pub use client::BackendClient;
pub use dashboard::Dashboard;
pub use location::{FixedGeolocation, GeolocationSource, LocationStore, NoGeolocation};
pub use query::{Query, QueryState};
pub use recommendations::parse_recommendations;
pub use theme::{classify, ThemeStore, WeatherThemeKey};
pub use types::*;
