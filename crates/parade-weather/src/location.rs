//! Session location holder.
//!
//! Status only tracks the geolocation attempt; typing a location in by hand
//! replaces the location string but leaves the status alone.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::types::{Coordinates, LocationError};

/// Source of the device position
#[async_trait]
pub trait GeolocationSource: Send + Sync {
    /// Whether the capability exists at all. When false no position request
    /// is made.
    fn is_available(&self) -> bool;

    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// No geolocation capability
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl GeolocationSource for NoGeolocation {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// Reports a fixed position, e.g. one taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocation(pub Coordinates);

#[async_trait]
impl GeolocationSource for FixedGeolocation {
    fn is_available(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationState {
    pub location: String,
    pub status: LocationStatus,
    /// Message for the last failed geolocation attempt
    pub error: Option<&'static str>,
}

impl LocationState {
    /// The location to query with, or `None` when nothing is set yet
    pub fn query_location(&self) -> Option<&str> {
        Some(self.location.as_str()).filter(|l| !l.is_empty())
    }
}

/// Single-writer, many-reader location holder
pub struct LocationStore {
    state: watch::Sender<LocationState>,
    source: Arc<dyn GeolocationSource>,
}

impl LocationStore {
    pub fn new(source: Arc<dyn GeolocationSource>) -> Self {
        Self {
            state: watch::Sender::new(LocationState::default()),
            source,
        }
    }

    pub fn snapshot(&self) -> LocationState {
        self.state.borrow().clone()
    }

    pub fn location(&self) -> String {
        self.state.borrow().location.clone()
    }

    pub fn status(&self) -> LocationStatus {
        self.state.borrow().status
    }

    /// Receiver notified on every location or status change
    pub fn subscribe(&self) -> watch::Receiver<LocationState> {
        self.state.subscribe()
    }

    /// Manual entry. Returns true if the location changed.
    pub fn set_location(&self, value: &str) -> bool {
        let value = value.trim();
        self.state.send_if_modified(|state| {
            if state.location == value {
                return false;
            }
            tracing::info!("Location set to {:?}", value);
            state.location = value.to_string();
            true
        })
    }

    /// Ask the geolocation source for the current position.
    ///
    /// Can be called again after an error to retry.
    pub async fn request_location(&self) -> LocationStatus {
        if !self.source.is_available() {
            tracing::warn!("Geolocation unavailable");
            self.fail(&LocationError::ServiceUnavailable);
            return LocationStatus::Error;
        }

        self.state.send_modify(|state| {
            state.status = LocationStatus::Loading;
            state.error = None;
        });

        match self.source.current_position().await {
            Ok(coords) => {
                let location = coords.to_location_string();
                tracing::info!("Geolocation resolved to {}", location);
                self.state.send_modify(|state| {
                    state.location = location;
                    state.status = LocationStatus::Success;
                    state.error = None;
                });
                LocationStatus::Success
            }
            Err(e) => {
                tracing::warn!("Geolocation failed: {}", e);
                self.fail(&e);
                LocationStatus::Error
            }
        }
    }

    fn fail(&self, error: &LocationError) {
        let message = error.user_message();
        self.state.send_modify(|state| {
            state.status = LocationStatus::Error;
            state.error = Some(message);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts position requests and answers with a scripted result
    struct ScriptedGeolocation {
        available: bool,
        result: Result<Coordinates, ()>,
        calls: AtomicUsize,
    }

    impl ScriptedGeolocation {
        fn new(available: bool, result: Result<Coordinates, ()>) -> Arc<Self> {
            Arc::new(Self {
                available,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GeolocationSource for ScriptedGeolocation {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn current_position(&self) -> Result<Coordinates, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.map_err(|_| LocationError::PermissionDenied)
        }
    }

    #[test]
    fn test_initial_state_is_idle_and_empty() {
        let store = LocationStore::new(Arc::new(NoGeolocation));
        assert_eq!(store.status(), LocationStatus::Idle);
        assert!(store.snapshot().query_location().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_goes_straight_to_error() {
        let source = ScriptedGeolocation::new(false, Ok(Coordinates { lat: 1.0, lon: 2.0 }));
        let store = LocationStore::new(source.clone());

        assert_eq!(store.request_location().await, LocationStatus::Error);
        assert_eq!(store.status(), LocationStatus::Error);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.location(), "");
        assert!(store.snapshot().error.is_some());
    }

    #[tokio::test]
    async fn test_success_sets_coordinate_pair() {
        let source = ScriptedGeolocation::new(true, Ok(Coordinates { lat: 51.52, lon: -0.11 }));
        let store = LocationStore::new(source);
        let mut rx = store.subscribe();

        assert_eq!(store.request_location().await, LocationStatus::Success);
        assert_eq!(store.location(), "51.52,-0.11");
        assert!(store.snapshot().error.is_none());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, LocationStatus::Success);
    }

    #[tokio::test]
    async fn test_denied_is_error_and_retriable() {
        let source = ScriptedGeolocation::new(true, Err(()));
        let store = LocationStore::new(source.clone());

        assert_eq!(store.request_location().await, LocationStatus::Error);
        assert_eq!(store.request_location().await, LocationStatus::Error);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_manual_entry_keeps_status() {
        let store = LocationStore::new(Arc::new(NoGeolocation));
        store.request_location().await;

        assert!(store.set_location("  London "));
        assert_eq!(store.location(), "London");
        assert_eq!(store.status(), LocationStatus::Error);

        assert!(!store.set_location("London"));
    }

    #[tokio::test]
    async fn test_fixed_geolocation() {
        let store = LocationStore::new(Arc::new(FixedGeolocation(Coordinates {
            lat: 40.0,
            lon: -74.5,
        })));
        store.request_location().await;
        assert_eq!(store.location(), "40,-74.5");
    }
}
