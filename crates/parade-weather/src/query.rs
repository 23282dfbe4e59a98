//! Keyed request cache shared by the dashboard views.
//!
//! Loads for the same key share one request and a success is kept until the
//! key is evicted. A failure caches nothing, so the next load retries, and it
//! never replaces data already cached for the key.

use parade_core::AppError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Debug)]
pub enum QueryState<T> {
    /// No key, so nothing was requested
    Idle,
    /// A request for the key is in flight
    Loading,
    Ready(Arc<T>),
    Failed {
        /// Raw error text, usually the backend's response body
        message: String,
        /// Message safe to show in a view
        user_message: &'static str,
        /// Data cached for the key before the failure, if any
        stale: Option<Arc<T>>,
    },
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready(data) => Some(data),
            Self::Failed { stale, .. } => stale.as_ref(),
            Self::Idle | Self::Loading => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Failed { user_message, .. } => Some(*user_message),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading => Self::Loading,
            Self::Ready(data) => Self::Ready(data.clone()),
            Self::Failed {
                message,
                user_message,
                stale,
            } => Self::Failed {
                message: message.clone(),
                user_message: *user_message,
                stale: stale.clone(),
            },
        }
    }
}

type Slot<T> = Arc<OnceCell<Arc<T>>>;

#[derive(Clone)]
struct Failure {
    message: String,
    user_message: &'static str,
}

impl Failure {
    fn new<E: Display + Into<AppError>>(error: E) -> Self {
        let message = error.to_string();
        let user_message = error.into().user_message();
        Self {
            message,
            user_message,
        }
    }

    fn into_state<T>(self, stale: Option<Arc<T>>) -> QueryState<T> {
        QueryState::Failed {
            message: self.message,
            user_message: self.user_message,
            stale,
        }
    }
}

struct Entries<K, T> {
    slots: HashMap<K, Slot<T>>,
    errors: HashMap<K, Failure>,
}

/// Cheap to clone; clones share the same cache.
pub struct Query<K, T> {
    name: &'static str,
    entries: Arc<Mutex<Entries<K, T>>>,
}

impl<K, T> Clone for Query<K, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            entries: self.entries.clone(),
        }
    }
}

impl<K, T> Query<K, T>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Arc::new(Mutex::new(Entries {
                slots: HashMap::new(),
                errors: HashMap::new(),
            })),
        }
    }

    /// Load `key`, calling `fetch` only if nothing is cached or in flight.
    ///
    /// A `None` key returns `Idle` without calling `fetch`.
    pub async fn load<F, Fut, E>(&self, key: Option<K>, fetch: F) -> QueryState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Into<AppError>,
    {
        let Some(key) = key else {
            return QueryState::Idle;
        };

        let slot = self
            .entries
            .lock()
            .slots
            .entry(key.clone())
            .or_default()
            .clone();

        let result = slot
            .get_or_try_init(move || async move { fetch().await.map(Arc::new) })
            .await;

        match result {
            Ok(data) => {
                self.entries.lock().errors.remove(&key);
                QueryState::Ready(data.clone())
            }
            Err(e) => {
                let failure = Failure::new(e);
                tracing::debug!("{} query for {:?} failed: {}", self.name, key, failure.message);
                let mut entries = self.entries.lock();
                // Evicted while in flight: the failure belongs to nobody
                if entries.slots.get(&key).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                    entries.errors.insert(key, failure.clone());
                }
                failure.into_state(None)
            }
        }
    }

    /// Fetch `key` again even if cached. On failure the cached data stays.
    pub async fn revalidate<F, Fut, E>(&self, key: K, fetch: F) -> QueryState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Into<AppError>,
    {
        match fetch().await {
            Ok(data) => {
                let data = Arc::new(data);
                let mut entries = self.entries.lock();
                entries
                    .slots
                    .insert(key.clone(), Arc::new(OnceCell::new_with(Some(data.clone()))));
                entries.errors.remove(&key);
                QueryState::Ready(data)
            }
            Err(e) => {
                let failure = Failure::new(e);
                tracing::debug!(
                    "{} revalidation for {:?} failed: {}",
                    self.name,
                    key,
                    failure.message
                );
                let mut entries = self.entries.lock();
                let stale = entries.slots.get(&key).and_then(|s| s.get().cloned());
                entries.errors.insert(key, failure.clone());
                failure.into_state(stale)
            }
        }
    }

    /// Current state for `key` without issuing a request
    pub fn peek(&self, key: Option<&K>) -> QueryState<T> {
        let Some(key) = key else {
            return QueryState::Idle;
        };
        let entries = self.entries.lock();
        let cached = entries.slots.get(key).and_then(|s| s.get().cloned());

        if let Some(failure) = entries.errors.get(key) {
            return failure.clone().into_state(cached);
        }
        match (entries.slots.contains_key(key), cached) {
            (_, Some(data)) => QueryState::Ready(data),
            (true, None) => QueryState::Loading,
            (false, None) => QueryState::Idle,
        }
    }

    /// Keep only keys matching `keep`. In-flight requests for evicted keys
    /// still complete but their result is dropped.
    pub fn retain<P>(&self, mut keep: P)
    where
        P: FnMut(&K) -> bool,
    {
        let mut entries = self.entries.lock();
        entries.slots.retain(|k, _| keep(k));
        entries.errors.retain(|k, _| keep(k));
    }

    pub fn clear(&self) {
        self.retain(|_| false);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeatherError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn backend_error(message: &str) -> WeatherError {
        WeatherError::Backend {
            status: 503,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_none_key_skips_fetch() {
        let query: Query<String, u32> = Query::new("test");
        let calls = &AtomicUsize::new(0);

        let state = query
            .load(None, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, WeatherError>(1)
            })
            .await;

        assert!(state.is_idle());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_is_cached_per_key() {
        let query: Query<String, u32> = Query::new("test");
        let calls = &AtomicUsize::new(0);
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, WeatherError>(42)
        };

        let first = query.load(Some("a".to_string()), fetch).await;
        let second = query.load(Some("a".to_string()), fetch).await;

        assert_eq!(first.data().map(|d| **d), Some(42));
        assert_eq!(second.data().map(|d| **d), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        query.load(Some("b".to_string()), fetch).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_request() {
        let query: Query<String, u32> = Query::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let load = |q: Query<String, u32>, calls: Arc<AtomicUsize>| async move {
            q.load(Some("k".to_string()), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<_, WeatherError>(7)
            })
            .await
        };

        let (a, b) = tokio::join!(
            load(query.clone(), calls.clone()),
            load(query.clone(), calls.clone())
        );

        assert_eq!(a.data().map(|d| **d), Some(7));
        assert_eq!(b.data().map(|d| **d), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_surfaces_message_and_retries() {
        let query: Query<String, u32> = Query::new("test");
        let key = Some("k".to_string());

        let failed = query
            .load(key.clone(), || async { Err::<u32, _>(backend_error("backend down")) })
            .await;
        assert_eq!(failed.error(), Some("backend down"));
        assert_eq!(
            failed.user_message(),
            Some("The server is experiencing issues. Please try again later.")
        );
        assert_eq!(query.peek(key.as_ref()).error(), Some("backend down"));

        let ok = query
            .load(key.clone(), || async { Ok::<_, WeatherError>(3) })
            .await;
        assert_eq!(ok.data().map(|d| **d), Some(3));
        assert!(query.peek(key.as_ref()).error().is_none());
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_cached_data() {
        let query: Query<String, u32> = Query::new("test");
        let key = "k".to_string();

        query
            .load(Some(key.clone()), || async { Ok::<_, WeatherError>(1) })
            .await;
        let state = query
            .revalidate(key.clone(), || async { Err::<u32, _>(backend_error("timeout")) })
            .await;

        assert_eq!(state.error(), Some("timeout"));
        assert_eq!(state.data().map(|d| **d), Some(1));
        assert_eq!(query.peek(Some(&key)).data().map(|d| **d), Some(1));

        let state = query
            .revalidate(key.clone(), || async { Ok::<_, WeatherError>(2) })
            .await;
        assert_eq!(state.data().map(|d| **d), Some(2));
    }

    #[tokio::test]
    async fn test_retain_evicts_other_keys() {
        let query: Query<String, u32> = Query::new("test");
        for key in ["paris", "london"] {
            query
                .load(Some(key.to_string()), || async { Ok::<_, WeatherError>(1) })
                .await;
        }
        assert_eq!(query.len(), 2);

        query.retain(|k| k == "london");
        assert_eq!(query.len(), 1);
        assert!(query.peek(Some(&"paris".to_string())).is_idle());

        query.clear();
        assert!(query.is_empty());
    }

    #[tokio::test]
    async fn test_result_evicted_in_flight_is_discarded() {
        let query: Query<String, u32> = Query::new("test");
        let key = "london".to_string();
        let (release, gate) = oneshot::channel::<()>();

        let load = query.load(Some(key.clone()), || async move {
            let _ = gate.await;
            Ok::<_, WeatherError>(9)
        });
        let evict = async {
            tokio::task::yield_now().await;
            assert_eq!(query.len(), 1);
            query.clear();
            let _ = release.send(());
        };
        let (state, ()) = tokio::join!(load, evict);

        // The caller still gets its value, the cache does not keep it.
        assert_eq!(state.data().map(|d| **d), Some(9));
        assert!(query.is_empty());
        assert!(query.peek(Some(&key)).is_idle());
    }

    #[tokio::test]
    async fn test_failure_evicted_in_flight_is_not_recorded() {
        let query: Query<String, u32> = Query::new("test");
        let key = "london".to_string();
        let (release, gate) = oneshot::channel::<()>();

        let load = query.load(Some(key.clone()), || async move {
            let _ = gate.await;
            Err::<u32, _>(backend_error("late failure"))
        });
        let evict = async {
            tokio::task::yield_now().await;
            query.clear();
            let _ = release.send(());
        };
        let (state, ()) = tokio::join!(load, evict);

        assert_eq!(state.error(), Some("late failure"));
        assert!(query.peek(Some(&key)).is_idle());
    }
}
