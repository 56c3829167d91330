/// In-process TTL cache
///
/// An explicit cache component owned by whichever service needs one:
/// a key, a time-to-live, and a loader closure. No process-wide state.
use crate::error::ApiResult;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry<T> {
    expires_at: Instant,
    value: T,
}

/// Cache with a fixed per-instance TTL
pub struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `loader` and cache its
    /// result. A loader failure is propagated and nothing is cached.
    pub async fn get_or_load<F, Fut>(&self, key: &str, loader: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if let Some(value) = self.get(key).await {
            tracing::debug!("cache hit: {}", key);
            return Ok(value);
        }

        tracing::debug!("cache miss: {}", key);
        let value = loader().await?;

        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                expires_at: Instant::now() + self.ttl,
                value: value.clone(),
            },
        );

        Ok(value)
    }

    /// Fetch a live entry; expired entries are dropped on access
    pub async fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Drop a cached entry
    pub async fn invalidate(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Number of entries currently held, including not-yet-purged
    /// expired ones
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn loader_runs_once_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_load("key", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(41 + 1)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_reloaded() {
        let cache = TtlCache::new(Duration::from_millis(10));

        cache.get_or_load("key", || async { Ok(1) }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let value = cache.get_or_load("key", || async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn loader_failure_caches_nothing() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));

        let err = cache
            .get_or_load("key", || async {
                Err(ApiError::Internal("upstream down".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(cache.len().await, 0);

        let value = cache.get_or_load("key", || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache = TtlCache::new(Duration::from_secs(60));

        cache.get_or_load("key", || async { Ok(1) }).await.unwrap();
        cache.invalidate("key").await;

        let value = cache.get_or_load("key", || async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }
}
