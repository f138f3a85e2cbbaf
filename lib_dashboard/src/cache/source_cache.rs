//! # Per-Source TTL Cache
//!
//! Wraps one upstream fetcher with a time-to-live cache and a stale fallback.
//!
//! ## Read path of `get()`:
//! 1.  A stored value younger than the TTL is returned without touching the network.
//! 2.  Otherwise exactly one live fetch runs, bounded by the fetch timeout.
//! 3.  Success replaces the stored value and timestamp.
//! 4.  Failure returns the previous value (however old) flagged as stale, or
//!     `Unavailable` when nothing was ever fetched.
//!
//! There is no retry inside the cache. The stored entry sits behind an async
//! `RwLock` that is only held for the read or the single replace, never across
//! the fetch itself, so concurrent callers may both fetch and the last success wins.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::SourceError;
use crate::sources::{Fetch, SourceClient};

/// Result of one `get()` call.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOutcome<T> {
    /// Fresh value served from the cache.
    Hit(T),
    /// Value fetched live during this call.
    Fetched(T),
    /// Live fetch failed; the last known value is returned instead.
    Stale { value: T, error: SourceError },
    /// Live fetch failed and nothing was ever cached.
    Unavailable(SourceError),
}

impl<T> CacheOutcome<T> {
    /// The value, if any, regardless of freshness.
    pub fn into_value(self) -> Option<T> {
        match self {
            CacheOutcome::Hit(v) | CacheOutcome::Fetched(v) | CacheOutcome::Stale { value: v, .. } => Some(v),
            CacheOutcome::Unavailable(_) => None,
        }
    }

    /// True when the returned value did not come from a successful fetch within the TTL.
    pub fn is_degraded(&self) -> bool {
        matches!(self, CacheOutcome::Stale { .. } | CacheOutcome::Unavailable(_))
    }

    /// The fetch error behind a degraded outcome.
    pub fn error(&self) -> Option<&SourceError> {
        match self {
            CacheOutcome::Stale { error, .. } | CacheOutcome::Unavailable(error) => Some(error),
            _ => None,
        }
    }
}

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// TTL cache around a single source.
pub struct SourceCache<T> {
    name: String,
    fetcher: Arc<dyn Fetch<T>>,
    ttl: Duration,
    fetch_timeout: Duration,
    entry: RwLock<Option<CacheEntry<T>>>,
}

impl<T> SourceCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache. A zero `ttl` means every `get()` fetches live.
    pub fn new(fetcher: Arc<dyn Fetch<T>>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            name: fetcher.source_name().to_string(),
            fetcher,
            ttl,
            fetch_timeout,
            entry: RwLock::new(None),
        }
    }

    /// Convenience constructor for a concrete [`SourceClient`].
    pub fn from_client<C>(client: C, ttl: Duration, fetch_timeout: Duration) -> Self
    where
        C: SourceClient<Record = T> + 'static,
    {
        Self::new(Arc::new(client), ttl, fetch_timeout)
    }

    /// Source name, for logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stored value without fetching, fresh or not.
    pub async fn peek(&self) -> Option<T> {
        self.entry.read().await.as_ref().map(|e| e.value.clone())
    }

    /// Fresh value or one live fetch, with stale fallback on failure.
    pub async fn get(&self) -> CacheOutcome<T> {
        {
            let guard = self.entry.read().await;
            if let Some(entry) = guard.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    log::debug!("[{}] cache hit", self.name);
                    return CacheOutcome::Hit(entry.value.clone());
                }
            }
        }

        let result = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.fetch_timeout.as_millis())),
        };

        match result {
            Ok(value) => {
                *self.entry.write().await = Some(CacheEntry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                });
                log::debug!("[{}] fetched live", self.name);
                CacheOutcome::Fetched(value)
            }
            Err(error) => match self.peek().await {
                Some(value) => CacheOutcome::Stale { value, error },
                None => CacheOutcome::Unavailable(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results and counts calls.
    struct Scripted {
        calls: Arc<AtomicUsize>,
        script: Mutex<VecDeque<Result<u32, SourceError>>>,
        delay: Duration,
    }

    impl Scripted {
        fn new(script: Vec<Result<u32, SourceError>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let me = Self {
                calls: calls.clone(),
                script: Mutex::new(script.into()),
                delay: Duration::ZERO,
            };
            (me, calls)
        }
    }

    #[async_trait]
    impl SourceClient for Scripted {
        type Raw = u32;
        type Record = u32;

        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_raw(&self) -> Result<u32, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SourceError::Network("script exhausted".into())))
        }

        fn parse(&self, raw: u32) -> Result<u32, SourceError> {
            Ok(raw)
        }
    }

    const TTL: Duration = Duration::from_secs(600);
    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn test_second_get_within_ttl_is_a_hit() {
        let (client, calls) = Scripted::new(vec![Ok(1), Ok(2)]);
        let cache = SourceCache::from_client(client, TTL, TIMEOUT);

        assert_eq!(cache.get().await, CacheOutcome::Fetched(1));
        tokio::time::advance(Duration::from_secs(599)).await;
        assert_eq!(cache.get().await, CacheOutcome::Hit(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_ttl_fetches_again() {
        let (client, calls) = Scripted::new(vec![Ok(1), Ok(2)]);
        let cache = SourceCache::from_client(client, TTL, TIMEOUT);

        cache.get().await;
        tokio::time::advance(TTL).await;
        assert_eq!(cache.get().await, CacheOutcome::Fetched(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_success_serves_stale() {
        let (client, _) = Scripted::new(vec![Ok(7), Err(SourceError::Quota)]);
        let cache = SourceCache::from_client(client, TTL, TIMEOUT);

        cache.get().await;
        tokio::time::advance(TTL * 2).await;
        let outcome = cache.get().await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.error(), Some(&SourceError::Quota));
        assert_eq!(outcome.into_value(), Some(7));
    }

    #[tokio::test]
    async fn test_failure_without_history_is_unavailable() {
        let (client, _) = Scripted::new(vec![Err(SourceError::Auth(401))]);
        let cache = SourceCache::from_client(client, TTL, TIMEOUT);

        let outcome = cache.get().await;
        assert_eq!(outcome, CacheOutcome::Unavailable(SourceError::Auth(401)));
        assert_eq!(outcome.into_value(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches_and_keeps_fallback() {
        let (client, calls) = Scripted::new(vec![Ok(1), Ok(2), Err(SourceError::Quota)]);
        let cache = SourceCache::from_client(client, Duration::ZERO, TIMEOUT);

        assert_eq!(cache.get().await, CacheOutcome::Fetched(1));
        assert_eq!(cache.get().await, CacheOutcome::Fetched(2));
        assert_eq!(cache.get().await.into_value(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let (mut client, _) = Scripted::new(vec![Ok(1)]);
        client.delay = Duration::from_secs(30);
        let cache = SourceCache::from_client(client, TTL, TIMEOUT);

        let outcome = cache.get().await;
        assert_eq!(outcome, CacheOutcome::Unavailable(SourceError::Timeout(5000)));
        assert_eq!(cache.peek().await, None);
    }

    #[tokio::test]
    async fn test_concurrent_gets_do_not_corrupt() {
        let (client, _) = Scripted::new((0..16).map(Ok).collect());
        let cache = Arc::new(SourceCache::from_client(client, Duration::ZERO, TIMEOUT));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get().await }));
        }
        for h in handles {
            assert!(matches!(h.await.unwrap(), CacheOutcome::Fetched(_)));
        }
        let stored = cache.peek().await.unwrap();
        assert!(stored < 16);
    }
}
