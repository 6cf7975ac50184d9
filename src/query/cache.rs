use super::key::QueryKey;
use crate::api::config::ApiConfig;
use crate::core::{ClientError, Result};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use lazy_static::lazy_static;
use lru::LruCache;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

type AnyValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<AnyValue>>>;

// Process-wide cache shared by every view, configured from the environment
lazy_static! {
    static ref GLOBAL_CACHE: QueryCache =
        QueryCache::from_config(&ApiConfig::from_env().unwrap_or_default());
}

/// Lifecycle of one cache entry as seen by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never requested.
    Idle,
    /// First fetch in flight, nothing to show yet.
    Loading,
    /// Data available and the last fetch succeeded.
    Success,
    /// The last fetch failed. Earlier data, if any, is still attached.
    Error,
}

/// Snapshot of one key: status flags plus the latest good data.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<ClientError>,
    pub is_fetching: bool,
    pub is_stale: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            is_stale: false,
            updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub in_flight: usize,
    pub fetches_started: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache Stats: {} entries, {} in flight, {} fetches started",
            self.entries, self.in_flight, self.fetches_started
        )
    }
}

struct InFlight {
    id: u64,
    future: SharedFetch,
}

#[derive(Default)]
struct CacheEntry {
    data: Option<AnyValue>,
    error: Option<ClientError>,
    updated_at: Option<DateTime<Utc>>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    /// Bumped by every invalidation; a fetch only clears the stale mark if
    /// no invalidation happened since it started.
    generation: u64,
    inflight: Option<InFlight>,
    /// Id of the fetch whose result is in `data`/`error`. Results of older
    /// fetches are discarded.
    applied: Option<u64>,
}

struct CacheInner {
    entries: Mutex<LruCache<QueryKey, CacheEntry>>,
    stale_time: Duration,
    fetches: AtomicU64,
}

/// Keyed result cache with request de-duplication and
/// stale-while-revalidate.
///
/// - At most one fetch per key is in flight; concurrent callers share it
///   and observe the identical result.
/// - A failed fetch records an error but never drops earlier good data.
/// - Fetches run as spawned tasks, so a fetch nobody waits for any more
///   still completes and populates its own key. Readers that switched to a
///   different key never see it.
///
/// Fetches are spawned on the current tokio runtime; starting one outside a
/// runtime fails with [`ClientError::TaskFailed`]. The entry map lock is
/// never held across an await, and fetchers are invoked before it is taken.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(capacity: NonZeroUsize, stale_time: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(LruCache::new(capacity)),
                stale_time,
                fetches: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.cache_capacity, config.stale_time)
    }

    /// The process-wide cache.
    pub fn global() -> &'static QueryCache {
        &GLOBAL_CACHE
    }

    pub fn stale_time(&self) -> Duration {
        self.inner.stale_time
    }

    /// Non-blocking read that also keeps the key fresh.
    ///
    /// Returns whatever is cached right now and, unless a fetch is already
    /// running, starts one in the background when the key has no data or
    /// its data is stale. Needs a tokio runtime to start that fetch.
    pub fn query<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<QueryState<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fut = fetcher();
        let mut entries = self.inner.entries.lock()?;
        let entry = entries.get_or_insert_mut(key.clone(), CacheEntry::default);
        if entry.inflight.is_none() && self.needs_fetch(entry) {
            self.start_fetch(key, entry, fut)?;
        }
        self.snapshot(key, entry)
    }

    /// Resolve `key`: join the in-flight fetch, return fresh cached data, or
    /// fetch and wait.
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fut = fetcher();
        let pending = {
            let mut entries = self.inner.entries.lock()?;
            let entry = entries.get_or_insert_mut(key.clone(), CacheEntry::default);
            match entry.inflight.as_ref().map(|f| f.future.clone()) {
                Some(future) => future,
                None => {
                    if !self.needs_fetch(entry) {
                        if let Some(data) = entry.data.clone() {
                            return downcast(key, data);
                        }
                    }
                    self.start_fetch(key, entry, fut)?
                }
            }
        };

        let value = pending.await?;
        downcast(key, value)
    }

    /// Snapshot without triggering a fetch.
    pub fn peek<T>(&self, key: &QueryKey) -> Result<QueryState<T>>
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.inner.entries.lock()?;
        match entries.get(key) {
            Some(entry) => self.snapshot(key, entry),
            None => Ok(QueryState::idle()),
        }
    }

    /// Wait for the in-flight fetch of `key` (if any), then snapshot it.
    pub async fn settled<T>(&self, key: &QueryKey) -> Result<QueryState<T>>
    where
        T: Send + Sync + 'static,
    {
        let pending = {
            let mut entries = self.inner.entries.lock()?;
            entries
                .get(key)
                .and_then(|entry| entry.inflight.as_ref().map(|f| f.future.clone()))
        };
        if let Some(pending) = pending {
            // A failure is recorded on the entry and shows up in the snapshot.
            let _ = pending.await;
        }
        self.peek(key)
    }

    /// Seed or overwrite the data for `key`, as if a fetch had just
    /// succeeded.
    pub fn set_data<T>(&self, key: &QueryKey, value: T) -> Result<()>
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.inner.entries.lock()?;
        let entry = entries.get_or_insert_mut(key.clone(), CacheEntry::default);
        entry.data = Some(Arc::new(value));
        entry.error = None;
        entry.fetched_at = Some(Instant::now());
        entry.updated_at = Some(Utc::now());
        entry.invalidated = false;
        Ok(())
    }

    /// Mark `key` stale. Its data stays readable until a refetch replaces it.
    pub fn invalidate(&self, key: &QueryKey) -> Result<bool> {
        let mut entries = self.inner.entries.lock()?;
        Ok(match entries.get_mut(key) {
            Some(entry) => {
                mark_invalidated(entry);
                debug!(key = %key, "invalidated");
                true
            }
            None => false,
        })
    }

    /// Mark every key of `resource` stale. Returns how many were marked.
    pub fn invalidate_resource(&self, resource: &str) -> Result<usize> {
        let mut entries = self.inner.entries.lock()?;
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.resource() == resource {
                mark_invalidated(entry);
                count += 1;
            }
        }
        debug!(resource, count, "invalidated resource");
        Ok(count)
    }

    pub fn remove(&self, key: &QueryKey) -> Result<bool> {
        Ok(self.inner.entries.lock()?.pop(key).is_some())
    }

    pub fn clear(&self) -> Result<()> {
        self.inner.entries.lock()?.clear();
        Ok(())
    }

    pub fn contains(&self, key: &QueryKey) -> Result<bool> {
        Ok(self.inner.entries.lock()?.contains(key))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.inner.entries.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.inner.entries.lock()?;
        Ok(CacheStats {
            entries: entries.len(),
            in_flight: entries.iter().filter(|(_, e)| e.inflight.is_some()).count(),
            fetches_started: self.inner.fetches.load(Ordering::SeqCst),
        })
    }

    fn needs_fetch(&self, entry: &CacheEntry) -> bool {
        entry.data.is_none()
            || entry.invalidated
            || entry
                .fetched_at
                .is_none_or(|at| at.elapsed() >= self.inner.stale_time)
    }

    fn snapshot<T>(&self, key: &QueryKey, entry: &CacheEntry) -> Result<QueryState<T>>
    where
        T: Send + Sync + 'static,
    {
        let data = entry
            .data
            .as_ref()
            .map(|value| downcast::<T>(key, Arc::clone(value)))
            .transpose()?;
        let is_fetching = entry.inflight.is_some();

        let status = if is_fetching && data.is_none() {
            QueryStatus::Loading
        } else if entry.error.is_some() {
            QueryStatus::Error
        } else if data.is_some() {
            QueryStatus::Success
        } else {
            QueryStatus::Idle
        };

        Ok(QueryState {
            status,
            is_stale: data.is_some() && self.needs_fetch(entry),
            data,
            error: entry.error.clone(),
            is_fetching,
            updated_at: entry.updated_at,
        })
    }

    /// Spawn the fetch and register it as the key's in-flight request.
    /// Called with the entry map locked.
    fn start_fetch<T, Fut>(
        &self,
        key: &QueryKey,
        entry: &mut CacheEntry,
        fut: Fut,
    ) -> Result<SharedFetch>
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ClientError::TaskFailed(format!("no tokio runtime to fetch '{}'", key))
        })?;
        let id = self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        let generation = entry.generation;
        let cache = self.clone();
        let task_key = key.clone();
        debug!(key = %key, fetch_id = id, "starting fetch");

        let handle = runtime.spawn(async move {
            let result = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result.map(|value| Arc::new(value) as AnyValue),
                Err(_) => Err(ClientError::TaskFailed(format!(
                    "fetch for '{}' panicked",
                    task_key
                ))),
            };
            cache.settle(&task_key, id, generation, &result);
            result
        });

        let future = async move {
            handle
                .await
                .unwrap_or_else(|err| Err(ClientError::TaskFailed(err.to_string())))
        }
        .boxed()
        .shared();

        entry.inflight = Some(InFlight {
            id,
            future: future.clone(),
        });
        Ok(future)
    }

    /// Record a finished fetch. An evicted or removed key is re-populated,
    /// but a result older than the one already applied is dropped.
    fn settle(&self, key: &QueryKey, fetch_id: u64, generation: u64, result: &Result<AnyValue>) {
        let mut entries = match self.inner.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = entries.get_or_insert_mut(key.clone(), CacheEntry::default);
        // Only the registered fetch knows the entry's invalidation history.
        let owned = entry.inflight.as_ref().is_some_and(|f| f.id == fetch_id);
        if owned {
            entry.inflight = None;
        }
        if entry.applied.is_some_and(|applied| applied > fetch_id) {
            debug!(key = %key, fetch_id, "discarding superseded fetch result");
            return;
        }
        entry.applied = Some(fetch_id);

        match result {
            Ok(value) => {
                entry.data = Some(Arc::clone(value));
                entry.error = None;
                entry.fetched_at = Some(Instant::now());
                entry.updated_at = Some(Utc::now());
                if owned && entry.generation == generation {
                    entry.invalidated = false;
                }
                debug!(key = %key, fetch_id, "fetch settled");
            }
            Err(err) => {
                warn!(key = %key, fetch_id, error = %err, "fetch failed, keeping cached data");
                entry.error = Some(err.clone());
            }
        }
    }
}

fn mark_invalidated(entry: &mut CacheEntry) {
    entry.invalidated = true;
    entry.generation += 1;
}

fn downcast<T>(key: &QueryKey, value: AnyValue) -> Result<Arc<T>>
where
    T: Send + Sync + 'static,
{
    value
        .downcast::<T>()
        .map_err(|_| ClientError::TypeMismatch(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn cache(stale_time: Duration) -> QueryCache {
        QueryCache::new(NonZeroUsize::new(16).unwrap(), stale_time)
    }

    fn counted(
        calls: &Arc<AtomicUsize>,
        value: u32,
        delay: Duration,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            .boxed()
        }
    }

    fn failing(calls: &Arc<AtomicUsize>) -> impl FnOnce() -> BoxFuture<'static, Result<u32>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Transport("connection refused".into()))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_call() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::paged("news", 0, 5);
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch(&key, counted(&calls, 7, Duration::from_millis(30))),
            cache.fetch(&key, counted(&calls, 8, Duration::from_millis(30))),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a, 7);
    }

    #[tokio::test]
    async fn test_query_serves_cache_and_revalidates() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::paged("news", 0, 5);
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(*cache.fetch(&key, counted(&calls, 1, Duration::ZERO)).await.unwrap(), 1);

        let state = cache
            .query(&key, counted(&calls, 2, Duration::from_millis(20)))
            .unwrap();
        assert_eq!(state.status, QueryStatus::Success);
        assert_eq!(state.data.as_deref(), Some(&1));
        assert!(state.is_fetching);

        let settled = cache.settled::<u32>(&key).await.unwrap();
        assert_eq!(settled.data.as_deref(), Some(&2));
        assert!(!settled.is_fetching);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_query_is_loading() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::new("crawl-history");
        let calls = Arc::new(AtomicUsize::new(0));

        let state = cache
            .query(&key, counted(&calls, 3, Duration::from_millis(10)))
            .unwrap();
        assert!(state.is_loading());
        assert!(state.data.is_none());

        // A second reader joins the running fetch.
        let again = cache
            .query(&key, counted(&calls, 4, Duration::ZERO))
            .unwrap();
        assert!(again.is_loading());

        let settled = cache.settled::<u32>(&key).await.unwrap();
        assert!(settled.is_success());
        assert_eq!(settled.data.as_deref(), Some(&3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_cached_data() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::new("weekly-stats");
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(&key, counted(&calls, 10, Duration::ZERO)).await.unwrap();
        cache.query(&key, failing(&calls)).unwrap();
        let state = cache.settled::<u32>(&key).await.unwrap();

        assert!(state.is_error());
        assert_eq!(state.data.as_deref(), Some(&10));
        assert_eq!(
            state.error,
            Some(ClientError::Transport("connection refused".into()))
        );

        // The next successful fetch clears the error.
        cache.fetch(&key, counted(&calls, 11, Duration::ZERO)).await.unwrap();
        let state = cache.peek::<u32>(&key).unwrap();
        assert!(state.is_success());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_first_fetch_reports_error() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::new("news-stats");
        let calls = Arc::new(AtomicUsize::new(0));

        let err = cache.fetch(&key, failing(&calls)).await.unwrap_err();
        assert!(err.is_transport());

        let state = cache.peek::<u32>(&key).unwrap();
        assert!(state.is_error());
        assert!(state.data.is_none());
    }

    #[tokio::test]
    async fn test_fresh_data_is_not_refetched() {
        let cache = cache(Duration::from_secs(3600));
        let key = QueryKey::new("news-stats");
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(&key, counted(&calls, 1, Duration::ZERO)).await.unwrap();
        let again = cache.fetch(&key, counted(&calls, 2, Duration::ZERO)).await.unwrap();
        assert_eq!(*again, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(cache.invalidate(&key).unwrap());
        let refreshed = cache.fetch(&key, counted(&calls, 2, Duration::ZERO)).await.unwrap();
        assert_eq!(*refreshed, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidation_during_fetch_stays_stale() {
        let cache = cache(Duration::from_secs(3600));
        let key = QueryKey::new("crawl-history");
        let calls = Arc::new(AtomicUsize::new(0));

        cache.set_data(&key, 0u32).unwrap();
        cache.invalidate(&key).unwrap();
        cache
            .query(&key, counted(&calls, 1, Duration::from_millis(20)))
            .unwrap();
        // Invalidated again while the refetch is running.
        cache.invalidate(&key).unwrap();

        let state = cache.settled::<u32>(&key).await.unwrap();
        assert_eq!(state.data.as_deref(), Some(&1));
        assert!(state.is_stale);

        let refetched = cache.fetch(&key, counted(&calls, 2, Duration::ZERO)).await.unwrap();
        assert_eq!(*refetched, 2);
        assert!(!cache.peek::<u32>(&key).unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_wrong_type_is_an_error() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::new("news-stats");
        cache.set_data(&key, String::from("not a number")).unwrap();

        let err = cache.peek::<u32>(&key).unwrap_err();
        assert_eq!(err, ClientError::TypeMismatch("news-stats".into()));
    }

    #[tokio::test]
    async fn test_invalidate_resource_only_touches_that_resource() {
        let cache = cache(Duration::from_secs(3600));
        cache.set_data(&QueryKey::paged("news", 0, 5), 1u32).unwrap();
        cache.set_data(&QueryKey::paged("news", 5, 5), 2u32).unwrap();
        cache.set_data(&QueryKey::new("crawl-history"), 3u32).unwrap();

        assert_eq!(cache.invalidate_resource("news").unwrap(), 2);
        assert!(cache.peek::<u32>(&QueryKey::paged("news", 5, 5)).unwrap().is_stale);
        assert!(!cache.peek::<u32>(&QueryKey::new("crawl-history")).unwrap().is_stale);
        assert!(!cache.invalidate(&QueryKey::new("missing")).unwrap());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = QueryCache::new(NonZeroUsize::new(2).unwrap(), Duration::ZERO);
        let first = QueryKey::paged("news", 0, 5);
        let second = QueryKey::paged("news", 5, 5);
        let third = QueryKey::paged("news", 10, 5);

        cache.set_data(&first, 1u32).unwrap();
        cache.set_data(&second, 2u32).unwrap();
        cache.peek::<u32>(&first).unwrap();
        cache.set_data(&third, 3u32).unwrap();

        assert_eq!(cache.len().unwrap(), 2);
        assert!(cache.contains(&first).unwrap());
        assert!(!cache.contains(&second).unwrap());
    }

    #[tokio::test]
    async fn test_panicking_fetch_does_not_wedge_key() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::new("news-stats");
        let explode = true;

        let err = cache
            .fetch(&key, move || async move {
                if explode {
                    panic!("fetcher blew up");
                }
                Ok::<u32, ClientError>(0)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::TaskFailed(_)));

        let calls = Arc::new(AtomicUsize::new(0));
        let value = cache.fetch(&key, counted(&calls, 5, Duration::ZERO)).await.unwrap();
        assert_eq!(*value, 5);
    }

    #[test]
    fn test_query_outside_runtime_is_an_error() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::new("news-stats");
        let calls = Arc::new(AtomicUsize::new(0));

        let err = cache
            .query(&key, counted(&calls, 1, Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, ClientError::TaskFailed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.stats().unwrap().in_flight, 0);

        cache.set_data(&key, 4u32).unwrap();
        assert_eq!(cache.peek::<u32>(&key).unwrap().data.as_deref(), Some(&4));
    }

    #[tokio::test]
    async fn test_fetcher_may_read_the_cache() {
        let cache = cache(Duration::ZERO);
        let key = QueryKey::new("news-stats");
        cache.set_data(&key, 1u32).unwrap();

        let reader = cache.clone();
        let read_key = key.clone();
        let value = cache
            .fetch(&key, move || {
                let previous = reader
                    .peek::<u32>(&read_key)
                    .unwrap()
                    .data
                    .map_or(0, |v| *v);
                async move { Ok(previous + 1) }
            })
            .await
            .unwrap();
        assert_eq!(*value, 2);
    }

    #[tokio::test]
    async fn test_older_fetch_never_overwrites_newer_result() {
        let cache = cache(Duration::from_secs(3600));
        let key = QueryKey::new("crawl-history");
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = cache
            .query(&key, counted(&calls, 1, Duration::from_millis(100)))
            .unwrap();
        assert!(slow.is_loading());
        assert!(cache.remove(&key).unwrap());

        let fresh = cache.fetch(&key, counted(&calls, 2, Duration::ZERO)).await.unwrap();
        assert_eq!(*fresh, 2);
        cache.invalidate(&key).unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        let state = cache.peek::<u32>(&key).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.data.as_deref(), Some(&2));
        assert!(state.is_stale);
        assert!(!state.is_fetching);
    }

    #[tokio::test]
    async fn test_removed_key_is_repopulated_by_its_fetch() {
        let cache = cache(Duration::from_secs(3600));
        let key = QueryKey::new("news-stats");
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .query(&key, counted(&calls, 7, Duration::from_millis(50)))
            .unwrap();
        cache.remove(&key).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = cache.peek::<u32>(&key).unwrap();
        assert_eq!(state.data.as_deref(), Some(&7));
        assert!(!state.is_stale);
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = cache(Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("news-stats");
        cache.fetch(&key, counted(&calls, 1, Duration::ZERO)).await.unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.fetches_started, 1);
        assert!(stats.to_string().contains("1 entries"));
    }
}
