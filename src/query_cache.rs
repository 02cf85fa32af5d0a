// Keyed query cache for server-owned data
// One slot per QueryKey; at most one fetch per key is ever in flight and every reader awaits the same one

use crate::api::ApiError;
use crate::query_key::QueryKey;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type AnyData = Arc<dyn Any + Send + Sync>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyData, ApiError>> + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, ()>>;

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub fetch_count: AtomicUsize,
    pub failure_count: AtomicUsize,
    pub invalidation_count: AtomicUsize,
    pub coalesced_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub fetch_count: usize,
    pub failure_count: usize,
    pub invalidation_count: usize,
    pub coalesced_count: usize,
    pub eviction_count: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    // How long a successful result is served without refetching
    pub stale_time: Duration,
    // Untouched entries older than this are dropped by sweep()
    pub gc_time: Duration,
    pub sweep_interval: Duration,
    pub refetch_on_invalidate: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(60),
            gc_time: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            refetch_on_invalidate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub enabled: bool,
}

impl ReadOptions {
    pub fn gated(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Snapshot of one slot, typed for the caller
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub key: QueryKey,
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    pub error: Option<ApiError>,
    pub is_stale: bool,
    pub is_enabled: bool,
    pub updated_at: Option<Instant>,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            is_stale: self.is_stale,
            is_enabled: self.is_enabled,
            updated_at: self.updated_at,
        }
    }
}

impl<T> CacheEntry<T> {
    fn idle(key: QueryKey) -> Self {
        Self {
            key,
            data: None,
            status: QueryStatus::Idle,
            error: None,
            is_stale: false,
            is_enabled: true,
            updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    // The data when the last fetch succeeded, otherwise why there is none
    pub fn into_result(self) -> Result<Arc<T>, ApiError> {
        match (self.status, self.error, self.data) {
            (QueryStatus::Error, Some(error), _) => Err(error),
            (_, _, Some(data)) => Ok(data),
            (status, _, None) => Err(ApiError::Other(format!(
                "No data for {} ({:?})",
                self.key, status
            ))),
        }
    }
}

struct Slot {
    data: Option<AnyData>,
    status: QueryStatus,
    error: Option<ApiError>,
    stale: bool,
    enabled: bool,
    // Bumped by every invalidation; a fetch that started under an older value is superseded
    generation: u64,
    // Cache-wide id of the latest fetch spawned for this slot
    fetch_id: u64,
    updated_at: Option<Instant>,
    touched_at: Instant,
    in_flight: Option<InFlight>,
    fetcher: Option<Fetcher>,
}

impl Slot {
    fn new() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            stale: false,
            enabled: true,
            generation: 0,
            fetch_id: 0,
            updated_at: None,
            touched_at: Instant::now(),
            in_flight: None,
            fetcher: None,
        }
    }

    fn is_fresh(&self, stale_time: Duration) -> bool {
        self.status == QueryStatus::Success
            && !self.stale
            && self
                .updated_at
                .map_or(false, |updated| updated.elapsed() < stale_time)
    }
}

struct Inner {
    slots: DashMap<QueryKey, Slot>,
    config: CacheConfig,
    stats: CacheStats,
    next_fetch_id: AtomicU64,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.inner.slots.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

// Marks the slot loading and spawns a fetch owned by it; the slot's handle resolves once the slot is updated
fn spawn_fetch(inner: &Arc<Inner>, key: &QueryKey, slot: &mut Slot) {
    if slot.fetcher.is_none() {
        return;
    }
    let fetch_id = inner.next_fetch_id.fetch_add(1, Ordering::Relaxed) + 1;
    slot.fetch_id = fetch_id;
    slot.status = QueryStatus::Loading;
    inner.stats.fetch_count.fetch_add(1, Ordering::Relaxed);
    debug!("Fetching {} (fetch {})", key, fetch_id);

    let task = tokio::spawn(run_fetch(Arc::downgrade(inner), key.clone(), fetch_id));
    let owner = Arc::downgrade(inner);
    let owned_key = key.clone();
    let handle = async move {
        if let Err(e) = task.await {
            warn!("Fetch task for {} ended abnormally: {}", owned_key, e);
            if let Some(inner) = owner.upgrade() {
                abandon_fetch(&inner, &owned_key, fetch_id, e.to_string());
            }
        }
    }
    .boxed()
    .shared();

    slot.in_flight = Some(handle);
}

async fn run_fetch(inner: Weak<Inner>, key: QueryKey, fetch_id: u64) {
    // The generation is read when the fetch actually starts, so invalidations queued before it collapse into it
    let started = {
        let Some(inner) = inner.upgrade() else { return };
        let found = inner
            .slots
            .get(&key)
            .filter(|slot| slot.fetch_id == fetch_id)
            .and_then(|slot| slot.fetcher.clone().map(|fetcher| (slot.generation, fetcher)));
        found
    };
    let Some((generation, fetcher)) = started else {
        return;
    };

    let result = match AssertUnwindSafe(async move { fetcher().await })
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(_) => Err(ApiError::Other(format!("Fetch for {} panicked", key))),
    };

    if let Some(inner) = inner.upgrade() {
        finish_fetch(&inner, &key, fetch_id, generation, result);
    }
}

fn finish_fetch(
    inner: &Arc<Inner>,
    key: &QueryKey,
    fetch_id: u64,
    generation: u64,
    result: Result<AnyData, ApiError>,
) {
    let Some(mut slot) = inner.slots.get_mut(key) else {
        debug!("Dropping result for removed entry {}", key);
        return;
    };
    // The slot was cleared or removed and recreated since this fetch started
    if slot.fetch_id != fetch_id {
        debug!("Dropping result of replaced fetch {} for {}", fetch_id, key);
        return;
    }
    slot.in_flight = None;
    slot.touched_at = Instant::now();

    let superseded = slot.generation != generation;
    if superseded && slot.enabled && slot.fetcher.is_some() {
        debug!("Discarding superseded result for {}", key);
        spawn_fetch(inner, key, &mut slot);
        return;
    }

    match result {
        Ok(data) => {
            slot.data = Some(data);
            slot.error = None;
            slot.status = QueryStatus::Success;
            // A disabled slot keeps a superseded result, still marked stale
            slot.stale = superseded;
            slot.updated_at = Some(Instant::now());
            debug!("Stored {}", key);
        }
        Err(error) => {
            inner.stats.failure_count.fetch_add(1, Ordering::Relaxed);
            warn!("Fetch for {} failed: {}", key, error);
            slot.error = Some(error);
            slot.status = QueryStatus::Error;
        }
    }
}

// The fetch task died without reporting back
fn abandon_fetch(inner: &Arc<Inner>, key: &QueryKey, fetch_id: u64, reason: String) {
    let Some(mut slot) = inner.slots.get_mut(key) else {
        return;
    };
    if slot.fetch_id != fetch_id || slot.in_flight.is_none() {
        return;
    }
    inner.stats.failure_count.fetch_add(1, Ordering::Relaxed);
    slot.in_flight = None;
    slot.status = QueryStatus::Error;
    slot.error = Some(ApiError::Other(format!("Fetch for {} did not complete: {}", key, reason)));
}

impl Inner {
    fn sweep(&self) -> usize {
        let gc_time = self.config.gc_time;
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| slot.in_flight.is_some() || slot.touched_at.elapsed() < gc_time);
        let evicted = before.saturating_sub(self.slots.len());

        if evicted > 0 {
            self.stats.eviction_count.fetch_add(evicted, Ordering::Relaxed);
            info!("Evicted {} unused cache entries", evicted);
        }
        evicted
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: DashMap::new(),
                config,
                stats: CacheStats::default(),
                next_fetch_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // Serve `key` from cache or fetch it once; a disabled read never touches the network
    pub async fn read<T, F, Fut>(&self, key: QueryKey, fetch: F, options: ReadOptions) -> CacheEntry<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let fetcher: Fetcher = Arc::new(move || {
            let pending = fetch();
            async move { pending.await.map(|data| Arc::new(data) as AnyData) }.boxed()
        });

        let pending = {
            let mut slot = self.inner.slots.entry(key.clone()).or_insert_with(Slot::new);
            slot.fetcher = Some(fetcher);
            slot.enabled = options.enabled;
            slot.touched_at = Instant::now();

            if !options.enabled {
                None
            } else if let Some(in_flight) = &slot.in_flight {
                self.inner.stats.coalesced_count.fetch_add(1, Ordering::Relaxed);
                Some(in_flight.clone())
            } else if slot.is_fresh(self.inner.config.stale_time) {
                self.inner.stats.hit_count.fetch_add(1, Ordering::Relaxed);
                None
            } else {
                self.inner.stats.miss_count.fetch_add(1, Ordering::Relaxed);
                spawn_fetch(&self.inner, &key, &mut slot);
                slot.in_flight.clone()
            }
        };

        if let Some(in_flight) = pending {
            in_flight.await;
            self.settle(&key).await;
        }
        self.peek(&key)
    }

    // Current snapshot without fetching
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> CacheEntry<T> {
        let Some(slot) = self.inner.slots.get(key) else {
            return CacheEntry::idle(key.clone());
        };

        let mut entry = CacheEntry {
            key: key.clone(),
            data: None,
            status: slot.status,
            error: slot.error.clone(),
            is_stale: slot.stale,
            is_enabled: slot.enabled,
            updated_at: slot.updated_at,
        };
        if let Some(data) = &slot.data {
            match Arc::clone(data).downcast::<T>() {
                Ok(data) => entry.data = Some(data),
                Err(_) => {
                    entry.status = QueryStatus::Error;
                    entry.error = Some(ApiError::DecodeError(format!(
                        "cached value for {} has a different type",
                        key
                    )));
                }
            }
        }
        entry
    }

    // Wait until no fetch for `key` is in flight, including follow-up refetches
    pub async fn settle(&self, key: &QueryKey) {
        loop {
            let pending = self.inner.slots.get(key).and_then(|slot| slot.in_flight.clone());
            match pending {
                Some(in_flight) => in_flight.await,
                None => break,
            }
        }
    }

    pub fn invalidate(&self, key: &QueryKey) -> usize {
        self.invalidate_many(std::slice::from_ref(key))
    }

    // Marks every entry covered by one of `keys` stale; enabled entries refetch in the background
    pub fn invalidate_many(&self, keys: &[QueryKey]) -> usize {
        let mut touched = 0;
        let mut refetched = 0;

        for mut entry in self.inner.slots.iter_mut() {
            let key = entry.key().clone();
            if !keys.iter().any(|target| target.covers(&key)) {
                continue;
            }

            let slot = entry.value_mut();
            slot.stale = true;
            slot.generation += 1;
            touched += 1;

            if self.inner.config.refetch_on_invalidate
                && slot.enabled
                && slot.in_flight.is_none()
                && slot.fetcher.is_some()
            {
                spawn_fetch(&self.inner, &key, slot);
                refetched += 1;
            }
        }

        self.inner
            .stats
            .invalidation_count
            .fetch_add(touched, Ordering::Relaxed);
        debug!(
            "Invalidated {} entries ({} refetching) for {:?}",
            touched, refetched, keys
        );
        touched
    }

    // Manual refetch; returns false when the key has never been read
    pub async fn refetch(&self, key: &QueryKey) -> bool {
        let known = match self.inner.slots.get_mut(key) {
            Some(mut slot) if slot.fetcher.is_some() => {
                slot.touched_at = Instant::now();
                if slot.in_flight.is_none() {
                    spawn_fetch(&self.inner, key, &mut slot);
                }
                true
            }
            _ => false,
        };

        if known {
            self.settle(key).await;
        }
        known
    }

    pub fn set_enabled(&self, key: &QueryKey, enabled: bool) {
        if let Some(mut slot) = self.inner.slots.get_mut(key) {
            slot.enabled = enabled;
        }
    }

    // Drops every entry; fetches still in flight land nowhere
    pub fn clear(&self) {
        let count = self.inner.slots.len();
        self.inner.slots.clear();
        debug!("Cleared {} cache entries", count);
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.inner.slots.remove(key).is_some();
        if removed {
            self.inner.stats.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    // Periodic sweep; the task ends on its own once the cache is dropped
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match inner.upgrade() {
                    Some(inner) => {
                        inner.sweep();
                    }
                    None => break,
                }
            }
        })
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStatsReport {
        let stats = &self.inner.stats;
        CacheStatsReport {
            items_count: self.inner.slots.len(),
            hit_count: stats.hit_count.load(Ordering::Relaxed),
            miss_count: stats.miss_count.load(Ordering::Relaxed),
            fetch_count: stats.fetch_count.load(Ordering::Relaxed),
            failure_count: stats.failure_count.load(Ordering::Relaxed),
            invalidation_count: stats.invalidation_count.load(Ordering::Relaxed),
            coalesced_count: stats.coalesced_count.load(Ordering::Relaxed),
            eviction_count: stats.eviction_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use tokio::time::sleep;

    // Fetcher returning 1, 2, 3... after a short delay
    fn counter(calls: &Arc<AtomicU32>, delay_ms: u64) -> impl Fn() -> BoxFuture<'static, Result<u32, ApiError>> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move || {
            let calls = Arc::clone(&calls);
            async move {
                sleep(Duration::from_millis(delay_ms)).await;
                Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
            }
            .boxed()
        }
    }

    fn slow_text(value: &'static str, delay_ms: u64) -> impl Fn() -> BoxFuture<'static, Result<String, ApiError>> + Send + Sync + 'static {
        move || {
            async move {
                sleep(Duration::from_millis(delay_ms)).await;
                Ok(value.to_string())
            }
            .boxed()
        }
    }

    fn exploding() -> impl Fn() -> BoxFuture<'static, Result<u32, ApiError>> + Send + Sync + 'static {
        || {
            async {
                if true {
                    panic!("fetcher bug");
                }
                Ok(0)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_fetch() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));

        let (a, b) = tokio::join!(
            cache.read(QueryKey::Bookings, counter(&calls, 10), ReadOptions::default()),
            cache.read(QueryKey::Bookings, counter(&calls, 10), ReadOptions::default()),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.data(), Some(&1));
        assert_eq!(b.data(), Some(&1));
        assert_eq!(cache.stats().coalesced_count, 1);
    }

    #[tokio::test]
    async fn test_fresh_entry_is_a_hit() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));

        cache
            .read(QueryKey::Faqs, counter(&calls, 0), ReadOptions::default())
            .await;
        let entry = cache
            .read(QueryKey::Faqs, counter(&calls, 0), ReadOptions::default())
            .await;

        assert!(entry.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hit_count, stats.miss_count), (1, 1));
    }

    #[tokio::test]
    async fn test_disabled_read_never_fetches() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));
        let key = QueryKey::Booking("b1".to_string());

        let entry = cache
            .read(key.clone(), counter(&calls, 0), ReadOptions::gated(false))
            .await;
        assert_eq!(entry.status, QueryStatus::Idle);
        assert!(!entry.is_enabled);

        cache.invalidate(&QueryKey::Bookings);
        cache.settle(&key).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.peek::<u32>(&key).is_stale);

        let entry = cache
            .read(key.clone(), counter(&calls, 0), ReadOptions::gated(true))
            .await;
        assert_eq!(entry.data(), Some(&1));
        assert!(!entry.is_stale);
    }

    #[tokio::test]
    async fn test_invalidation_refetches_covered_entries() {
        let cache = QueryCache::default();
        let list_calls = Arc::new(AtomicU32::new(0));
        let detail_calls = Arc::new(AtomicU32::new(0));
        let faq_calls = Arc::new(AtomicU32::new(0));
        let detail = QueryKey::Booking("b1".to_string());

        cache
            .read(QueryKey::Bookings, counter(&list_calls, 0), ReadOptions::default())
            .await;
        cache
            .read(detail.clone(), counter(&detail_calls, 0), ReadOptions::default())
            .await;
        cache
            .read(QueryKey::Faqs, counter(&faq_calls, 0), ReadOptions::default())
            .await;

        assert_eq!(cache.invalidate(&QueryKey::Bookings), 2);
        cache.settle(&QueryKey::Bookings).await;
        cache.settle(&detail).await;

        assert_eq!(list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(detail_calls.load(Ordering::SeqCst), 2);
        assert_eq!(faq_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek::<u32>(&QueryKey::Bookings).data(), Some(&2));
        assert!(!cache.peek::<u32>(&QueryKey::Faqs).is_stale);
    }

    #[tokio::test]
    async fn test_back_to_back_invalidations_coalesce() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));

        cache
            .read(QueryKey::Cleaners, counter(&calls, 5), ReadOptions::default())
            .await;
        cache.invalidate(&QueryKey::Cleaners);
        cache.invalidate(&QueryKey::Cleaners);
        cache.invalidate(&QueryKey::Cleaners);
        cache.settle(&QueryKey::Cleaners).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let entry = cache.peek::<u32>(&QueryKey::Cleaners);
        assert_eq!(entry.data(), Some(&2));
        assert!(!entry.is_stale);
    }

    #[tokio::test]
    async fn test_result_superseded_mid_flight_is_discarded() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));

        cache
            .read(QueryKey::Banks, counter(&calls, 30), ReadOptions::default())
            .await;
        cache.invalidate(&QueryKey::Banks);
        sleep(Duration::from_millis(10)).await;
        // The refetch is running now; this invalidation must win over its result
        cache.invalidate(&QueryKey::Banks);
        cache.settle(&QueryKey::Banks).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.peek::<u32>(&QueryKey::Banks).data(), Some(&3));
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_data() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));
        let fetch = {
            let calls = Arc::clone(&calls);
            move || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Ok(vec!["first".to_string()])
                    } else {
                        Err(ApiError::NetworkError("connection reset".to_string()))
                    }
                }
            }
        };

        cache
            .read(QueryKey::About, fetch, ReadOptions::default())
            .await;
        assert!(cache.refetch(&QueryKey::About).await);

        let entry = cache.peek::<Vec<String>>(&QueryKey::About);
        assert_eq!(entry.status, QueryStatus::Error);
        assert_eq!(entry.data().map(|v| v.len()), Some(1));
        assert_eq!(
            entry.error,
            Some(ApiError::NetworkError("connection reset".to_string()))
        );
        assert_eq!(cache.stats().failure_count, 1);
    }

    #[tokio::test]
    async fn test_peek_with_wrong_type_reports_error() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));
        cache
            .read(QueryKey::Profile, counter(&calls, 0), ReadOptions::default())
            .await;

        let entry = cache.peek::<String>(&QueryKey::Profile);
        assert!(entry.data.is_none());
        assert!(matches!(entry.error, Some(ApiError::DecodeError(_))));
    }

    #[tokio::test]
    async fn test_sweep_drops_untouched_entries() {
        let cache = QueryCache::new(CacheConfig {
            gc_time: Duration::ZERO,
            ..CacheConfig::default()
        });
        let calls = Arc::new(AtomicU32::new(0));
        cache
            .read(QueryKey::Admins, counter(&calls, 0), ReadOptions::default())
            .await;
        assert!(cache.contains(&QueryKey::Admins));

        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());
        assert!(!cache.refetch(&QueryKey::Admins).await);
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[tokio::test]
    async fn test_fetch_from_cleared_entry_is_dropped() {
        let cache = QueryCache::default();

        let first = cache.read(QueryKey::Profile, slow_text("session-a", 50), ReadOptions::default());
        let second = async {
            sleep(Duration::from_millis(10)).await;
            cache.clear();
            cache
                .read(QueryKey::Profile, slow_text("session-b", 100), ReadOptions::default())
                .await
        };
        let meanwhile = async {
            sleep(Duration::from_millis(70)).await;
            cache.peek::<String>(&QueryKey::Profile)
        };
        let (first, second, meanwhile) = tokio::join!(first, second, meanwhile);

        // The old fetch finished first but its result belongs to the dropped entry
        assert_eq!(meanwhile.status, QueryStatus::Loading);
        assert!(meanwhile.data.is_none());
        assert_eq!(second.data().map(String::as_str), Some("session-b"));
        assert_eq!(first.data().map(String::as_str), Some("session-b"));
        assert_eq!(cache.stats().fetch_count, 2);
    }

    #[tokio::test]
    async fn test_removed_entry_keeps_its_new_fetch_in_flight() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));

        let first = cache.read(QueryKey::Banks, counter(&calls, 40), ReadOptions::default());
        let rest = async {
            sleep(Duration::from_millis(10)).await;
            assert!(cache.remove(&QueryKey::Banks));
            let second = cache.read(QueryKey::Banks, counter(&calls, 80), ReadOptions::default());
            let third = async {
                sleep(Duration::from_millis(50)).await;
                cache
                    .read(QueryKey::Banks, counter(&calls, 0), ReadOptions::default())
                    .await
            };
            tokio::join!(second, third)
        };
        let (_, (second, third)) = tokio::join!(first, rest);

        // The third reader joined the running fetch instead of starting another
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.data(), Some(&2));
        assert_eq!(third.data(), Some(&2));
        assert_eq!(cache.stats().coalesced_count, 1);
    }

    #[tokio::test]
    async fn test_superseded_result_on_disabled_entry_stays_stale() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));
        let key = QueryKey::Booking("b1".to_string());

        let open = cache.read(key.clone(), counter(&calls, 30), ReadOptions::gated(true));
        let close = async {
            sleep(Duration::from_millis(10)).await;
            cache.set_enabled(&key, false);
            cache.invalidate(&QueryKey::Bookings);
        };
        let (entry, _) = tokio::join!(open, close);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(entry.status, QueryStatus::Success);
        assert_eq!(entry.data(), Some(&1));
        assert!(entry.error.is_none());
        assert!(entry.is_stale);
        assert!(!entry.is_enabled);
    }

    #[tokio::test]
    async fn test_panicking_fetcher_becomes_an_error() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicU32::new(0));

        let entry = cache
            .read(QueryKey::Faqs, exploding(), ReadOptions::default())
            .await;
        assert_eq!(entry.status, QueryStatus::Error);
        assert!(matches!(entry.error, Some(ApiError::Other(_))));

        let settled = tokio::time::timeout(Duration::from_secs(1), cache.settle(&QueryKey::Faqs)).await;
        assert!(settled.is_ok());

        let entry = cache
            .read(QueryKey::Faqs, counter(&calls, 0), ReadOptions::default())
            .await;
        assert_eq!(entry.status, QueryStatus::Success);
        assert_eq!(entry.data(), Some(&1));
        assert_eq!(cache.stats().failure_count, 1);
    }
}
