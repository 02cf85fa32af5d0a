// Mutations against the back office and the cache invalidations that follow them

use crate::api::ApiError;
use crate::query_cache::QueryCache;
use crate::query_key::QueryKey;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

// The resource a running mutation holds; a second mutation on the same scope is refused
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationScope {
    Resource(QueryKey),
    Item(QueryKey, String),
}

impl MutationScope {
    pub fn resource(key: QueryKey) -> Self {
        MutationScope::Resource(key)
    }

    pub fn item(key: QueryKey, id: impl Into<String>) -> Self {
        MutationScope::Item(key, id.into())
    }

    fn describe(&self) -> String {
        match self {
            MutationScope::Resource(key) => key.to_string(),
            MutationScope::Item(key, id) => format!("{}#{}", key, id),
        }
    }
}

struct ScopeGuard {
    running: Arc<Mutex<HashSet<MutationScope>>>,
    scope: MutationScope,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.running.lock().remove(&self.scope);
    }
}

#[derive(Debug, Clone)]
pub struct MutationTracker {
    cache: QueryCache,
    running: Arc<Mutex<HashSet<MutationScope>>>,
}

impl MutationTracker {
    pub fn new(cache: QueryCache) -> Self {
        Self {
            cache,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_running(&self, scope: &MutationScope) -> bool {
        self.running.lock().contains(scope)
    }

    fn acquire(&self, scope: MutationScope) -> Result<ScopeGuard, ApiError> {
        let mut running = self.running.lock();
        if !running.insert(scope.clone()) {
            return Err(ApiError::MutationInFlight(scope.describe()));
        }
        Ok(ScopeGuard {
            running: Arc::clone(&self.running),
            scope,
        })
    }

    // Runs `mutation`; only a success invalidates, and each key at most once
    pub async fn mutate<T, Fut>(
        &self,
        scope: MutationScope,
        mutation: Fut,
        on_success: &[QueryKey],
    ) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let label = scope.describe();
        let _guard = self.acquire(scope)?;

        match mutation.await {
            Ok(value) => {
                let mut keys: Vec<QueryKey> = Vec::with_capacity(on_success.len());
                for key in on_success {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                    }
                }
                let touched = self.cache.invalidate_many(&keys);
                info!("Mutation on {} succeeded, {} cache entries invalidated", label, touched);
                Ok(value)
            }
            Err(error) => {
                warn!("Mutation on {} failed: {}", label, error);
                // The client already cleared the session
                if error.is_unauthorized() {
                    self.cache.clear();
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_cache::{QueryStatus, ReadOptions};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::oneshot;

    async fn cached_list(cache: &QueryCache, calls: &Arc<AtomicU32>) {
        let calls = Arc::clone(calls);
        cache
            .read(
                QueryKey::Bookings,
                move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok::<u32, ApiError>(n) }
                },
                ReadOptions::default(),
            )
            .await;
    }

    #[tokio::test]
    async fn test_success_invalidates_once() {
        let cache = QueryCache::default();
        let tracker = MutationTracker::new(cache.clone());
        let calls = Arc::new(AtomicU32::new(0));
        cached_list(&cache, &calls).await;

        let result = tracker
            .mutate(
                MutationScope::item(QueryKey::Bookings, "b1"),
                async { Ok::<_, ApiError>("deleted") },
                &[QueryKey::Bookings, QueryKey::Bookings],
            )
            .await;
        assert_eq!(result, Ok("deleted"));

        cache.settle(&QueryKey::Bookings).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().invalidation_count, 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_untouched() {
        let cache = QueryCache::default();
        let tracker = MutationTracker::new(cache.clone());
        let calls = Arc::new(AtomicU32::new(0));
        cached_list(&cache, &calls).await;

        let result: Result<(), ApiError> = tracker
            .mutate(
                MutationScope::resource(QueryKey::Bookings),
                async {
                    Err(ApiError::ApiResponseError {
                        status_code: 500,
                        message: "Internal error".to_string(),
                    })
                },
                &[QueryKey::Bookings],
            )
            .await;

        assert!(result.is_err());
        let entry = cache.peek::<u32>(&QueryKey::Bookings);
        assert_eq!(entry.status, QueryStatus::Success);
        assert!(!entry.is_stale);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_failure_empties_cache() {
        let cache = QueryCache::default();
        let tracker = MutationTracker::new(cache.clone());
        let calls = Arc::new(AtomicU32::new(0));
        cached_list(&cache, &calls).await;

        let result: Result<(), ApiError> = tracker
            .mutate(
                MutationScope::item(QueryKey::Bookings, "b1"),
                async { Err(ApiError::Unauthorized("jwt expired".to_string())) },
                &[QueryKey::Bookings],
            )
            .await;

        assert!(result.is_err());
        assert!(cache.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_scope_rejected_while_running() {
        let tracker = MutationTracker::new(QueryCache::default());
        let scope = MutationScope::item(QueryKey::Faqs, "f1");
        let (release, wait) = oneshot::channel::<()>();

        let first = tracker.mutate(
            scope.clone(),
            async move {
                let _ = wait.await;
                Ok::<_, ApiError>(1)
            },
            &[QueryKey::Faqs],
        );
        let second = async {
            tokio::task::yield_now().await;
            assert!(tracker.is_running(&scope));
            let rejected = tracker
                .mutate(scope.clone(), async { Ok::<_, ApiError>(2) }, &[])
                .await;
            let other = tracker
                .mutate(
                    MutationScope::item(QueryKey::Faqs, "f2"),
                    async { Ok::<_, ApiError>(3) },
                    &[],
                )
                .await;
            let _ = release.send(());
            (rejected, other)
        };

        let (first, (rejected, other)) = tokio::join!(first, second);
        assert_eq!(first, Ok(1));
        assert_eq!(rejected, Err(ApiError::MutationInFlight("faqs#f1".to_string())));
        assert_eq!(other, Ok(3));
        assert!(!tracker.is_running(&scope));
    }
}
