//! Stale-while-revalidate cache for a single value.
//!
//! Readers always get the latest cached result immediately once one exists.
//! Once the last refresh attempt is older than the ttl, a read schedules a
//! background refresh. Errors are cached under the same ttl. At most one
//! refresh runs per cache at any time; concurrent readers that arrive before
//! the first value share that refresh instead of starting their own.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwrCacheConfig {
    /// Age after which a successful value is considered stale.
    pub ttl: Duration,
    /// Refresh on a timer, independent of reads. `None` (or zero) disables it.
    pub proactive_revalidation_interval: Option<Duration>,
    /// Start fetching as soon as the cache is created.
    pub proactively_initialize: bool,
}

impl Default for SwrCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            proactive_revalidation_interval: None,
            proactively_initialize: false,
        }
    }
}

// ─── CachedResult ─────────────────────────────────────────────────────────────

/// The outcome of one fetch, success or failure. Replaced wholesale on each
/// revalidation.
#[derive(Debug)]
pub struct CachedResult<T, E> {
    pub result: Result<T, E>,
    /// Wall-clock time the result was stored.
    pub cached_at: DateTime<Utc>,
    fetched_at: Instant,
}

impl<T, E> CachedResult<T, E> {
    pub fn new(result: Result<T, E>) -> Self {
        Self {
            result,
            cached_at: Utc::now(),
            fetched_at: Instant::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

// ─── Revalidate ───────────────────────────────────────────────────────────────

/// Produces a fresh value for a [`SwrCache`].
#[async_trait]
pub trait Revalidate: Send + Sync + 'static {
    type Output: Send + Sync + 'static;
    type Error: Display + Send + Sync + 'static;

    /// Fetch a new value. `previous` is the currently cached result, if any,
    /// so implementations may reuse it instead of fetching again.
    async fn revalidate(
        &self,
        previous: Option<&CachedResult<Self::Output, Self::Error>>,
    ) -> Result<Self::Output, Self::Error>;
}

/// Adapts a plain async closure into a [`Revalidate`] that ignores the
/// previous value.
pub struct FnRevalidator<F>(F);

pub fn from_fn<F>(f: F) -> FnRevalidator<F> {
    FnRevalidator(f)
}

#[async_trait]
impl<F, Fut, T, E> Revalidate for FnRevalidator<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    type Output = T;
    type Error = E;

    async fn revalidate(&self, _previous: Option<&CachedResult<T, E>>) -> Result<T, E> {
        (self.0)().await
    }
}

// ─── SwrCache ─────────────────────────────────────────────────────────────────

type Slot<R> = Option<Arc<CachedResult<<R as Revalidate>::Output, <R as Revalidate>::Error>>>;

struct Shared<R: Revalidate> {
    revalidator: R,
    ttl: Duration,
    slot: watch::Sender<Slot<R>>,
    in_flight: AtomicBool,
    /// End of the last refresh, successful or not. Staleness is measured
    /// from here so a failing source is retried at most once per ttl.
    attempted_at: Mutex<Option<Instant>>,
}

/// Releases the single-flight flag when a refresh ends, however it ends.
struct InFlightGuard<'a, R: Revalidate> {
    shared: &'a Shared<R>,
}

impl<R: Revalidate> Drop for InFlightGuard<'_, R> {
    fn drop(&mut self) {
        self.shared.in_flight.store(false, Ordering::Release);
        if std::thread::panicking() {
            // Wake readers waiting on a first value so they can retry.
            self.shared.slot.send_modify(|_| {});
        }
    }
}

impl<R: Revalidate> Shared<R> {
    fn is_stale(&self) -> bool {
        self.attempted_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map_or(true, |at| at.elapsed() >= self.ttl)
    }

    fn mark_attempted(&self) {
        *self.attempted_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    /// Start a background refresh unless one is already running.
    fn spawn_refresh(self: &Arc<Self>) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!("refresh already in flight");
            return false;
        }
        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.refresh().await });
        true
    }

    async fn refresh(&self) {
        let _guard = InFlightGuard { shared: self };
        let previous = self.slot.borrow().as_ref().map(Arc::clone);

        let started = Instant::now();
        let outcome = self.revalidator.revalidate(previous.as_deref()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.mark_attempted();

        let next = match outcome {
            Ok(value) => {
                tracing::debug!(elapsed_ms, "cache revalidated");
                CachedResult::new(Ok(value))
            }
            Err(error) => match previous.as_deref() {
                Some(prev) if prev.is_ok() => {
                    tracing::warn!(%error, elapsed_ms, "cache refresh failed, serving previous value");
                    return;
                }
                _ => {
                    tracing::warn!(%error, elapsed_ms, "cache refresh failed, caching error");
                    CachedResult::new(Err(error))
                }
            },
        };
        self.slot.send_replace(Some(Arc::new(next)));
    }
}

/// A stale-while-revalidate cache around one [`Revalidate`] source.
///
/// Must be created inside a Tokio runtime when proactive initialization or
/// interval revalidation is enabled.
pub struct SwrCache<R: Revalidate> {
    shared: Arc<Shared<R>>,
    scheduler: Option<JoinHandle<()>>,
}

impl<R: Revalidate> SwrCache<R> {
    pub fn new(revalidator: R, config: SwrCacheConfig) -> Self {
        let (slot, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            revalidator,
            ttl: config.ttl,
            slot,
            in_flight: AtomicBool::new(false),
            attempted_at: Mutex::new(None),
        });

        if config.proactively_initialize {
            shared.spawn_refresh();
        }

        let scheduler = config
            .proactive_revalidation_interval
            .filter(|period| !period.is_zero())
            .map(|period| spawn_scheduler(Arc::downgrade(&shared), period));

        tracing::debug!(
            ttl_ms = config.ttl.as_millis() as u64,
            interval_ms = ?config.proactive_revalidation_interval.map(|d| d.as_millis()),
            proactive = config.proactively_initialize,
            "swr cache created"
        );

        Self { shared, scheduler }
    }

    /// The latest cached result. Waits only when nothing has been cached yet.
    ///
    /// A stale result is still returned; a refresh is scheduled in the
    /// background. Errors follow the same ttl as values.
    pub async fn read(&self) -> Arc<CachedResult<R::Output, R::Error>> {
        let mut rx = self.shared.slot.subscribe();
        let current = rx.borrow_and_update().as_ref().map(Arc::clone);
        if let Some(cached) = current {
            if self.shared.is_stale() {
                self.shared.spawn_refresh();
            }
            return cached;
        }

        // Nothing cached yet: join the in-flight fetch, or start one. The
        // result handed to waiters is never refreshed again on their behalf.
        loop {
            self.shared.spawn_refresh();
            // The sender lives in `self.shared`, so this only returns once
            // the slot changes.
            let _ = rx.changed().await;
            let current = rx.borrow_and_update().as_ref().map(Arc::clone);
            if let Some(cached) = current {
                return cached;
            }
        }
    }

    /// The current cached result without scheduling anything.
    pub fn peek(&self) -> Option<Arc<CachedResult<R::Output, R::Error>>> {
        self.shared.slot.borrow().as_ref().map(Arc::clone)
    }

    /// Schedule a refresh now. Returns `false` if one was already running.
    pub fn revalidate(&self) -> bool {
        self.shared.spawn_refresh()
    }

    pub fn is_refreshing(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }
}

impl<R: Revalidate> Drop for SwrCache<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduler.take() {
            handle.abort();
        }
    }
}

fn spawn_scheduler<R: Revalidate>(shared: Weak<Shared<R>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(shared) = shared.upgrade() else {
                break;
            };
            tracing::debug!("scheduled cache revalidation");
            shared.spawn_refresh();
        }
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counting {
        calls: Arc<AtomicUsize>,
        delay: Duration,
        fail_after: Option<usize>,
    }

    impl Counting {
        fn new(calls: &Arc<AtomicUsize>) -> Self {
            Self {
                calls: Arc::clone(calls),
                delay: Duration::ZERO,
                fail_after: None,
            }
        }
    }

    #[async_trait]
    impl Revalidate for Counting {
        type Output = usize;
        type Error = String;

        async fn revalidate(&self, _previous: Option<&CachedResult<usize, String>>) -> Result<usize, String> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.fail_after {
                Some(limit) if n > limit => Err(format!("fetch {n} failed")),
                _ => Ok(n),
            }
        }
    }

    fn config(ttl: Duration) -> SwrCacheConfig {
        SwrCacheConfig {
            ttl,
            ..SwrCacheConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_first_reads_share_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = Counting::new(&calls);
        source.delay = Duration::from_millis(50);
        let cache = SwrCache::new(source, config(Duration::from_secs(60)));

        let reads = futures::future::join_all((0..10).map(|_| cache.read())).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for r in &reads {
            assert!(Arc::ptr_eq(r, &reads[0]));
            assert_eq!(r.value(), Some(&1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_value_is_served_without_refetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = SwrCache::new(Counting::new(&calls), config(Duration::from_secs(60)));

        cache.read().await;
        cache.read().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cache.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_value_is_served_then_refreshed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = SwrCache::new(Counting::new(&calls), config(Duration::from_secs(5)));

        assert_eq!(cache.read().await.value(), Some(&1));
        tokio::time::sleep(Duration::from_secs(6)).await;

        // stale value returned immediately
        assert_eq!(cache.read().await.value(), Some(&1));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek().unwrap().value(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn first_failure_is_cached_as_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = Counting::new(&calls);
        source.fail_after = Some(0);
        let cache = SwrCache::new(source, config(Duration::from_secs(60)));

        let first = cache.read().await;
        assert_eq!(first.result, Err("fetch 1 failed".to_string()));

        // held for the ttl like any value
        for _ in 0..5 {
            assert!(cache.read().await.result.is_err());
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(cache.read().await.result.is_err());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_waits_a_ttl_before_retrying() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = Counting::new(&calls);
        source.fail_after = Some(1);
        let cache = SwrCache::new(source, config(Duration::from_secs(5)));

        assert_eq!(cache.read().await.value(), Some(&1));
        tokio::time::sleep(Duration::from_secs(6)).await;

        cache.read().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        for _ in 0..5 {
            assert_eq!(cache.read().await.value(), Some(&1));
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        cache.read().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.peek().unwrap().value(), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_stale_reads_share_one_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = Counting::new(&calls);
        source.delay = Duration::from_millis(50);
        let cache = SwrCache::new(source, config(Duration::from_secs(5)));

        let seeded = cache.read().await;
        assert_eq!(seeded.value(), Some(&1));
        tokio::time::sleep(Duration::from_secs(6)).await;

        let reads = futures::future::join_all((0..10).map(|_| cache.read())).await;
        for r in &reads {
            assert!(Arc::ptr_eq(r, &seeded));
        }
        assert!(cache.is_refreshing());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek().unwrap().value(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = Counting::new(&calls);
        source.fail_after = Some(1);
        let cache = SwrCache::new(source, config(Duration::ZERO));

        assert_eq!(cache.read().await.value(), Some(&1));
        assert_eq!(cache.read().await.value(), Some(&1));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek().unwrap().value(), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn proactive_initialization_fetches_without_reads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = SwrCache::new(
            Counting::new(&calls),
            SwrCacheConfig {
                proactively_initialize: true,
                ..config(Duration::from_secs(60))
            },
        );

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek().unwrap().value(), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_refreshes_until_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = SwrCache::new(
            Counting::new(&calls),
            SwrCacheConfig {
                proactive_revalidation_interval: Some(Duration::from_secs(10)),
                ..config(Duration::from_secs(600))
            },
        );

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        drop(cache);
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn revalidator_sees_previous_value() {
        struct Increment;

        #[async_trait]
        impl Revalidate for Increment {
            type Output = u64;
            type Error = String;

            async fn revalidate(&self, previous: Option<&CachedResult<u64, String>>) -> Result<u64, String> {
                Ok(previous.and_then(|p| p.value().copied()).unwrap_or(0) + 1)
            }
        }

        let cache = SwrCache::new(Increment, config(Duration::ZERO));
        assert_eq!(cache.read().await.value(), Some(&1));
        cache.read().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(cache.peek().unwrap().value(), Some(&2));
    }

    #[tokio::test]
    async fn closure_revalidator() {
        let cache = SwrCache::new(
            from_fn(|| async { Ok::<_, String>("hello") }),
            SwrCacheConfig::default(),
        );
        assert_eq!(cache.read().await.value(), Some(&"hello"));
        assert!(cache.peek().is_some());
    }
}
