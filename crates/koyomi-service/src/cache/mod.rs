//! Per-feed cache with single-flight refresh and stale fallback.
//!
//! Each source moves through `Empty -> Fresh -> Stale -> Fresh`. A read inside
//! the TTL is served from memory. An expired read triggers one refresh that
//! every concurrent reader joins. A failed refresh keeps the previous
//! occurrences, marks them stale and holds off further attempts for the
//! failure backoff.

pub mod transport;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use koyomi_core::config::{FeedConfig, Settings};
use koyomi_core::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_FAILURE_BACKOFF_SECS, DEFAULT_FUTURE_DAYS, DEFAULT_PAST_DAYS,
};
use koyomi_rfc::rfc::ical::parse::ComponentParser;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::calendar::{CalendarFeed, ExpansionLimits, Occurrence, Window};
use crate::error::{ServiceError, ServiceResult};

pub use transport::{FeedTransport, HttpTransport, TransportError};

/// A remote feed, identified by name and URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl From<&FeedConfig> for FeedSource {
    fn from(config: &FeedConfig) -> Self {
        Self::new(config.name.clone(), config.url.clone())
    }
}

/// Timing and expansion parameters of a cache.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub ttl: Duration,
    /// Minimum delay between a failed refresh and the next attempt.
    pub failure_backoff: Duration,
    /// How far before now feeds are expanded. `None` is unbounded.
    pub past: Option<TimeDelta>,
    /// How far after now feeds are expanded. `None` is unbounded.
    pub future: Option<TimeDelta>,
    pub limits: ExpansionLimits,
}

impl CachePolicy {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            ttl: settings.cache.ttl(),
            failure_backoff: settings.cache.failure_backoff(),
            past: Some(TimeDelta::days(i64::from(settings.expansion.past_days))),
            future: Some(TimeDelta::days(i64::from(settings.expansion.future_days))),
            limits: ExpansionLimits::from(&settings.expansion),
        }
    }

    /// Expansion window for a refresh happening at `now`.
    #[must_use]
    pub fn horizon(&self, now: DateTime<Utc>) -> Window {
        Window::relative_to(now, self.past, self.future)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(u64::from(DEFAULT_CACHE_TTL_SECS)),
            failure_backoff: Duration::from_secs(u64::from(DEFAULT_FAILURE_BACKOFF_SECS)),
            past: Some(TimeDelta::days(i64::from(DEFAULT_PAST_DAYS))),
            future: Some(TimeDelta::days(i64::from(DEFAULT_FUTURE_DAYS))),
            limits: ExpansionLimits::default(),
        }
    }
}

/// Observable state of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing fetched yet.
    Empty,
    /// The last refresh succeeded. An expired entry stays `Fresh` until the
    /// next read refreshes it.
    Fresh,
    /// The last refresh failed and the previous occurrences are served.
    Stale,
}

/// What a read returns.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub occurrences: Arc<[Occurrence]>,
    /// The occurrences come from an earlier refresh than the last attempt.
    pub is_stale: bool,
    /// When the occurrences were fetched. `None` if nothing was ever fetched.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Failure of the refresh this read joined, reported once.
    pub error: Option<Arc<ServiceError>>,
}

type RefreshOutcome = Result<(), Arc<ServiceError>>;
type Refresh = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Debug, Clone)]
struct CacheEntry {
    occurrences: Arc<[Occurrence]>,
    fetched_at: DateTime<Utc>,
    refreshed_at: Instant,
}

#[derive(Default)]
struct SlotState {
    entry: Option<CacheEntry>,
    last_failure: Option<Instant>,
    invalidated: bool,
    inflight: Option<Refresh>,
}

impl SlotState {
    fn snapshot(&self, error: Option<Arc<ServiceError>>) -> FeedSnapshot {
        FeedSnapshot {
            occurrences: self
                .entry
                .as_ref()
                .map_or_else(|| Arc::from(Vec::<Occurrence>::new()), |entry| Arc::clone(&entry.occurrences)),
            is_stale: self.entry.is_some() && self.last_failure.is_some(),
            fetched_at: self.entry.as_ref().map(|entry| entry.fetched_at),
            error,
        }
    }

    fn needs_refresh(&self, policy: &CachePolicy, now: Instant) -> bool {
        if self.invalidated {
            return true;
        }
        if self
            .last_failure
            .is_some_and(|failed_at| now < failed_at + policy.failure_backoff)
        {
            return false;
        }
        self.entry
            .as_ref()
            .is_none_or(|entry| now >= entry.refreshed_at + policy.ttl)
    }

    fn record_success(&mut self, occurrences: Vec<Occurrence>) {
        self.entry = Some(CacheEntry {
            occurrences: Arc::from(occurrences),
            fetched_at: Utc::now(),
            refreshed_at: Instant::now(),
        });
        self.last_failure = None;
        self.invalidated = false;
        self.inflight = None;
    }

    fn record_failure(&mut self) {
        self.last_failure = Some(Instant::now());
        self.invalidated = false;
        self.inflight = None;
    }
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
}

/// Cache of expanded feeds, one slot per source.
pub struct FeedCache<T, P> {
    transport: Arc<T>,
    parser: Arc<P>,
    policy: CachePolicy,
    slots: Mutex<HashMap<FeedSource, Arc<Slot>>>,
}

impl<T, P> FeedCache<T, P>
where
    T: FeedTransport,
    P: ComponentParser + 'static,
{
    #[must_use]
    pub fn new(transport: Arc<T>, parser: Arc<P>, policy: CachePolicy) -> Self {
        Self {
            transport,
            parser,
            policy,
            slots: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    async fn slot(&self, source: &FeedSource) -> Arc<Slot> {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(source.clone()).or_default())
    }

    /// ## Summary
    /// Returns the occurrences of `source`, refreshing them when due.
    ///
    /// Concurrent callers share one refresh. The refresh runs on its own task,
    /// so it completes and updates the cache even if every caller goes away.
    /// Failures never discard cached occurrences; they are returned stale with
    /// the error attached for the callers that joined the failed refresh.
    #[tracing::instrument(skip(self, source), fields(feed = %source.name))]
    pub async fn get_cached_or_refresh(&self, source: &FeedSource) -> FeedSnapshot {
        let slot = self.slot(source).await;

        let refresh = {
            let mut state = slot.state.lock().await;
            if let Some(inflight) = &state.inflight {
                tracing::trace!("Joining in-flight refresh");
                inflight.clone()
            } else if state.needs_refresh(&self.policy, Instant::now()) {
                let refresh = self.spawn_refresh(source.clone(), Arc::clone(&slot));
                state.inflight = Some(refresh.clone());
                refresh
            } else {
                tracing::trace!("Serving cached feed");
                return state.snapshot(None);
            }
        };

        let outcome = refresh.await;
        let state = slot.state.lock().await;
        state.snapshot(outcome.err())
    }

    /// ## Summary
    /// Reads several sources concurrently, in input order.
    pub async fn get_all(&self, sources: &[FeedSource]) -> Vec<FeedSnapshot> {
        futures::future::join_all(
            sources
                .iter()
                .map(|source| self.get_cached_or_refresh(source)),
        )
        .await
    }

    /// Marks a source as expired so the next read refreshes it.
    pub async fn invalidate(&self, source: &FeedSource) {
        let slot = self.slot(source).await;
        slot.state.lock().await.invalidated = true;
        tracing::debug!(feed = %source.name, "Feed invalidated");
    }

    pub async fn state(&self, source: &FeedSource) -> CacheState {
        let slot = self.slot(source).await;
        let state = slot.state.lock().await;
        match &state.entry {
            None => CacheState::Empty,
            Some(_) if state.last_failure.is_some() => CacheState::Stale,
            Some(_) => CacheState::Fresh,
        }
    }

    fn spawn_refresh(&self, source: FeedSource, slot: Arc<Slot>) -> Refresh {
        let transport = Arc::clone(&self.transport);
        let parser = Arc::clone(&self.parser);
        let policy = self.policy.clone();
        let task_slot = Arc::clone(&slot);

        let handle = tokio::spawn(async move {
            let result = refresh_feed(transport.as_ref(), parser.as_ref(), &source, &policy).await;
            let mut state = task_slot.state.lock().await;
            match result {
                Ok(occurrences) => {
                    tracing::debug!(
                        feed = %source.name,
                        occurrences = occurrences.len(),
                        "Feed refreshed"
                    );
                    state.record_success(occurrences);
                    Ok(())
                }
                Err(err) => {
                    tracing::warn!(
                        feed = %source.name,
                        error = %err,
                        stale = state.entry.is_some(),
                        "Feed refresh failed"
                    );
                    state.record_failure();
                    Err(Arc::new(err))
                }
            }
        });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    let mut state = slot.state.lock().await;
                    state.record_failure();
                    Err(Arc::new(ServiceError::JoinError(join_err.to_string())))
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Fetches, parses and expands one feed.
async fn refresh_feed<T, P>(
    transport: &T,
    parser: &P,
    source: &FeedSource,
    policy: &CachePolicy,
) -> ServiceResult<Vec<Occurrence>>
where
    T: FeedTransport,
    P: ComponentParser,
{
    let body = transport.fetch(&source.url).await?;
    let calendar = parser.parse(&body)?;
    let feed = CalendarFeed::from_calendar(&calendar);
    let window = policy.horizon(Utc::now());

    Ok(feed.expand(&window, policy.limits))
}
