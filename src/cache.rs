//! Calendar cache for prayer times and fasting periods
//!
//! Entries live for a configurable TTL and can be invalidated explicitly,
//! per key, wholesale, or by rolling over to a new local day. Concurrent
//! lookups of a missing key share a single upstream fetch; a failed fetch is
//! not cached, so the next caller tries again.

use crate::error::UpstreamError;
use crate::models::{CalculationMethod, FastingPeriod, Location, LocationKey, PrayerTimes};
use chrono::NaiveDate;
use moka::future::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache sizing and lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in hours (default: 24)
    pub ttl_hours: u64,

    /// Maximum entries per cache (default: 256)
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_hours: 24,
            max_capacity: 256,
        }
    }
}

/// Prayer times are scoped to one date, location and calculation method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrayerKey {
    pub date: NaiveDate,
    pub location: LocationKey,
    pub method: CalculationMethod,
}

impl PrayerKey {
    pub fn new(location: &Location, date: NaiveDate, method: CalculationMethod) -> Self {
        Self {
            date,
            location: location.cache_key(),
            method,
        }
    }
}

/// In-memory TTL cache shared by the adapter
#[derive(Clone)]
pub struct CalendarCache {
    prayer_times: MokaCache<PrayerKey, Arc<PrayerTimes>>,
    fasting: MokaCache<NaiveDate, Option<FastingPeriod>>,
}

impl CalendarCache {
    pub fn new(config: &CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_hours.saturating_mul(3600));

        Self {
            prayer_times: MokaCache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(ttl)
                .build(),
            fasting: MokaCache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached prayer times, running `fetch` once per key when absent
    pub async fn prayer_times_or_fetch<F>(&self, key: PrayerKey, fetch: F) -> Result<Arc<PrayerTimes>, UpstreamError>
    where
        F: Future<Output = Result<PrayerTimes, UpstreamError>> + Send,
    {
        self.prayer_times
            .try_get_with(key, async move { fetch.await.map(Arc::new) })
            .await
            .map_err(|err: Arc<UpstreamError>| (*err).clone())
    }

    /// Cached fasting period lookup; "no active period" is cached too
    pub async fn fasting_or_fetch<F>(&self, date: NaiveDate, fetch: F) -> Result<Option<FastingPeriod>, UpstreamError>
    where
        F: Future<Output = Result<Option<FastingPeriod>, UpstreamError>> + Send,
    {
        self.fasting
            .try_get_with(date, fetch)
            .await
            .map_err(|err: Arc<UpstreamError>| (*err).clone())
    }

    pub fn contains_prayer_times(&self, key: &PrayerKey) -> bool {
        self.prayer_times.contains_key(key)
    }

    pub fn contains_fasting(&self, date: NaiveDate) -> bool {
        self.fasting.contains_key(&date)
    }

    pub async fn invalidate_prayer_times(&self, key: &PrayerKey) {
        self.prayer_times.invalidate(key).await;
    }

    pub async fn invalidate_fasting(&self, date: NaiveDate) {
        self.fasting.invalidate(&date).await;
    }

    pub async fn invalidate_all(&self) {
        self.prayer_times.invalidate_all();
        self.fasting.invalidate_all();
        self.prayer_times.run_pending_tasks().await;
        self.fasting.run_pending_tasks().await;
        debug!("Calendar cache cleared");
    }

    /// Drop every entry dated before `today` (local midnight rollover)
    pub async fn roll_over(&self, today: NaiveDate) -> usize {
        let stale_prayers: Vec<PrayerKey> = self
            .prayer_times
            .iter()
            .filter(|(key, _)| key.date < today)
            .map(|(key, _)| (*key).clone())
            .collect();
        let stale_fasting: Vec<NaiveDate> = self
            .fasting
            .iter()
            .map(|(date, _)| *date)
            .filter(|date| *date < today)
            .collect();

        for key in &stale_prayers {
            self.prayer_times.invalidate(key).await;
        }
        for date in &stale_fasting {
            self.fasting.invalidate(date).await;
        }

        let dropped = stale_prayers.len() + stale_fasting.len();
        debug!(%today, dropped, "Calendar cache rolled over");
        dropped
    }
}
