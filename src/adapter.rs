//! Stateful adapter between upstream calendar providers and the engine
//!
//! Fetches prayer times and fasting periods through the injected providers,
//! caches them, bounds every fetch with a timeout and turns upstream failures
//! into neutral results flagged with a [`Degradation`]. The engine itself stays
//! synchronous and stateless.

use crate::cache::{CacheConfig, CalendarCache, PrayerKey};
use crate::engine::{MedicationAnalysis, SchedulingEngine};
use crate::error::{DoseWiseError, ErrorSeverity, UpstreamError};
use crate::models::{
    CalculationMethod, FastingPeriod, FestivalEvent, Location, MedicationScheduleEntry, PrayerTimes,
    SchedulingWindow,
};
use crate::providers::{FestivalProvider, PrayerTimeProvider};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Adapter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Upper bound for a single upstream fetch (default: 5000ms)
    pub fetch_timeout_ms: u64,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            fetch_timeout_ms: 5000,
            cache: CacheConfig::default(),
        }
    }
}

/// Which upstream input was replaced by a neutral value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// No windows and no conflicts were computed
    PrayerTimesUnavailable { reason: String },
    /// Dose times left unchanged and phase reported inactive
    FastingCalendarUnavailable { reason: String },
    /// Upcoming festival list replaced by an empty list
    FestivalListUnavailable { reason: String },
}

/// A value that may have been substituted after an upstream failure
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub degradation: Option<Degradation>,
}

/// Which day and place to evaluate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRequest {
    pub location: Location,
    pub date: NaiveDate,
    #[serde(default)]
    pub method: CalculationMethod,
}

/// Engine output for a set of medications on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEvaluation {
    pub date: NaiveDate,
    pub windows: Vec<SchedulingWindow>,
    pub fasting_period: Option<FastingPeriod>,
    pub analyses: Vec<MedicationAnalysis>,
    pub degradations: Vec<Degradation>,
}

impl DayEvaluation {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Caching, timeout-bounded front for the scheduling engine
pub struct SchedulingAdapter {
    engine: Arc<SchedulingEngine>,
    prayer_provider: Arc<dyn PrayerTimeProvider>,
    festival_provider: Arc<dyn FestivalProvider>,
    cache: CalendarCache,
    config: AdapterConfig,
}

impl SchedulingAdapter {
    pub fn new(
        engine: Arc<SchedulingEngine>,
        prayer_provider: Arc<dyn PrayerTimeProvider>,
        festival_provider: Arc<dyn FestivalProvider>,
        cache: CalendarCache,
        config: AdapterConfig,
    ) -> Self {
        Self {
            engine,
            prayer_provider,
            festival_provider,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &CalendarCache {
        &self.cache
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.engine
    }

    /// Prayer times for a day, fetched at most once per key while cached.
    ///
    /// Times that are not chronological are rejected as invalid upstream data.
    pub async fn prayer_times(
        &self,
        location: &Location,
        date: NaiveDate,
        method: CalculationMethod,
    ) -> Result<Arc<PrayerTimes>, UpstreamError> {
        let key = PrayerKey::new(location, date, method);
        let provider = Arc::clone(&self.prayer_provider);
        let location = location.clone();
        let timeout_ms = self.config.fetch_timeout_ms;

        self.cache
            .prayer_times_or_fetch(key, async move {
                let source_name = provider.name().to_string();
                let times = with_timeout(
                    source_name.clone(),
                    timeout_ms,
                    provider.calculate(&location, date, method),
                )
                .await?;
                times.validate().map_err(|err| UpstreamError::InvalidData {
                    source_name,
                    reason: err.to_string(),
                })?;
                Ok(times)
            })
            .await
    }

    /// Fasting period active on `date`, fetched at most once per date while cached
    pub async fn fasting_period(&self, date: NaiveDate) -> Result<Option<FastingPeriod>, UpstreamError> {
        let provider = Arc::clone(&self.festival_provider);
        let timeout_ms = self.config.fetch_timeout_ms;

        self.cache
            .fasting_or_fetch(date, async move {
                let source_name = provider.name().to_string();
                with_timeout(source_name, timeout_ms, provider.active_fasting_period(date)).await
            })
            .await
    }

    /// Upcoming festivals; not cached, empty list on failure
    pub async fn upcoming_festivals(&self, from: NaiveDate, days_ahead: u32) -> Fetched<Vec<FestivalEvent>> {
        let source_name = self.festival_provider.name().to_string();
        let result = with_timeout(
            source_name,
            self.config.fetch_timeout_ms,
            self.festival_provider.upcoming(from, days_ahead),
        )
        .await;

        match result {
            Ok(events) => Fetched {
                value: events,
                degradation: None,
            },
            Err(err) => Fetched {
                value: Vec::new(),
                degradation: Some(Degradation::FestivalListUnavailable {
                    reason: report_upstream(err, from, "Festival list"),
                }),
            },
        }
    }

    /// Evaluate validated medications for one day.
    ///
    /// Without prayer times the day has no windows and no conflicts. Without
    /// the fasting calendar the day is treated as non-fasting, so dose times
    /// stay unchanged and the phase is inactive.
    pub async fn evaluate(&self, entries: &[MedicationScheduleEntry], request: &DayRequest) -> DayEvaluation {
        let (prayer_result, fasting_result) = tokio::join!(
            self.prayer_times(&request.location, request.date, request.method),
            self.fasting_period(request.date),
        );

        let mut degradations = Vec::new();

        let prayer_times = match prayer_result {
            Ok(times) => Some(times),
            Err(err) => {
                degradations.push(Degradation::PrayerTimesUnavailable {
                    reason: report_upstream(err, request.date, "Prayer times"),
                });
                None
            }
        };

        let fasting_period = match fasting_result {
            Ok(period) => period,
            Err(err) => {
                degradations.push(Degradation::FastingCalendarUnavailable {
                    reason: report_upstream(err, request.date, "Fasting calendar"),
                });
                None
            }
        };

        let buffer_minutes = self.engine.config().buffer_minutes;
        let windows = prayer_times
            .as_deref()
            .map(|times| self.engine.resolve_windows(times, buffer_minutes))
            .unwrap_or_default();

        let analyses = entries
            .iter()
            .map(|entry| {
                let mut analysis = self.engine.analyze(
                    entry,
                    prayer_times.as_deref(),
                    fasting_period.as_ref(),
                    request.date,
                );
                if prayer_times.is_none() {
                    analysis.conflicts.clear();
                }
                analysis
            })
            .collect();

        info!(
            date = %request.date,
            medications = entries.len(),
            windows = windows.len(),
            fasting = fasting_period.is_some(),
            degraded = !degradations.is_empty(),
            "Evaluated medication schedules"
        );

        DayEvaluation {
            date: request.date,
            windows,
            fasting_period,
            analyses,
            degradations,
        }
    }
}

/// Log an upstream failure at its severity and return the user-facing notice
fn report_upstream(err: UpstreamError, date: NaiveDate, what: &str) -> String {
    let err = DoseWiseError::from(err);
    match err.severity() {
        ErrorSeverity::Warning => warn!(
            %date,
            error = %err,
            retryable = err.is_retryable(),
            "{} failed, using neutral result",
            what
        ),
        ErrorSeverity::Error | ErrorSeverity::Critical => error!(
            %date,
            error = %err,
            retryable = err.is_retryable(),
            "{} failed, using neutral result",
            what
        ),
    }
    err.user_message()
}

async fn with_timeout<T, F>(source_name: String, timeout_ms: u64, fetch: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fetch).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout {
            source_name,
            after_ms: timeout_ms,
        }),
    }
}
