//! Upstream data sources consumed by the adapter
//!
//! Prayer-time calculation and festival calendar lookup live outside this
//! crate. They are injected into [`crate::adapter::SchedulingAdapter`] as trait
//! objects so tests can substitute deterministic fakes.

use crate::error::UpstreamError;
use crate::models::{CalculationMethod, FastingPeriod, FestivalEvent, Location, PrayerTimes};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Computes the five daily prayer instants for a location and date
#[async_trait]
pub trait PrayerTimeProvider: Send + Sync {
    /// Name used in logs and degradation notices
    fn name(&self) -> &str {
        "prayer time provider"
    }

    async fn calculate(
        &self,
        location: &Location,
        date: NaiveDate,
        method: CalculationMethod,
    ) -> Result<PrayerTimes, UpstreamError>;
}

/// Looks up fasting periods and festivals
#[async_trait]
pub trait FestivalProvider: Send + Sync {
    /// Name used in logs and degradation notices
    fn name(&self) -> &str {
        "festival calendar"
    }

    /// The fasting period covering `date`, if any
    async fn active_fasting_period(&self, date: NaiveDate) -> Result<Option<FastingPeriod>, UpstreamError>;

    /// Festivals starting within `days_ahead` days of `from`
    async fn upcoming(&self, from: NaiveDate, days_ahead: u32) -> Result<Vec<FestivalEvent>, UpstreamError>;
}

/// Festival provider backed by an in-memory list of fasting periods and events
#[derive(Debug, Clone, Default)]
pub struct StaticFestivalCalendar {
    periods: Vec<FastingPeriod>,
    events: Vec<FestivalEvent>,
}

impl StaticFestivalCalendar {
    pub fn new(periods: Vec<FastingPeriod>, events: Vec<FestivalEvent>) -> Self {
        Self { periods, events }
    }
}

#[async_trait]
impl FestivalProvider for StaticFestivalCalendar {
    fn name(&self) -> &str {
        "static festival calendar"
    }

    async fn active_fasting_period(&self, date: NaiveDate) -> Result<Option<FastingPeriod>, UpstreamError> {
        Ok(self.periods.iter().find(|p| p.covers(date)).cloned())
    }

    async fn upcoming(&self, from: NaiveDate, days_ahead: u32) -> Result<Vec<FestivalEvent>, UpstreamError> {
        let until = from + chrono::Duration::days(i64::from(days_ahead));
        let mut events: Vec<FestivalEvent> = self
            .events
            .iter()
            .filter(|e| e.date >= from && e.date <= until)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }
}
