use crate::models::{
    hm, minutes_of_day, Conflict, ConflictKind, FastingContext, PrayerTimes, Severity, TimeRange,
    MINUTES_PER_DAY,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Conflict detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Midday window when shared meals make dosing awkward (default: 12:00-14:00)
    pub meal_traffic_window: TimeRange,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            meal_traffic_window: TimeRange::new(hm(12, 0), hm(14, 0)),
        }
    }
}

/// Classifies dose times against fasting hours, meal traffic and prayer buffers
pub struct ConflictDetector {
    config: DetectorConfig,
}

impl ConflictDetector {
    /// Create new detector with default configuration
    pub fn new() -> Self {
        ConflictDetector {
            config: DetectorConfig::default(),
        }
    }

    /// Create new detector with custom configuration
    pub fn with_config(config: DetectorConfig) -> Self {
        ConflictDetector { config }
    }

    /// Detect every conflict for every dose time.
    ///
    /// Dose times are processed in input order and the rules for one time are
    /// emitted in a fixed order: fasting hours, meal timing, then one entry per
    /// prayer whose buffer contains the time. Matches are neither merged nor
    /// ranked.
    pub fn detect(
        &self,
        dose_times: &[NaiveTime],
        prayer_times: &PrayerTimes,
        buffer_minutes: u32,
        fasting: Option<&FastingContext>,
    ) -> Vec<Conflict> {
        self.collect(dose_times, Some(prayer_times), buffer_minutes, fasting)
    }

    /// Fasting and meal-timing rules only, for days without prayer times
    pub fn detect_without_prayers(
        &self,
        dose_times: &[NaiveTime],
        fasting: Option<&FastingContext>,
    ) -> Vec<Conflict> {
        self.collect(dose_times, None, 0, fasting)
    }

    fn collect(
        &self,
        dose_times: &[NaiveTime],
        prayer_times: Option<&PrayerTimes>,
        buffer_minutes: u32,
        fasting: Option<&FastingContext>,
    ) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for &time in dose_times {
            if let Some(context) = fasting {
                if context.window.contains(time) {
                    conflicts.push(Conflict {
                        original_time: time,
                        kind: ConflictKind::FastingHours,
                        severity: Severity::High,
                        prayer: None,
                        suggestion: "Move this dose to suhoor (before dawn) or after iftar (sunset)"
                            .to_string(),
                    });
                }
            }

            if self.config.meal_traffic_window.contains(time) {
                conflicts.push(Conflict {
                    original_time: time,
                    kind: ConflictKind::MealTiming,
                    severity: Severity::Medium,
                    prayer: None,
                    suggestion: "Midday meal hours; confirm whether this dose should be taken with lunch"
                        .to_string(),
                });
            }

            let Some(prayer_times) = prayer_times else {
                continue;
            };

            for (prayer, instant) in prayer_times.iter() {
                if let Some(severity) = Self::prayer_severity(time, instant, buffer_minutes) {
                    conflicts.push(Conflict {
                        original_time: time,
                        kind: ConflictKind::PrayerTime,
                        severity,
                        prayer: Some(prayer),
                        suggestion: format!(
                            "Schedule at least {} minutes away from {} prayer",
                            buffer_minutes, prayer
                        ),
                    });
                }
            }
        }

        debug!(
            dose_times = dose_times.len(),
            conflicts = conflicts.len(),
            fasting = fasting.is_some(),
            prayer_times = prayer_times.is_some(),
            "Detected scheduling conflicts"
        );

        conflicts
    }

    /// Severity of a dose inside the closed `[instant - buffer, instant + buffer]` blackout.
    ///
    /// The inner half of the buffer, centred on the prayer instant, is `High`;
    /// the outer half is `Medium`. Outside the blackout returns `None`.
    pub fn prayer_severity(time: NaiveTime, instant: NaiveTime, buffer_minutes: u32) -> Option<Severity> {
        let buffer = i64::from(buffer_minutes);
        let mut offset = (minutes_of_day(time) - minutes_of_day(instant)).rem_euclid(MINUTES_PER_DAY);
        if offset > MINUTES_PER_DAY / 2 {
            offset -= MINUTES_PER_DAY;
        }

        if offset.abs() > buffer {
            return None;
        }

        if offset.abs() * 2 <= buffer {
            Some(Severity::High)
        } else {
            Some(Severity::Medium)
        }
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}
