//! Safe scheduling windows derived from the five daily prayers
//!
//! Every prayer instant `t` blacks out the closed interval
//! `[t - buffer, t + buffer]`. Overlapping or adjacent blackouts are merged
//! and the complement over one circular day becomes the list of scheduling
//! windows, including the overnight window from the last blackout to the next
//! dawn. Windows are half-open, so each starts one minute after a blackout
//! ends and stops at the next blackout start.
//!
//! Prayer times must be in chronological order (see
//! [`PrayerTimes::validate`]); an unordered day resolves to no windows.

use crate::models::{minutes_of_day, time_from_minutes, Prayer, PrayerTimes, SchedulingWindow, MINUTES_PER_DAY};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default margin around each prayer instant
pub const DEFAULT_BUFFER_MINUTES: u32 = 30;

/// Closed blackout interval around one prayer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blackout {
    pub prayer: Prayer,

    #[serde(with = "crate::models::hhmm")]
    pub start: NaiveTime,

    #[serde(with = "crate::models::hhmm")]
    pub end: NaiveTime,
}

/// Blackout group on a linear minute axis, both bounds inclusive; may leave `0..1440`
#[derive(Debug, Clone, Copy)]
struct Span {
    start: i64,
    end: i64,
    first: Prayer,
    last: Prayer,
}

/// Window resolution over one day of prayer times
pub struct WindowResolver;

impl WindowResolver {
    /// Per-prayer blackout intervals in prayer order, reduced to clock times
    pub fn blackouts(prayer_times: &PrayerTimes, buffer_minutes: u32) -> Vec<Blackout> {
        let buffer = i64::from(buffer_minutes);
        prayer_times
            .iter()
            .into_iter()
            .map(|(prayer, time)| {
                let at = minutes_of_day(time);
                Blackout {
                    prayer,
                    start: time_from_minutes(at - buffer),
                    end: time_from_minutes(at + buffer),
                }
            })
            .collect()
    }

    /// Resolve the sorted, disjoint scheduling windows for one day
    pub fn resolve(prayer_times: &PrayerTimes, buffer_minutes: u32) -> Vec<SchedulingWindow> {
        if let Err(err) = prayer_times.validate() {
            warn!(date = %prayer_times.date, error = %err, "Skipping window resolution");
            return Vec::new();
        }

        let spans = Self::merged_spans(prayer_times, i64::from(buffer_minutes));

        let mut windows = Vec::with_capacity(spans.len());
        for (index, span) in spans.iter().enumerate() {
            let (next_start, next_prayer) = match spans.get(index + 1) {
                Some(next) => (next.start, next.first),
                None => (spans[0].start + MINUTES_PER_DAY, spans[0].first),
            };

            let first_free = span.end + 1;

            // Buffer wider than the gap between prayers leaves nothing to schedule
            if next_start <= first_free {
                continue;
            }

            windows.push(SchedulingWindow {
                start: time_from_minutes(first_free),
                end: time_from_minutes(next_start),
                label: format!("After {}", span.last),
                description: format!(
                    "Between the {} and {} prayer buffers",
                    span.last, next_prayer
                ),
            });
        }

        windows.sort_by_key(|window| window.start);

        debug!(
            buffer_minutes,
            blackout_groups = spans.len(),
            windows = windows.len(),
            "Resolved scheduling windows"
        );

        windows
    }

    /// Build blackout spans on one linear axis anchored at Fajr and merge them.
    fn merged_spans(prayer_times: &PrayerTimes, buffer: i64) -> Vec<Span> {
        let mut merged: Vec<Span> = Vec::with_capacity(Prayer::ALL.len());
        let mut previous: Option<i64> = None;

        for (prayer, time) in prayer_times.iter() {
            // Unwrap prayers that fall after midnight (late Isha) onto the same day axis
            let mut at = minutes_of_day(time);
            if let Some(prev) = previous {
                while at < prev {
                    at += MINUTES_PER_DAY;
                }
            }
            previous = Some(at);

            let span = Span {
                start: at - buffer,
                end: at + buffer,
                first: prayer,
                last: prayer,
            };

            match merged.last_mut() {
                Some(current) if span.start <= current.end + 1 => {
                    current.end = current.end.max(span.end);
                    current.last = prayer;
                }
                _ => merged.push(span),
            }
        }

        // Fold tail groups that reach into the next day's first blackout
        while merged.len() > 1 {
            let wrap_point = merged[0].start + MINUTES_PER_DAY;
            let tail = merged[merged.len() - 1];
            if tail.end + 1 < wrap_point {
                break;
            }
            merged.pop();

            let front = &mut merged[0];
            front.start = front.start.min(tail.start - MINUTES_PER_DAY);
            front.end = front.end.max(tail.end - MINUTES_PER_DAY);
            front.first = tail.first;

            while merged.len() > 1 && merged[0].end + 1 >= merged[1].start {
                let next = merged.remove(1);
                merged[0].end = merged[0].end.max(next.end);
                merged[0].last = next.last;
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::hm;
    use chrono::NaiveDate;

    fn sample_times() -> PrayerTimes {
        PrayerTimes {
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            location: Default::default(),
            fajr: hm(5, 0),
            dhuhr: hm(13, 15),
            asr: hm(16, 30),
            maghrib: hm(19, 0),
            isha: hm(20, 30),
            qibla_direction: 58.5,
        }
    }

    #[test]
    fn test_default_buffer_windows() {
        let windows = WindowResolver::resolve(&sample_times(), DEFAULT_BUFFER_MINUTES);

        let bounds: Vec<(NaiveTime, NaiveTime)> =
            windows.iter().map(|w| (w.start, w.end)).collect();
        assert_eq!(
            bounds,
            vec![
                (hm(5, 31), hm(12, 45)),
                (hm(13, 46), hm(16, 0)),
                (hm(17, 1), hm(18, 30)),
                (hm(19, 31), hm(20, 0)),
                (hm(21, 1), hm(4, 30)),
            ]
        );
        assert_eq!(windows[0].label, "After Fajr");
        assert_eq!(windows[4].label, "After Isha");
        assert!(windows[4].description.contains("Fajr"));
    }

    #[test]
    fn test_wide_buffer_merges_and_drops() {
        // 45 minutes swallows the 90 minute Maghrib-Isha gap entirely
        let windows = WindowResolver::resolve(&sample_times(), 45);

        assert_eq!(windows.len(), 4);
        let evening = windows.iter().find(|w| w.label == "After Isha").unwrap();
        assert_eq!(evening.start, hm(21, 16));
        assert!(evening.description.contains("Fajr"));
        assert!(windows.iter().all(|w| w.label != "After Maghrib"));
    }

    #[test]
    fn test_buffer_covering_whole_day_yields_nothing() {
        let windows = WindowResolver::resolve(&sample_times(), 12 * 60);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_late_isha_after_midnight() {
        let mut times = sample_times();
        times.maghrib = hm(22, 10);
        times.isha = hm(0, 20);

        let windows = WindowResolver::resolve(&times, 30);
        let overnight = windows.iter().find(|w| w.label == "After Isha").unwrap();
        assert_eq!(overnight.start, hm(0, 51));
        assert_eq!(overnight.end, hm(4, 30));
        // Sorted by clock start, so the overnight window now comes first
        assert_eq!(windows[0].label, "After Isha");
    }

    #[test]
    fn test_no_window_touches_blackout() {
        let times = sample_times();
        let windows = WindowResolver::resolve(&times, 30);
        for (_, instant) in times.iter() {
            for offset in -30..=30 {
                let t = crate::models::shift_minutes(instant, offset);
                assert!(windows.iter().all(|w| !w.contains(t)), "{} inside a window", t);
            }
        }
    }

    #[test]
    fn test_blackout_bounds() {
        let blackouts = WindowResolver::blackouts(&sample_times(), 30);
        assert_eq!(blackouts[1].prayer, Prayer::Dhuhr);
        assert_eq!(blackouts[1].start, hm(12, 45));
        assert_eq!(blackouts[1].end, hm(13, 45));
    }

    #[test]
    fn test_adjacent_blackouts_merge() {
        // Dhuhr blackout ends 13:45, Asr blackout starts 13:46: no free minute between
        let mut times = sample_times();
        times.asr = hm(14, 16);

        let windows = WindowResolver::resolve(&times, 30);
        assert!(windows.iter().all(|w| w.label != "After Dhuhr"));
        let afternoon = windows.iter().find(|w| w.label == "After Asr").unwrap();
        assert_eq!(afternoon.start, hm(14, 47));
        assert!(afternoon.description.contains("Maghrib"));
    }

    #[test]
    fn test_one_free_minute_between_blackouts() {
        let mut times = sample_times();
        times.asr = hm(14, 17);

        let windows = WindowResolver::resolve(&times, 30);
        let gap = windows.iter().find(|w| w.label == "After Dhuhr").unwrap();
        assert_eq!((gap.start, gap.end), (hm(13, 46), hm(13, 47)));
        assert_eq!(gap.duration_minutes(), 1);
    }

    #[test]
    fn test_unordered_prayer_times_yield_nothing() {
        let mut times = sample_times();
        times.asr = hm(12, 0);

        assert!(WindowResolver::resolve(&times, 30).is_empty());
        assert!(WindowResolver::resolve(&times, 0).is_empty());
    }
}
