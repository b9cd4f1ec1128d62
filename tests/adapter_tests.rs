use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use dosewise::{
    AdapterConfig, AdjustmentWindow, CacheConfig, CalculationMethod, CalendarCache, DayRequest, Degradation,
    FastingPeriod, FestivalEvent, FestivalProvider, FestivalType, Location, MealRelation,
    MedicationScheduleEntry, PrayerKey, PrayerTimeProvider, PrayerTimes, SchedulingAdapter, SchedulingEngine,
    StaticFestivalCalendar, UpstreamError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Adapter behaviour against fake upstream providers

fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

fn mecca() -> Location {
    Location::new(21.4225, 39.8262, "Asia/Riyadh")
}

/// Prayer provider that counts calls and can be slowed down or failed
#[derive(Default)]
struct FakePrayerProvider {
    calls: AtomicUsize,
    delay_ms: u64,
    failing: AtomicBool,
    unordered: AtomicBool,
}

impl FakePrayerProvider {
    fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrayerTimeProvider for FakePrayerProvider {
    fn name(&self) -> &str {
        "fake prayer provider"
    }

    async fn calculate(
        &self,
        location: &Location,
        date: NaiveDate,
        _method: CalculationMethod,
    ) -> Result<PrayerTimes, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(UpstreamError::unavailable(self.name(), "service down"));
        }

        let asr = if self.unordered.load(Ordering::SeqCst) {
            t(12, 0)
        } else {
            t(16, 30)
        };

        Ok(PrayerTimes {
            date,
            location: location.clone(),
            fajr: t(5, 0),
            dhuhr: t(13, 15),
            asr,
            maghrib: t(19, 0),
            isha: t(20, 30),
            qibla_direction: 0.0,
        })
    }
}

/// Festival provider that always fails
struct BrokenCalendar;

#[async_trait]
impl FestivalProvider for BrokenCalendar {
    async fn active_fasting_period(&self, _date: NaiveDate) -> Result<Option<FastingPeriod>, UpstreamError> {
        Err(UpstreamError::unavailable("festival calendar", "connection refused"))
    }

    async fn upcoming(&self, _from: NaiveDate, _days_ahead: u32) -> Result<Vec<FestivalEvent>, UpstreamError> {
        Err(UpstreamError::unavailable("festival calendar", "connection refused"))
    }
}

fn ramadan_calendar() -> StaticFestivalCalendar {
    StaticFestivalCalendar::new(
        vec![FastingPeriod::ramadan(date(3, 1), date(3, 30))],
        vec![FestivalEvent {
            name: "Eid al-Fitr".to_string(),
            date: date(3, 31),
            end_date: Some(date(4, 2)),
            festival_type: FestivalType::Religious,
            is_fasting: false,
            tradition: Some("Islamic".to_string()),
        }],
    )
}

fn adapter_with(
    prayers: Arc<FakePrayerProvider>,
    festivals: Arc<dyn FestivalProvider>,
    fetch_timeout_ms: u64,
) -> SchedulingAdapter {
    let config = AdapterConfig {
        fetch_timeout_ms,
        cache: CacheConfig::default(),
    };
    SchedulingAdapter::new(
        Arc::new(SchedulingEngine::new()),
        prayers,
        festivals,
        CalendarCache::new(&config.cache),
        config,
    )
}

fn metformin() -> MedicationScheduleEntry {
    MedicationScheduleEntry {
        id: "med-1".to_string(),
        name: "Metformin".to_string(),
        dose_times: vec![t(8, 0), t(13, 0)],
        meal_relation: MealRelation::WithFood,
    }
}

fn request(day: NaiveDate) -> DayRequest {
    DayRequest {
        location: mecca(),
        date: day,
        method: CalculationMethod::UmmAlQura,
    }
}

#[tokio::test]
async fn test_evaluate_during_ramadan() {
    let prayers = Arc::new(FakePrayerProvider::default());
    let adapter = adapter_with(Arc::clone(&prayers), Arc::new(ramadan_calendar()), 1000);

    let evaluation = adapter.evaluate(&[metformin()], &request(date(3, 10))).await;

    assert!(!evaluation.is_degraded());
    assert_eq!(evaluation.windows.len(), 5);
    assert_eq!(evaluation.fasting_period.as_ref().map(|p| p.name.as_str()), Some("Ramadan"));

    let analysis = &evaluation.analyses[0];
    assert!(analysis.phase.is_active);
    // 08:00 fasting; 13:00 fasting, meal traffic and dhuhr
    assert_eq!(analysis.conflicts.len(), 4);
    assert_eq!(analysis.adjustments.len(), 4);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() {
    let prayers = Arc::new(FakePrayerProvider::with_delay(50));
    let adapter = adapter_with(Arc::clone(&prayers), Arc::new(ramadan_calendar()), 1000);
    let location = mecca();

    let (a, b, c) = tokio::join!(
        adapter.prayer_times(&location, date(3, 10), CalculationMethod::UmmAlQura),
        adapter.prayer_times(&location, date(3, 10), CalculationMethod::UmmAlQura),
        adapter.prayer_times(&location, date(3, 10), CalculationMethod::UmmAlQura),
    );

    assert_eq!(prayers.calls(), 1);
    assert_eq!(a.unwrap().dhuhr, t(13, 15));
    assert!(Arc::ptr_eq(&b.unwrap(), &c.unwrap()));
}

#[tokio::test]
async fn test_cached_until_invalidated() {
    let prayers = Arc::new(FakePrayerProvider::default());
    let adapter = adapter_with(Arc::clone(&prayers), Arc::new(ramadan_calendar()), 1000);
    let location = mecca();

    adapter
        .prayer_times(&location, date(3, 10), CalculationMethod::UmmAlQura)
        .await
        .unwrap();
    adapter
        .prayer_times(&location, date(3, 10), CalculationMethod::UmmAlQura)
        .await
        .unwrap();
    assert_eq!(prayers.calls(), 1);

    // A different method is a different key
    adapter
        .prayer_times(&location, date(3, 10), CalculationMethod::Isna)
        .await
        .unwrap();
    assert_eq!(prayers.calls(), 2);

    let key = PrayerKey::new(&location, date(3, 10), CalculationMethod::UmmAlQura);
    adapter.cache().invalidate_prayer_times(&key).await;
    adapter
        .prayer_times(&location, date(3, 10), CalculationMethod::UmmAlQura)
        .await
        .unwrap();
    assert_eq!(prayers.calls(), 3);

    adapter.cache().invalidate_all().await;
    adapter
        .prayer_times(&location, date(3, 10), CalculationMethod::Isna)
        .await
        .unwrap();
    assert_eq!(prayers.calls(), 4);
}

#[tokio::test]
async fn test_timeout_falls_back_to_neutral_result() {
    let prayers = Arc::new(FakePrayerProvider::with_delay(500));
    let adapter = adapter_with(Arc::clone(&prayers), Arc::new(ramadan_calendar()), 20);

    let evaluation = adapter.evaluate(&[metformin()], &request(date(3, 10))).await;

    assert!(evaluation.is_degraded());
    assert!(evaluation.windows.is_empty());
    assert!(matches!(
        evaluation.degradations.as_slice(),
        [Degradation::PrayerTimesUnavailable { .. }]
    ));
    assert!(evaluation.analyses[0].conflicts.is_empty());
    // The fasting calendar still answered
    assert!(evaluation.analyses[0].phase.is_active);
}

#[tokio::test]
async fn test_failed_fetch_is_retried() {
    let prayers = Arc::new(FakePrayerProvider::default());
    prayers.failing.store(true, Ordering::SeqCst);
    let adapter = adapter_with(Arc::clone(&prayers), Arc::new(ramadan_calendar()), 1000);
    let location = mecca();

    let err = adapter
        .prayer_times(&location, date(3, 10), CalculationMethod::UmmAlQura)
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Unavailable { .. }));

    prayers.failing.store(false, Ordering::SeqCst);
    let times = adapter
        .prayer_times(&location, date(3, 10), CalculationMethod::UmmAlQura)
        .await
        .unwrap();
    assert_eq!(times.fajr, t(5, 0));
    assert_eq!(prayers.calls(), 2);
}

#[tokio::test]
async fn test_broken_calendar_leaves_doses_unchanged() {
    let prayers = Arc::new(FakePrayerProvider::default());
    let adapter = adapter_with(Arc::clone(&prayers), Arc::new(BrokenCalendar), 1000);

    let evaluation = adapter.evaluate(&[metformin()], &request(date(3, 10))).await;

    assert!(matches!(
        evaluation.degradations.as_slice(),
        [Degradation::FastingCalendarUnavailable { .. }]
    ));
    assert!(evaluation.fasting_period.is_none());

    let analysis = &evaluation.analyses[0];
    assert!(!analysis.phase.is_active);
    assert!(analysis.adjustments.iter().all(|a| a.window == AdjustmentWindow::Normal));
    assert_eq!(analysis.adjustments[0].time, t(8, 0));
    // Prayer conflicts are still reported
    assert!(!analysis.conflicts.is_empty());

    let festivals = adapter.upcoming_festivals(date(3, 10), 30).await;
    assert!(festivals.value.is_empty());
    assert!(matches!(
        festivals.degradation,
        Some(Degradation::FestivalListUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_upcoming_festivals() {
    let prayers = Arc::new(FakePrayerProvider::default());
    let adapter = adapter_with(prayers, Arc::new(ramadan_calendar()), 1000);

    let festivals = adapter.upcoming_festivals(date(3, 20), 14).await;
    assert!(festivals.degradation.is_none());
    assert_eq!(festivals.value.len(), 1);
    assert_eq!(festivals.value[0].name, "Eid al-Fitr");
}

#[tokio::test]
async fn test_roll_over_forces_fresh_day() {
    let prayers = Arc::new(FakePrayerProvider::default());
    let adapter = adapter_with(Arc::clone(&prayers), Arc::new(ramadan_calendar()), 1000);

    adapter.evaluate(&[metformin()], &request(date(3, 10))).await;
    adapter.evaluate(&[metformin()], &request(date(3, 11))).await;
    assert_eq!(prayers.calls(), 2);

    // Two days of prayer times and fasting lookups; only 03-10 is stale
    let dropped = adapter.cache().roll_over(date(3, 11)).await;
    assert_eq!(dropped, 2);
    assert!(!adapter.cache().contains_fasting(date(3, 10)));
    assert!(adapter.cache().contains_fasting(date(3, 11)));
}

#[tokio::test]
async fn test_unordered_prayer_times_are_rejected() {
    let prayers = Arc::new(FakePrayerProvider::default());
    prayers.unordered.store(true, Ordering::SeqCst);
    let adapter = adapter_with(Arc::clone(&prayers), Arc::new(ramadan_calendar()), 1000);

    let evaluation = adapter.evaluate(&[metformin()], &request(date(3, 10))).await;

    assert!(evaluation.windows.is_empty());
    match evaluation.degradations.as_slice() {
        [Degradation::PrayerTimesUnavailable { reason }] => {
            assert!(reason.contains("returned unusable data"), "{}", reason)
        }
        other => panic!("unexpected degradations: {:?}", other),
    }
    assert!(evaluation.analyses[0].conflicts.is_empty());

    let key = PrayerKey::new(&mecca(), date(3, 10), CalculationMethod::UmmAlQura);
    assert!(!adapter.cache().contains_prayer_times(&key));

    // Corrected upstream data is picked up on the next request
    prayers.unordered.store(false, Ordering::SeqCst);
    let evaluation = adapter.evaluate(&[metformin()], &request(date(3, 10))).await;
    assert!(!evaluation.is_degraded());
    assert_eq!(prayers.calls(), 2);
}
