use crate::error::ValidationError;
use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes in one calendar day
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes elapsed since midnight (seconds are ignored)
pub fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Build a time of day from a minute offset, wrapping around midnight
pub fn time_from_minutes(minutes: i64) -> NaiveTime {
    NaiveTime::default() + Duration::minutes(minutes.rem_euclid(MINUTES_PER_DAY))
}

/// Shift a time of day by a signed number of minutes, wrapping around midnight
pub fn shift_minutes(time: NaiveTime, delta: i64) -> NaiveTime {
    time_from_minutes(minutes_of_day(time) + delta)
}

/// Shortest distance in minutes between two times on the 24h clock
pub fn circular_distance(a: NaiveTime, b: NaiveTime) -> i64 {
    let diff = (minutes_of_day(a) - minutes_of_day(b)).rem_euclid(MINUTES_PER_DAY);
    diff.min(MINUTES_PER_DAY - diff)
}

/// Parse a strict `HH:MM` 24-hour time string
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    let digit = |b: u8| if b.is_ascii_digit() { Some(u32::from(b - b'0')) } else { None };
    let hour = digit(bytes[0])? * 10 + digit(bytes[1])?;
    let minute = digit(bytes[3])? * 10 + digit(bytes[4])?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Format a time of day as `HH:MM`
pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Serde adapter for `HH:MM` time strings
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_hhmm(*time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw)
            .ok_or_else(|| D::Error::custom(format!("expected HH:MM time, got {:?}", raw)))
    }
}

/// Serde adapter for lists of `HH:MM` time strings
pub mod hhmm_list {
    use chrono::NaiveTime;
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(times: &[NaiveTime], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(times.len()))?;
        for time in times {
            seq.serialize_element(&super::format_hhmm(*time))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|value| {
                super::parse_hhmm(value)
                    .ok_or_else(|| D::Error::custom(format!("expected HH:MM time, got {:?}", value)))
            })
            .collect()
    }
}

/// The five daily prayers, in the order they occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prayer {
    /// Dawn
    Fajr,
    /// Midday
    Dhuhr,
    /// Afternoon
    Asr,
    /// Sunset
    Maghrib,
    /// Night
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geographic location the prayer times were computed for
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,

    /// Longitude in decimal degrees
    pub longitude: f64,

    /// IANA timezone name
    #[serde(default)]
    pub timezone: String,
}

/// Hashable identity of a location, rounded to micro-degrees
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey {
    pub latitude_micro: i64,
    pub longitude_micro: i64,
    pub timezone: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, timezone: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            timezone: timezone.into(),
        }
    }

    pub fn cache_key(&self) -> LocationKey {
        LocationKey {
            latitude_micro: (self.latitude * 1_000_000.0).round() as i64,
            longitude_micro: (self.longitude * 1_000_000.0).round() as i64,
            timezone: self.timezone.clone(),
        }
    }
}

/// Prayer-time calculation convention used by the upstream provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    #[default]
    MuslimWorldLeague,
    Isna,
    Egypt,
    UmmAlQura,
    Karachi,
    Tehran,
}

/// Five daily prayer instants for one date and location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerTimes {
    /// Calendar date these times apply to
    pub date: NaiveDate,

    /// Location the times were computed for
    #[serde(default)]
    pub location: Location,

    #[serde(with = "hhmm")]
    pub fajr: NaiveTime,

    #[serde(with = "hhmm")]
    pub dhuhr: NaiveTime,

    #[serde(with = "hhmm")]
    pub asr: NaiveTime,

    #[serde(with = "hhmm")]
    pub maghrib: NaiveTime,

    #[serde(with = "hhmm")]
    pub isha: NaiveTime,

    /// Prayer direction in degrees from true north
    #[serde(default)]
    pub qibla_direction: f64,
}

impl PrayerTimes {
    pub fn time_of(&self, prayer: Prayer) -> NaiveTime {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    /// All prayers with their instants in canonical order
    pub fn iter(&self) -> [(Prayer, NaiveTime); 5] {
        Prayer::ALL.map(|prayer| (prayer, self.time_of(prayer)))
    }

    /// Check the five instants are chronological. Fajr through Maghrib must
    /// strictly increase; Isha follows Maghrib or falls after midnight,
    /// before the next Fajr.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let out_of_order = |prayer: Prayer| ValidationError::OutOfOrderPrayer {
            entry: self.date.to_string(),
            prayer,
        };

        let day = [self.fajr, self.dhuhr, self.asr, self.maghrib];
        for (index, pair) in day.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(out_of_order(Prayer::ALL[index + 1]));
            }
        }

        if self.isha > self.maghrib || self.isha < self.fajr {
            Ok(())
        } else {
            Err(out_of_order(Prayer::Isha))
        }
    }
}

/// A half-open interval `[start, end)` safe for dosing.
///
/// The overnight window crosses midnight, in which case `end < start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,

    #[serde(with = "hhmm")]
    pub end: NaiveTime,

    pub label: String,

    pub description: String,
}

impl SchedulingWindow {
    /// Length of the window in minutes, accounting for midnight wrap
    pub fn duration_minutes(&self) -> i64 {
        (minutes_of_day(self.end) - minutes_of_day(self.start)).rem_euclid(MINUTES_PER_DAY)
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let offset = (minutes_of_day(time) - minutes_of_day(self.start)).rem_euclid(MINUTES_PER_DAY);
        offset < self.duration_minutes()
    }
}

/// Closed time-of-day interval `[start, end]`, may wrap midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,

    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let (start, end, t) = (
            minutes_of_day(self.start),
            minutes_of_day(self.end),
            minutes_of_day(time),
        );
        if start <= end {
            start <= t && t <= end
        } else {
            t >= start || t <= end
        }
    }
}

/// How a medication relates to food intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealRelation {
    BeforeMeals,
    AfterMeals,
    WithFood,
    EmptyStomach,
    AsNeeded,
}

impl MealRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealRelation::BeforeMeals => "before_meals",
            MealRelation::AfterMeals => "after_meals",
            MealRelation::WithFood => "with_food",
            MealRelation::EmptyStomach => "empty_stomach",
            MealRelation::AsNeeded => "as_needed",
        }
    }

    /// Relations whose doses must be taken around a meal
    pub fn is_meal_bound(&self) -> bool {
        matches!(
            self,
            MealRelation::BeforeMeals | MealRelation::WithFood | MealRelation::AfterMeals
        )
    }
}

impl std::str::FromStr for MealRelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "before_meals" | "before" => Ok(MealRelation::BeforeMeals),
            "after_meals" | "after" => Ok(MealRelation::AfterMeals),
            "with_food" | "with_meals" => Ok(MealRelation::WithFood),
            "empty_stomach" => Ok(MealRelation::EmptyStomach),
            "as_needed" => Ok(MealRelation::AsNeeded),
            _ => Err(format!("Invalid meal relation: {}", s)),
        }
    }
}

impl fmt::Display for MealRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated medication schedule supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationScheduleEntry {
    pub id: String,

    pub name: String,

    /// Dose times in the order the caller listed them
    #[serde(with = "hhmm_list")]
    pub dose_times: Vec<NaiveTime>,

    pub meal_relation: MealRelation,
}

/// Which observance a dose time collides with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    FastingHours,
    MealTiming,
    PrayerTime,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::FastingHours => write!(f, "fasting_hours"),
            ConflictKind::MealTiming => write!(f, "meal_timing"),
            ConflictKind::PrayerTime => write!(f, "prayer_time"),
        }
    }
}

/// Conflict severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// One rule match for one dose time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(with = "hhmm")]
    pub original_time: NaiveTime,

    pub kind: ConflictKind,

    pub severity: Severity,

    /// Prayer whose buffer was hit, for `prayer_time` conflicts only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prayer: Option<Prayer>,

    pub suggestion: String,
}

/// Slot an adjusted dose was moved into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentWindow {
    PreSuhoor,
    PostIftar,
    Night,
    Normal,
}

impl fmt::Display for AdjustmentWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustmentWindow::PreSuhoor => write!(f, "pre_suhoor"),
            AdjustmentWindow::PostIftar => write!(f, "post_iftar"),
            AdjustmentWindow::Night => write!(f, "night"),
            AdjustmentWindow::Normal => write!(f, "normal"),
        }
    }
}

/// Why the planner chose an adjusted time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentRationale {
    NoAdjustmentNeeded,
    AlignedWithSuhoor,
    AlignedWithIftar,
    EmptyStomachPreDawn,
    EmptyStomachNight,
}

impl fmt::Display for AdjustmentRationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AdjustmentRationale::NoAdjustmentNeeded => "no adjustment needed",
            AdjustmentRationale::AlignedWithSuhoor => "aligned with suhoor meal",
            AdjustmentRationale::AlignedWithIftar => "aligned with iftar meal",
            AdjustmentRationale::EmptyStomachPreDawn => "empty stomach before suhoor",
            AdjustmentRationale::EmptyStomachNight => "empty stomach after iftar digestion",
        };
        f.write_str(text)
    }
}

/// A replacement administration time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedTiming {
    /// Dose time this entry replaces
    #[serde(with = "hhmm")]
    pub original_time: NaiveTime,

    #[serde(with = "hhmm")]
    pub time: NaiveTime,

    pub window: AdjustmentWindow,

    pub description: String,

    pub rationale: AdjustmentRationale,
}

/// Suhoor and iftar times for a fasting day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealAnchors {
    /// Pre-dawn meal (suhoor)
    #[serde(with = "hhmm")]
    pub pre_dawn: NaiveTime,

    /// Post-sunset meal (iftar)
    #[serde(with = "hhmm")]
    pub post_sunset: NaiveTime,
}

/// Ramadan or another fasting festival
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingPeriod {
    pub name: String,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    /// Daylight interval during which intake is restricted
    pub fasting_window: TimeRange,

    pub meal_anchors: MealAnchors,
}

impl FastingPeriod {
    /// Ramadan with the conventional 06:00-19:00 fast and 04:30 / 19:30 meals
    pub fn ramadan(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: "Ramadan".to_string(),
            start_date,
            end_date,
            fasting_window: TimeRange::new(hm(6, 0), hm(19, 0)),
            meal_anchors: MealAnchors {
                pre_dawn: hm(4, 30),
                post_sunset: hm(19, 30),
            },
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn context(&self) -> FastingContext {
        FastingContext {
            window: self.fasting_window,
        }
    }
}

/// Active fasting hours passed to the conflict detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastingContext {
    pub window: TimeRange,
}

impl FastingContext {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            window: TimeRange::new(start, end),
        }
    }
}

/// Festival category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FestivalType {
    Religious,
    Cultural,
    National,
}

/// A dated calendar event from the festival provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FestivalEvent {
    pub name: String,

    pub date: NaiveDate,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    pub festival_type: FestivalType,

    pub is_fasting: bool,

    /// Tradition the festival belongs to (islamic, hindu, jewish, ...)
    #[serde(default)]
    pub tradition: Option<String>,
}

/// Stage of an active fasting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Beginning,
    Middle,
    End,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Beginning => write!(f, "beginning"),
            Phase::Middle => write!(f, "middle"),
            Phase::End => write!(f, "end"),
        }
    }
}

/// Phase tracker result; every field but `is_active` is `None` when inactive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStatus {
    pub is_active: bool,

    pub days_remaining: Option<u32>,

    /// 1-based day number within the period
    pub day_of_period: Option<u32>,

    pub elapsed_fraction: Option<Decimal>,

    pub phase: Option<Phase>,
}

impl PhaseStatus {
    pub fn inactive() -> Self {
        Self {
            is_active: false,
            days_remaining: None,
            day_of_period: None,
            elapsed_fraction: None,
            phase: None,
        }
    }
}

// Test and constant helper; only called with literal in-range values.
pub(crate) fn hm(hour: u32, minute: u32) -> NaiveTime {
    time_from_minutes(i64::from(hour) * 60 + i64::from(minute))
}
