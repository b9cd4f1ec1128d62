use crate::adjustment::{AdjustmentPlanner, PlannerConfig};
use crate::conflicts::{ConflictDetector, DetectorConfig};
use crate::error::{DoseWiseError, Result};
use crate::models::{
    AdjustedTiming, Conflict, FastingContext, FastingPeriod, MealRelation, MedicationScheduleEntry,
    Phase, PhaseStatus, PrayerTimes, SchedulingWindow,
};
use crate::phase::PhaseTracker;
use crate::recommendations::RecommendationGenerator;
use crate::windows::{WindowResolver, DEFAULT_BUFFER_MINUTES};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Largest prayer buffer accepted by configuration validation
pub const MAX_BUFFER_MINUTES: u32 = 12 * 60;

/// Scheduling engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minutes around each prayer instant to keep free (default: 30)
    pub buffer_minutes: u32,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub planner: PlannerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            detector: DetectorConfig::default(),
            planner: PlannerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_minutes > MAX_BUFFER_MINUTES {
            return Err(DoseWiseError::Configuration(format!(
                "buffer_minutes must be at most {}, got {}",
                MAX_BUFFER_MINUTES, self.buffer_minutes
            )));
        }

        let meal = self.detector.meal_traffic_window;
        if meal.start == meal.end {
            return Err(DoseWiseError::Configuration(
                "meal_traffic_window must not be empty".to_string(),
            ));
        }

        let offsets = [
            ("pre_suhoor_offset_minutes", self.planner.pre_suhoor_offset_minutes),
            ("post_iftar_offset_minutes", self.planner.post_iftar_offset_minutes),
            ("after_meal_offset_minutes", self.planner.after_meal_offset_minutes),
            ("empty_stomach_offset_minutes", self.planner.empty_stomach_offset_minutes),
        ];
        for (name, value) in offsets {
            if !(0..=240).contains(&value) {
                return Err(DoseWiseError::Configuration(format!(
                    "{} must be between 0 and 240 minutes, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Everything the engine computes for one medication on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAnalysis {
    pub medication_id: String,

    pub medication_name: String,

    pub conflicts: Vec<Conflict>,

    pub adjustments: Vec<AdjustedTiming>,

    pub phase: PhaseStatus,

    pub recommendations: Vec<String>,
}

/// Stateless facade over the five scheduling components
pub struct SchedulingEngine {
    config: EngineConfig,
    detector: ConflictDetector,
    planner: AdjustmentPlanner,
}

impl SchedulingEngine {
    /// Create new engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create new engine with custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        SchedulingEngine {
            detector: ConflictDetector::with_config(config.detector.clone()),
            planner: AdjustmentPlanner::with_config(config.planner.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolve_windows(&self, prayer_times: &PrayerTimes, buffer_minutes: u32) -> Vec<SchedulingWindow> {
        WindowResolver::resolve(prayer_times, buffer_minutes)
    }

    pub fn detect_conflicts(
        &self,
        dose_times: &[NaiveTime],
        prayer_times: &PrayerTimes,
        buffer_minutes: u32,
        fasting: Option<&FastingContext>,
    ) -> Vec<Conflict> {
        self.detector.detect(dose_times, prayer_times, buffer_minutes, fasting)
    }

    pub fn track_phase(&self, period: &FastingPeriod, today: NaiveDate) -> PhaseStatus {
        PhaseTracker::track(period, today)
    }

    pub fn plan_adjustment(
        &self,
        dose_time: NaiveTime,
        meal_relation: MealRelation,
        period: Option<&FastingPeriod>,
    ) -> Vec<AdjustedTiming> {
        self.planner.plan(dose_time, meal_relation, period)
    }

    pub fn generate_recommendations(
        &self,
        meal_relation: MealRelation,
        fasting_active: bool,
        phase: Option<Phase>,
    ) -> Vec<String> {
        RecommendationGenerator::generate(meal_relation, fasting_active, phase)
    }

    /// Fasting context for conflict detection under the configured anchor mode
    pub fn fasting_context(&self, period: &FastingPeriod) -> FastingContext {
        let (window, _) = self.planner.resolve_anchors(period);
        FastingContext { window }
    }

    /// Run both halves of the engine for one medication.
    ///
    /// A period that does not cover `today` is treated as no fasting at all.
    /// Without prayer times only fasting and meal-timing conflicts are
    /// reported.
    pub fn analyze(
        &self,
        entry: &MedicationScheduleEntry,
        prayer_times: Option<&PrayerTimes>,
        period: Option<&FastingPeriod>,
        today: NaiveDate,
    ) -> MedicationAnalysis {
        let phase = period
            .map(|p| self.track_phase(p, today))
            .unwrap_or_else(PhaseStatus::inactive);
        let active_period = period.filter(|_| phase.is_active);
        let context = active_period.map(|p| self.fasting_context(p));

        let conflicts = match prayer_times {
            Some(times) => self.detect_conflicts(
                &entry.dose_times,
                times,
                self.config.buffer_minutes,
                context.as_ref(),
            ),
            None => self.detector.detect_without_prayers(&entry.dose_times, context.as_ref()),
        };

        let adjustments = self.planner.plan_schedule(entry, active_period);
        let recommendations = self.generate_recommendations(entry.meal_relation, phase.is_active, phase.phase);

        MedicationAnalysis {
            medication_id: entry.id.clone(),
            medication_name: entry.name.clone(),
            conflicts,
            adjustments,
            phase,
            recommendations,
        }
    }
}

impl Default for SchedulingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{hm, AdjustmentWindow, ConflictKind};

    fn entry() -> MedicationScheduleEntry {
        MedicationScheduleEntry {
            id: "med-1".to_string(),
            name: "Metformin".to_string(),
            dose_times: vec![hm(8, 0), hm(21, 0)],
            meal_relation: MealRelation::WithFood,
        }
    }

    fn prayer_times() -> PrayerTimes {
        PrayerTimes {
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            location: Default::default(),
            fajr: hm(5, 0),
            dhuhr: hm(13, 15),
            asr: hm(16, 30),
            maghrib: hm(19, 0),
            isha: hm(20, 15),
            qibla_direction: 0.0,
        }
    }

    #[test]
    fn test_analyze_during_ramadan() {
        let engine = SchedulingEngine::new();
        let period = FastingPeriod::ramadan(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 30).unwrap(),
        );
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();

        let analysis = engine.analyze(&entry(), Some(&prayer_times()), Some(&period), today);

        assert_eq!(analysis.conflicts.len(), 1);
        assert_eq!(analysis.conflicts[0].kind, ConflictKind::FastingHours);
        assert_eq!(analysis.adjustments.len(), 3);
        assert_eq!(analysis.adjustments[2].window, AdjustmentWindow::Normal);
        assert_eq!(analysis.phase.phase, Some(Phase::Beginning));
        assert!(analysis.recommendations.last().unwrap().contains("adjustment period"));
    }

    #[test]
    fn test_analyze_period_not_covering_today() {
        let engine = SchedulingEngine::new();
        let period = FastingPeriod::ramadan(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 30).unwrap(),
        );
        let today = NaiveDate::from_ymd_opt(2025, 4, 5).unwrap();

        let analysis = engine.analyze(&entry(), Some(&prayer_times()), Some(&period), today);
        assert!(analysis.conflicts.is_empty());
        assert!(analysis.adjustments.iter().all(|a| a.window == AdjustmentWindow::Normal));
        assert!(!analysis.phase.is_active);
        assert_eq!(analysis.recommendations.len(), 6);
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let config = EngineConfig {
            buffer_minutes: 800,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(DoseWiseError::Configuration(_))));

        let mut config = EngineConfig::default();
        config.planner.after_meal_offset_minutes = -5;
        assert!(config.validate().is_err());
    }
}
