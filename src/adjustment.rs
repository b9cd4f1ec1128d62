use crate::models::{
    format_hhmm, hm, shift_minutes, AdjustedTiming, AdjustmentRationale, AdjustmentWindow,
    FastingPeriod, MealAnchors, MealRelation, MedicationScheduleEntry, TimeRange,
};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the planner takes the fasting window and meal anchors from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    /// Fixed fasting window and meal anchors from configuration
    #[default]
    Fixed,
    /// Window and anchors carried by the fasting period itself
    Calendar,
}

/// Adjustment planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub anchor_mode: AnchorMode,

    /// Fasting window used in fixed mode (default: 06:00-19:00)
    pub fixed_fasting_window: TimeRange,

    /// Suhoor / iftar anchors used in fixed mode (default: 04:30 / 19:30)
    pub fixed_meal_anchors: MealAnchors,

    /// Minutes before suhoor for meal-bound doses (default: 15)
    pub pre_suhoor_offset_minutes: i64,

    /// Minutes after iftar for with-food and before-meal doses (default: 15)
    pub post_iftar_offset_minutes: i64,

    /// Minutes after iftar for after-meal doses (default: 45)
    pub after_meal_offset_minutes: i64,

    /// Minutes away from either meal for empty-stomach doses (default: 60)
    pub empty_stomach_offset_minutes: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            anchor_mode: AnchorMode::Fixed,
            fixed_fasting_window: TimeRange::new(hm(6, 0), hm(19, 0)),
            fixed_meal_anchors: MealAnchors {
                pre_dawn: hm(4, 30),
                post_sunset: hm(19, 30),
            },
            pre_suhoor_offset_minutes: 15,
            post_iftar_offset_minutes: 15,
            after_meal_offset_minutes: 45,
            empty_stomach_offset_minutes: 60,
        }
    }
}

/// Maps dose times that fall inside fasting hours onto suhoor / iftar slots.
///
/// The decision is a fixed branch table keyed by
/// `(inside fasting window, meal relation, hour before noon)`:
///
/// | inside | relation                                  | before noon | result |
/// |--------|-------------------------------------------|-------------|--------|
/// | no     | any                                       | any         | unchanged, `normal` |
/// | yes    | before_meals / with_food / after_meals    | any         | `pre_suhoor` + `post_iftar` |
/// | yes    | empty_stomach / as_needed                 | yes         | `pre_suhoor`, earlier slot |
/// | yes    | empty_stomach / as_needed                 | no          | `night`, later slot |
pub struct AdjustmentPlanner {
    config: PlannerConfig,
}

impl AdjustmentPlanner {
    /// Create new planner with default configuration
    pub fn new() -> Self {
        AdjustmentPlanner {
            config: PlannerConfig::default(),
        }
    }

    /// Create new planner with custom configuration
    pub fn with_config(config: PlannerConfig) -> Self {
        AdjustmentPlanner { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Effective fasting window and anchors for a period under the configured mode
    pub fn resolve_anchors(&self, period: &FastingPeriod) -> (TimeRange, MealAnchors) {
        match self.config.anchor_mode {
            AnchorMode::Fixed => (self.config.fixed_fasting_window, self.config.fixed_meal_anchors),
            AnchorMode::Calendar => (period.fasting_window, period.meal_anchors),
        }
    }

    /// Plan replacement times for a single dose
    pub fn plan(
        &self,
        dose_time: NaiveTime,
        meal_relation: MealRelation,
        period: Option<&FastingPeriod>,
    ) -> Vec<AdjustedTiming> {
        let Some(period) = period else {
            return vec![Self::unchanged(dose_time)];
        };

        let (window, anchors) = self.resolve_anchors(period);
        if !window.contains(dose_time) {
            return vec![Self::unchanged(dose_time)];
        }

        if meal_relation.is_meal_bound() {
            let suhoor = shift_minutes(anchors.pre_dawn, -self.config.pre_suhoor_offset_minutes);
            let iftar_offset = if meal_relation == MealRelation::AfterMeals {
                self.config.after_meal_offset_minutes
            } else {
                self.config.post_iftar_offset_minutes
            };
            let iftar = shift_minutes(anchors.post_sunset, iftar_offset);

            return vec![
                AdjustedTiming {
                    original_time: dose_time,
                    time: suhoor,
                    window: AdjustmentWindow::PreSuhoor,
                    description: format!(
                        "Take {} with the suhoor meal before dawn",
                        describe_relation(meal_relation)
                    ),
                    rationale: AdjustmentRationale::AlignedWithSuhoor,
                },
                AdjustedTiming {
                    original_time: dose_time,
                    time: iftar,
                    window: AdjustmentWindow::PostIftar,
                    description: format!(
                        "Take {} with the iftar meal after sunset",
                        describe_relation(meal_relation)
                    ),
                    rationale: AdjustmentRationale::AlignedWithIftar,
                },
            ];
        }

        let offset = self.config.empty_stomach_offset_minutes;
        let adjusted = if dose_time.hour() < 12 {
            AdjustedTiming {
                original_time: dose_time,
                time: shift_minutes(anchors.pre_dawn, -offset),
                window: AdjustmentWindow::PreSuhoor,
                description: format!(
                    "Take on an empty stomach before suhoor at {}",
                    format_hhmm(anchors.pre_dawn)
                ),
                rationale: AdjustmentRationale::EmptyStomachPreDawn,
            }
        } else {
            AdjustedTiming {
                original_time: dose_time,
                time: shift_minutes(anchors.post_sunset, offset),
                window: AdjustmentWindow::Night,
                description: format!(
                    "Take later in the evening, well after the iftar meal at {}",
                    format_hhmm(anchors.post_sunset)
                ),
                rationale: AdjustmentRationale::EmptyStomachNight,
            }
        };

        vec![adjusted]
    }

    /// Plan every dose of a medication; never returns fewer entries than doses
    pub fn plan_schedule(
        &self,
        entry: &MedicationScheduleEntry,
        period: Option<&FastingPeriod>,
    ) -> Vec<AdjustedTiming> {
        let planned: Vec<AdjustedTiming> = entry
            .dose_times
            .iter()
            .flat_map(|&time| self.plan(time, entry.meal_relation, period))
            .collect();

        debug!(
            medication = %entry.id,
            doses = entry.dose_times.len(),
            planned = planned.len(),
            "Planned dose adjustments"
        );

        planned
    }

    fn unchanged(dose_time: NaiveTime) -> AdjustedTiming {
        AdjustedTiming {
            original_time: dose_time,
            time: dose_time,
            window: AdjustmentWindow::Normal,
            description: "Keep the original dose time".to_string(),
            rationale: AdjustmentRationale::NoAdjustmentNeeded,
        }
    }
}

impl Default for AdjustmentPlanner {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_relation(relation: MealRelation) -> &'static str {
    match relation {
        MealRelation::BeforeMeals => "shortly before eating",
        MealRelation::AfterMeals => "once the meal is finished",
        _ => "together with food",
    }
}
