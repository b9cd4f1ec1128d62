use crate::models::{FastingPeriod, Phase, PhaseStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

impl Phase {
    /// Classify an elapsed fraction of a fasting period.
    ///
    /// - beginning: `[0, 1/3)`
    /// - middle: `[1/3, 2/3)`
    /// - end: `[2/3, 1]`
    ///
    /// Fractions outside `[0, 1]` are clamped first.
    pub fn from_fraction(fraction: Decimal) -> Self {
        let fraction = fraction.clamp(Decimal::ZERO, Decimal::ONE);
        let scaled = fraction * Decimal::from(3);
        if scaled < Decimal::ONE {
            Phase::Beginning
        } else if scaled < Decimal::from(2) {
            Phase::Middle
        } else {
            Phase::End
        }
    }
}

/// Derives the stage of a fasting period for a given day
pub struct PhaseTracker;

impl PhaseTracker {
    /// Track where `today` falls within `period`
    pub fn track(period: &FastingPeriod, today: NaiveDate) -> PhaseStatus {
        if !period.covers(today) {
            debug!(period = %period.name, %today, "Fasting period inactive");
            return PhaseStatus::inactive();
        }

        let total = (period.end_date - period.start_date).num_days();
        let elapsed = (today - period.start_date).num_days();
        let remaining = (period.end_date - today).num_days();

        // Integer comparison keeps the 1/3 and 2/3 boundaries exact
        let phase = if total == 0 || 3 * elapsed < total {
            Phase::Beginning
        } else if 3 * elapsed < 2 * total {
            Phase::Middle
        } else {
            Phase::End
        };

        let elapsed_fraction = if total == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(elapsed) / Decimal::from(total)).clamp(Decimal::ZERO, Decimal::ONE)
        };

        PhaseStatus {
            is_active: true,
            days_remaining: u32::try_from(remaining).ok(),
            day_of_period: u32::try_from(elapsed + 1).ok(),
            elapsed_fraction: Some(elapsed_fraction),
            phase: Some(phase),
        }
    }
}
