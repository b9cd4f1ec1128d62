//! Input validation at the boundary of the scheduling engine
//!
//! Raw medication entries arrive from forms, files or other services with
//! free-form strings. Entries that fail validation are excluded and reported;
//! only validated `MedicationScheduleEntry` values reach the engine.

use crate::error::ValidationError;
use crate::models::{parse_hhmm, MealRelation, MedicationScheduleEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Medication entry as supplied by the caller, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMedicationEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub dose_times: Option<Vec<String>>,
    pub meal_relation: Option<String>,
}

/// Outcome of validating a batch of entries
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub accepted: Vec<MedicationScheduleEntry>,
    pub rejected: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// Validates raw medication entries
pub struct ScheduleValidator;

impl ScheduleValidator {
    /// Validate a single entry. `index` names the entry when it has no id or name.
    pub fn validate(raw: &RawMedicationEntry, index: usize) -> Result<MedicationScheduleEntry, ValidationError> {
        let label = Self::entry_label(raw, index);

        let id = Self::required(raw.id.as_deref(), &label, "id")?;
        let name = Self::required(raw.name.as_deref(), &label, "name")?;
        let relation_raw = Self::required(raw.meal_relation.as_deref(), &label, "meal_relation")?;

        let meal_relation = relation_raw
            .parse::<MealRelation>()
            .map_err(|_| ValidationError::UnknownMealRelation {
                entry: label.clone(),
                value: relation_raw.clone(),
            })?;

        let raw_times = raw.dose_times.as_ref().ok_or_else(|| ValidationError::MissingField {
            entry: label.clone(),
            field: "dose_times".to_string(),
        })?;

        if raw_times.is_empty() {
            return Err(ValidationError::EmptySchedule { entry: label });
        }

        let dose_times = raw_times
            .iter()
            .map(|value| {
                parse_hhmm(value.trim()).ok_or_else(|| ValidationError::MalformedTime {
                    entry: label.clone(),
                    value: value.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MedicationScheduleEntry {
            id,
            name,
            dose_times,
            meal_relation,
        })
    }

    /// Validate a batch, keeping input order among accepted entries
    pub fn validate_all(raw_entries: &[RawMedicationEntry]) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (index, raw) in raw_entries.iter().enumerate() {
            match Self::validate(raw, index) {
                Ok(entry) => report.accepted.push(entry),
                Err(err) => {
                    warn!(entry = err.entry(), error = %err, "Rejected medication entry");
                    report.rejected.push(err);
                }
            }
        }

        debug!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "Validated medication entries"
        );

        report
    }

    fn entry_label(raw: &RawMedicationEntry, index: usize) -> String {
        raw.id
            .as_deref()
            .or(raw.name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", index + 1))
    }

    fn required(value: Option<&str>, label: &str, field: &str) -> Result<String, ValidationError> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(ValidationError::MissingField {
                entry: label.to_string(),
                field: field.to_string(),
            }),
        }
    }
}
