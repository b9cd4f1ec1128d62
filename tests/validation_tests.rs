use dosewise::{DoseWiseError, MealRelation, RawMedicationEntry, ScheduleValidator, ValidationError};

/// Validation of caller-supplied JSON at the input boundary

fn parse(json: &str) -> Vec<RawMedicationEntry> {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_json_batch_with_mixed_entries() {
    let raw = parse(
        r#"[
            {"id": "amlo", "name": "Amlodipine", "dose_times": ["07:30"], "meal_relation": "as-needed"},
            {"id": "met", "name": "Metformin", "dose_times": ["08:00", "20:00"], "meal_relation": "With_Meals"},
            {"name": "Ibuprofen", "dose_times": ["12:00"], "meal_relation": "after"},
            {"id": "omep", "name": "Omeprazole", "dose_times": [], "meal_relation": "before"},
            {"id": "levo", "name": "Levothyroxine", "meal_relation": "empty_stomach"},
            {}
        ]"#,
    );

    let report = ScheduleValidator::validate_all(&raw);

    let accepted: Vec<(&str, MealRelation)> = report
        .accepted
        .iter()
        .map(|e| (e.id.as_str(), e.meal_relation))
        .collect();
    assert_eq!(
        accepted,
        vec![("amlo", MealRelation::AsNeeded), ("met", MealRelation::WithFood)]
    );

    assert_eq!(report.rejected.len(), 4);
    assert_eq!(
        report.rejected[0],
        ValidationError::MissingField {
            entry: "Ibuprofen".to_string(),
            field: "id".to_string()
        }
    );
    assert!(matches!(report.rejected[1], ValidationError::EmptySchedule { ref entry } if entry == "omep"));
    assert!(matches!(
        report.rejected[2],
        ValidationError::MissingField { ref field, .. } if field == "dose_times"
    ));
    assert_eq!(report.rejected[3].entry(), "#6");
}

#[test]
fn test_strict_time_format() {
    for value in ["7:30", "07:3", "24:00", "12:60", "07.30", "07:30:00", " 07:30x"] {
        let raw = RawMedicationEntry {
            id: Some("x".to_string()),
            name: Some("X".to_string()),
            dose_times: Some(vec![value.to_string()]),
            meal_relation: Some("with_food".to_string()),
        };
        let err = ScheduleValidator::validate(&raw, 0).unwrap_err();
        assert!(
            matches!(err, ValidationError::MalformedTime { .. }),
            "{:?} should be rejected",
            value
        );
    }
}

#[test]
fn test_dose_order_preserved() {
    let raw = parse(r#"[{"id": "a", "name": "A", "dose_times": ["22:00", "06:00", "14:00"], "meal_relation": "with_food"}]"#);
    let report = ScheduleValidator::validate_all(&raw);

    let times: Vec<String> = report.accepted[0]
        .dose_times
        .iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect();
    assert_eq!(times, vec!["22:00", "06:00", "14:00"]);
}

#[test]
fn test_error_messages() {
    let err = ValidationError::UnknownMealRelation {
        entry: "met".to_string(),
        value: "sometimes".to_string(),
    };
    assert_eq!(err.to_string(), "Entry met: unknown meal relation \"sometimes\"");

    let wrapped: DoseWiseError = err.into();
    assert!(wrapped.to_string().starts_with("Validation error: Entry met"));
    assert!(!wrapped.is_retryable());
}
