use crate::models::{MealRelation, Phase};

/// Guidance that accompanies every adjusted schedule
pub const BASE_RECOMMENDATIONS: [&str; 3] = [
    "Consult your healthcare provider before changing medication times",
    "Monitor for adverse effects after switching to the new schedule",
    "Stay well hydrated throughout the day while adjusting your schedule",
];

/// Assembles ordered guidance text from fixed rule tables
pub struct RecommendationGenerator;

impl RecommendationGenerator {
    /// Build the guidance list: base set, then meal-relation addendum, then
    /// phase addendum. The phase addendum only applies while fasting.
    pub fn generate(meal_relation: MealRelation, fasting_active: bool, phase: Option<Phase>) -> Vec<String> {
        let mut recommendations: Vec<String> =
            BASE_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect();

        recommendations.extend(Self::relation_addendum(meal_relation).iter().map(|s| s.to_string()));

        if fasting_active {
            if let Some(caution) = phase.and_then(Self::phase_addendum) {
                recommendations.push(caution.to_string());
            }
        }

        recommendations
    }

    /// Extra guidance for a meal relation
    pub fn relation_addendum(meal_relation: MealRelation) -> &'static [&'static str] {
        match meal_relation {
            MealRelation::BeforeMeals => &[
                "Take the dose 15-30 minutes before starting suhoor or iftar",
                "Set a reminder ahead of each meal so the dose is not skipped",
            ],
            MealRelation::AfterMeals => &[
                "Take the dose once iftar or suhoor is finished, not on an empty stomach",
                "Allow the meal to settle before lying down after an evening dose",
            ],
            MealRelation::WithFood => &[
                "Take the dose during suhoor or iftar together with food",
                "Avoid taking the dose with only water or dates",
                "Keep suhoor substantial so the morning dose has enough food",
            ],
            MealRelation::EmptyStomach => &[
                "Take the dose at least 30 minutes before suhoor",
                "Alternatively take it 2 hours after iftar when the stomach is empty",
            ],
            MealRelation::AsNeeded => &[
                "Use non-fasting hours for as-needed doses whenever possible",
                "Seek medical advice if symptoms require a dose during fasting hours",
            ],
        }
    }

    /// Caution for the stage of the fast; nothing for the middle
    pub fn phase_addendum(phase: Phase) -> Option<&'static str> {
        match phase {
            Phase::Beginning => Some(
                "The first days of fasting are an adjustment period; watch closely for dizziness or low blood sugar",
            ),
            Phase::Middle => None,
            Phase::End => Some(
                "The fast is ending soon; plan with your provider how to return to your usual schedule",
            ),
        }
    }
}
