//! Score aggregation
//!
//! Pure functions from a sparse answer set to an overall rating and a
//! completion percentage.

use serde::{Deserialize, Serialize};

use super::answer::AnswerSet;
use super::schema::EvaluationSchema;

/// Lifecycle of a property's inspection checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl EvaluationStatus {
    pub fn from_completion(percentage: u8) -> Self {
        match percentage {
            0 => EvaluationStatus::NotStarted,
            p if p >= 100 => EvaluationStatus::Completed,
            _ => EvaluationStatus::InProgress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::NotStarted => "not_started",
            EvaluationStatus::InProgress => "in_progress",
            EvaluationStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for EvaluationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "in_progress" => EvaluationStatus::InProgress,
            "completed" => EvaluationStatus::Completed,
            _ => EvaluationStatus::NotStarted,
        }
    }
}

/// Answered vs. total items for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub category_id: String,
    pub title: String,
    pub answered: usize,
    pub total: usize,
}

/// Derived figures for one answer set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub overall_rating: f64,
    pub completion: u8,
    pub status: EvaluationStatus,
}

/// Turns answers into comparable numbers against a fixed catalogue
#[derive(Debug, Clone, Copy)]
pub struct ScoreAggregator<'a> {
    schema: &'a EvaluationSchema,
}

impl<'a> ScoreAggregator<'a> {
    pub fn new(schema: &'a EvaluationSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a EvaluationSchema {
        self.schema
    }

    /// Mean rating points rescaled to 0-5, rounded half-up to one decimal.
    ///
    /// Only answered rating items count; 0 when none are answered.
    pub fn overall_rating(&self, answers: &AnswerSet) -> f64 {
        let (sum, count) = self
            .schema
            .items()
            .filter(|(_, item)| item.kind.is_score_bearing())
            .filter_map(|(category, item)| answers.get(&category.id, &item.id))
            .filter_map(|value| value.rating_tier())
            .fold((0u32, 0u32), |(sum, count), tier| (sum + tier.points(), count + 1));

        if count == 0 {
            return 0.0;
        }

        // mean points in tenths, rounded half-up
        let tenths = (20 * sum + count) / (2 * count);
        tenths as f64 / 10.0
    }

    /// Share of all catalogue items with a present answer, 0-100
    pub fn completion_percentage(&self, answers: &AnswerSet) -> u8 {
        let total = self.schema.item_count();
        if total == 0 {
            return 0;
        }
        let answered = self.answered_count(answers);
        ((answered as f64 / total as f64) * 100.0).round() as u8
    }

    pub fn category_progress(&self, answers: &AnswerSet) -> Vec<CategoryProgress> {
        self.schema
            .categories()
            .iter()
            .map(|category| CategoryProgress {
                category_id: category.id.clone(),
                title: category.title.clone(),
                answered: category
                    .items
                    .iter()
                    .filter(|item| answers.get(&category.id, &item.id).is_some_and(|v| v.is_present()))
                    .count(),
                total: category.items.len(),
            })
            .collect()
    }

    pub fn summarize(&self, answers: &AnswerSet) -> EvaluationSummary {
        let completion = self.completion_percentage(answers);
        EvaluationSummary {
            overall_rating: self.overall_rating(answers),
            completion,
            status: EvaluationStatus::from_completion(completion),
        }
    }

    fn answered_count(&self, answers: &AnswerSet) -> usize {
        self.schema
            .items()
            .filter(|(category, item)| answers.get(&category.id, &item.id).is_some_and(|v| v.is_present()))
            .count()
    }
}

impl Default for ScoreAggregator<'static> {
    fn default() -> Self {
        Self::new(EvaluationSchema::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::answer::{AnswerValue, BoolOrText, RatingTier};
    use crate::evaluation::schema::{EvaluationCategory, EvaluationItem, ItemKind};

    fn rate_all(schema: &EvaluationSchema, pick: impl Fn(usize) -> RatingTier) -> AnswerSet {
        let mut answers = AnswerSet::new();
        for (i, (category, item)) in schema
            .items()
            .filter(|(_, item)| item.kind == ItemKind::Rating)
            .enumerate()
        {
            answers.set(&category.id, &item.id, AnswerValue::Rating(pick(i)));
        }
        answers
    }

    fn answer_everything(schema: &EvaluationSchema) -> AnswerSet {
        let mut answers = AnswerSet::new();
        for (category, item) in schema.items() {
            let value = match item.kind {
                ItemKind::Rating => AnswerValue::Rating(RatingTier::Fair),
                ItemKind::Radio => AnswerValue::Radio(item.options[0].clone()),
                ItemKind::Checkbox => AnswerValue::Checkbox(false),
                ItemKind::CheckboxWithText => AnswerValue::CheckboxWithText(BoolOrText::Checked(true)),
                ItemKind::Currency => AnswerValue::Currency(0.0),
                ItemKind::FreeText => AnswerValue::FreeText("Quiet street".into()),
            };
            answers.set(&category.id, &item.id, value);
        }
        answers
    }

    #[test]
    fn test_empty_answers() {
        let aggregator = ScoreAggregator::default();
        assert_eq!(aggregator.overall_rating(&AnswerSet::new()), 0.0);
        assert_eq!(aggregator.completion_percentage(&AnswerSet::new()), 0);
    }

    #[test]
    fn test_uniform_ratings() {
        let schema = EvaluationSchema::standard();
        let aggregator = ScoreAggregator::new(schema);
        assert_eq!(aggregator.overall_rating(&rate_all(schema, |_| RatingTier::Good)), 5.0);
        assert_eq!(aggregator.overall_rating(&rate_all(schema, |_| RatingTier::Poor)), 1.0);
        assert_eq!(aggregator.overall_rating(&rate_all(schema, |_| RatingTier::Fair)), 3.0);
    }

    #[test]
    fn test_even_good_poor_mix_is_three() {
        let answers = AnswerSet::new()
            .with("exteriors", "roof_condition", AnswerValue::Rating(RatingTier::Good))
            .with("exteriors", "foundation_visible", AnswerValue::Rating(RatingTier::Poor))
            .with("kitchen", "cabinets", AnswerValue::Rating(RatingTier::Good))
            .with("location", "privacy", AnswerValue::Rating(RatingTier::Poor));
        assert_eq!(ScoreAggregator::default().overall_rating(&answers), 3.0);
    }

    #[test]
    fn test_rounding_to_one_decimal() {
        // (5 + 5 + 3) / 3 = 4.333..
        let answers = AnswerSet::new()
            .with("kitchen", "cabinets", AnswerValue::Rating(RatingTier::Good))
            .with("kitchen", "countertops", AnswerValue::Rating(RatingTier::Good))
            .with("kitchen", "appliances", AnswerValue::Rating(RatingTier::Fair));
        assert_eq!(ScoreAggregator::default().overall_rating(&answers), 4.3);

        // (5 + 3 + 3 + 3) / 4 = 3.5 exactly
        let answers = answers
            .with("kitchen", "countertops", AnswerValue::Rating(RatingTier::Fair))
            .with("kitchen", "sink_faucet", AnswerValue::Rating(RatingTier::Fair));
        assert_eq!(ScoreAggregator::default().overall_rating(&answers), 3.5);

        // (5 + 5 + 5 + 1 + 1 + 3 + 3 + 3 + 3 + 5 + 5 + 1 + 3 + 1 + 3 + 5) / 16 = 3.25 -> 3.3
        let tiers = [5, 5, 5, 1, 1, 3, 3, 3, 3, 5, 5, 1, 3, 1, 3, 5];
        let schema = EvaluationSchema::standard();
        let mut answers = AnswerSet::new();
        for ((category, item), points) in schema.items().filter(|(_, i)| i.kind == ItemKind::Rating).zip(tiers) {
            let tier = match points {
                5 => RatingTier::Good,
                3 => RatingTier::Fair,
                _ => RatingTier::Poor,
            };
            answers.set(&category.id, &item.id, AnswerValue::Rating(tier));
        }
        assert_eq!(ScoreAggregator::new(schema).overall_rating(&answers), 3.3);
    }

    #[test]
    fn test_non_rating_answers_do_not_move_rating() {
        let aggregator = ScoreAggregator::default();
        let base = AnswerSet::new()
            .with("exteriors", "roof_condition", AnswerValue::Rating(RatingTier::Good))
            .with("interiors", "floors", AnswerValue::Rating(RatingTier::Fair));
        let before = aggregator.overall_rating(&base);

        let extended = base
            .with("monthly_costs", "utilities_cost", AnswerValue::Currency(240.0))
            .with("other_observations", "general_notes", AnswerValue::FreeText("Needs paint".into()))
            .with("additional_features", "garage", AnswerValue::Checkbox(true));
        assert_eq!(aggregator.overall_rating(&extended), before);
        assert_eq!(before, 4.0);
    }

    #[test]
    fn test_answers_outside_schema_are_ignored() {
        let answers = AnswerSet::new().with("garden", "roses", AnswerValue::Rating(RatingTier::Poor));
        let aggregator = ScoreAggregator::default();
        assert_eq!(aggregator.overall_rating(&answers), 0.0);
        assert_eq!(aggregator.completion_percentage(&answers), 0);
    }

    #[test]
    fn test_completion_full_and_monotonic() {
        let schema = EvaluationSchema::standard();
        let aggregator = ScoreAggregator::new(schema);
        let full = answer_everything(schema);
        assert_eq!(aggregator.completion_percentage(&full), 100);

        let mut answers = AnswerSet::new();
        let mut last = 0;
        for (category, item, value) in full.iter() {
            answers.set(category, item, value.clone());
            let now = aggregator.completion_percentage(&answers);
            assert!(now >= last);
            last = now;
        }

        // Changing an existing answer never lowers completion
        answers.set("exteriors", "roof_condition", AnswerValue::Rating(RatingTier::Poor));
        assert_eq!(aggregator.completion_percentage(&answers), 100);
    }

    #[test]
    fn test_single_item_scenario() {
        let mut items = vec![EvaluationItem::rating("roof", "Roof")];
        for i in 1..40 {
            items.push(EvaluationItem::new(format!("note_{}", i), "Note", ItemKind::FreeText));
        }
        let schema = EvaluationSchema::new(vec![EvaluationCategory::new("ext", "Exterior", items)]).unwrap();
        let aggregator = ScoreAggregator::new(&schema);
        let answers = AnswerSet::new().with("ext", "roof", AnswerValue::Rating(RatingTier::Good));

        assert_eq!(aggregator.overall_rating(&answers), 5.0);
        assert_eq!(aggregator.completion_percentage(&answers), 3);
    }

    #[test]
    fn test_empty_strings_are_unanswered() {
        let aggregator = ScoreAggregator::default();
        let answers = AnswerSet::new()
            .with("other_observations", "general_notes", AnswerValue::FreeText(String::new()));
        assert_eq!(aggregator.completion_percentage(&answers), 0);
    }

    #[test]
    fn test_category_progress_and_status() {
        let aggregator = ScoreAggregator::default();
        let answers = AnswerSet::new()
            .with("monthly_costs", "utilities_cost", AnswerValue::Currency(0.0))
            .with("monthly_costs", "insurance_cost", AnswerValue::Currency(95.0));
        let progress = aggregator.category_progress(&answers);
        let costs = progress.iter().find(|p| p.category_id == "monthly_costs").unwrap();
        assert_eq!((costs.answered, costs.total), (2, 4));

        let summary = aggregator.summarize(&answers);
        assert_eq!(summary.status, EvaluationStatus::InProgress);
        assert_eq!(summary.overall_rating, 0.0);
        assert_eq!(EvaluationStatus::from_completion(0), EvaluationStatus::NotStarted);
        assert_eq!(EvaluationStatus::from_completion(100), EvaluationStatus::Completed);
    }
}
