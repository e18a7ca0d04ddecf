//! Inspection checklist catalogue
//!
//! The catalogue is fixed at load time. Changing it is a schema migration,
//! so there are no mutation operations here.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::answer::{AnswerSet, AnswerValue, ItemNotes, NOTE_MAX_CHARS};
use crate::error::{EvalError, EvalResult};

/// How an item is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Rating,
    Radio,
    Checkbox,
    CheckboxWithText,
    Currency,
    FreeText,
}

impl ItemKind {
    /// Only rating items feed the overall rating
    pub fn is_score_bearing(&self) -> bool {
        matches!(self, ItemKind::Rating)
    }

    /// Rating and radio items take an optional note
    pub fn accepts_note(&self) -> bool {
        matches!(self, ItemKind::Rating | ItemKind::Radio)
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ItemKind::Rating => "rating",
            ItemKind::Radio => "radio",
            ItemKind::Checkbox => "checkbox",
            ItemKind::CheckboxWithText => "checkbox_with_text",
            ItemKind::Currency => "currency",
            ItemKind::FreeText => "free_text",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationItem {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
    pub kind: ItemKind,
    /// Allowed values for radio items, empty otherwise
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl EvaluationItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            helper_text: None,
            kind,
            options: Vec::new(),
        }
    }

    pub fn rating(id: &str, label: &str) -> Self {
        Self::new(id, label, ItemKind::Rating)
    }

    pub fn radio(id: &str, label: &str, options: &[&str]) -> Self {
        let mut item = Self::new(id, label, ItemKind::Radio);
        item.options = options.iter().map(|o| o.to_string()).collect();
        item
    }

    pub fn with_helper_text(mut self, text: impl Into<String>) -> Self {
        self.helper_text = Some(text.into());
        self
    }

    /// Check that `value` is an acceptable answer for this item
    pub fn accepts(&self, value: &AnswerValue) -> Result<(), String> {
        if value.kind() != self.kind {
            return Err(format!("expected a {} answer, got {}", self.kind, value.kind()));
        }
        match value {
            AnswerValue::Radio(choice) if !choice.is_empty() && !self.options.iter().any(|o| o == choice) => {
                Err(format!("'{}' is not one of [{}]", choice, self.options.join(", ")))
            }
            AnswerValue::Currency(amount) if !amount.is_finite() || *amount < 0.0 => {
                Err(format!("amount must be a non-negative number, got {}", amount))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCategory {
    pub id: String,
    pub title: String,
    pub items: Vec<EvaluationItem>,
}

impl EvaluationCategory {
    pub fn new(id: impl Into<String>, title: impl Into<String>, items: Vec<EvaluationItem>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            items,
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&EvaluationItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

/// Ordered, immutable catalogue of categories and items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSchema {
    categories: Vec<EvaluationCategory>,
}

impl EvaluationSchema {
    /// Build a catalogue, rejecting duplicate ids and empty radio option sets
    pub fn new(categories: Vec<EvaluationCategory>) -> EvalResult<Self> {
        let mut category_ids = HashSet::new();
        for category in &categories {
            if !category_ids.insert(category.id.as_str()) {
                return Err(EvalError::Validation(format!("duplicate category id '{}'", category.id)));
            }
            let mut item_ids = HashSet::new();
            for item in &category.items {
                if !item_ids.insert(item.id.as_str()) {
                    return Err(EvalError::Validation(format!(
                        "duplicate item id '{}' in category '{}'",
                        item.id, category.id
                    )));
                }
                if item.kind == ItemKind::Radio && item.options.is_empty() {
                    return Err(EvalError::Validation(format!("radio item '{}' has no options", item.id)));
                }
            }
        }
        Ok(Self { categories })
    }

    /// The built-in home inspection checklist
    pub fn standard() -> &'static EvaluationSchema {
        &STANDARD_SCHEMA
    }

    pub fn categories(&self) -> &[EvaluationCategory] {
        &self.categories
    }

    /// Every item with its category id, in catalogue order
    pub fn items(&self) -> impl Iterator<Item = (&EvaluationCategory, &EvaluationItem)> {
        self.categories
            .iter()
            .flat_map(|c| c.items.iter().map(move |i| (c, i)))
    }

    pub fn category(&self, category_id: &str) -> Option<&EvaluationCategory> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    pub fn item(&self, category_id: &str, item_id: &str) -> Option<&EvaluationItem> {
        self.category(category_id).and_then(|c| c.item(item_id))
    }

    /// Total item count across all categories and kinds
    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    /// Count of items whose kind is score-bearing
    pub fn score_bearing_item_count(&self) -> usize {
        self.items().filter(|(_, i)| i.kind.is_score_bearing()).count()
    }

    /// Validate a single answer against the item it targets
    pub fn validate_answer(&self, category_id: &str, item_id: &str, value: &AnswerValue) -> EvalResult<()> {
        let invalid = |reason: String| EvalError::InvalidAnswer {
            category_id: category_id.to_string(),
            item_id: item_id.to_string(),
            reason,
        };
        let category = self
            .category(category_id)
            .ok_or_else(|| invalid("unknown category".to_string()))?;
        let item = category
            .item(item_id)
            .ok_or_else(|| invalid("unknown item".to_string()))?;
        item.accepts(value).map_err(invalid)
    }

    /// Validate every answer in the set; the first failure wins
    pub fn validate_answers(&self, answers: &AnswerSet) -> EvalResult<()> {
        for (category_id, item_id, value) in answers.iter() {
            self.validate_answer(category_id, item_id, value)?;
        }
        Ok(())
    }

    /// Notes must target a known rating or radio item and fit the length cap
    pub fn validate_notes(&self, notes: &ItemNotes) -> EvalResult<()> {
        for (category_id, item_id, note) in notes.iter() {
            let invalid = |reason: String| EvalError::InvalidAnswer {
                category_id: category_id.to_string(),
                item_id: item_id.to_string(),
                reason,
            };
            let item = self
                .item(category_id, item_id)
                .ok_or_else(|| invalid("unknown item".to_string()))?;
            if !item.kind.accepts_note() {
                return Err(invalid(format!("{} items do not take notes", item.kind)));
            }
            if note.chars().count() > NOTE_MAX_CHARS {
                return Err(invalid(format!("note is longer than {} characters", NOTE_MAX_CHARS)));
            }
        }
        Ok(())
    }
}

fn checkbox(id: &str, label: &str) -> EvaluationItem {
    EvaluationItem::new(id, label, ItemKind::Checkbox)
}

fn checkbox_with_text(id: &str, label: &str) -> EvaluationItem {
    EvaluationItem::new(id, label, ItemKind::CheckboxWithText)
}

fn currency(id: &str, label: &str) -> EvaluationItem {
    EvaluationItem::new(id, label, ItemKind::Currency).with_helper_text("Monthly amount")
}

fn standard_categories() -> Vec<EvaluationCategory> {
    use EvaluationItem as I;
    vec![
        EvaluationCategory::new("exteriors", "Exteriors", vec![
            I::rating("roof_condition", "Roof condition"),
            I::rating("exterior_walls_condition", "Exterior walls condition"),
            I::rating("foundation_visible", "Foundation (visible areas)"),
            I::rating("driveway_walkways", "Driveway & walkways"),
            I::rating("landscaping_grading", "Landscaping & grading"),
            I::rating("eavestroughs_downspouts", "Eavestroughs & downspouts"),
            I::rating("exterior_lighting", "Exterior lighting"),
        ]),
        EvaluationCategory::new("interiors", "Interiors", vec![
            I::rating("floors", "Floors"),
            I::rating("walls", "Walls"),
            I::rating("ceilings", "Ceilings"),
            I::rating("lighting", "Lighting"),
            I::rating("closet_spaces", "Closet spaces"),
            I::rating("doors_hardware", "Doors & hardware"),
            I::rating("trim", "Trim"),
            I::rating("stairs_railings", "Stairs & railings"),
            I::rating("windows_general", "Windows (general condition)"),
            I::rating("smoke_detectors", "Smoke detectors"),
            I::rating("co_detectors", "CO detectors"),
            I::rating("heating_vents", "Heating vents"),
            I::rating("return_vents", "Return vents"),
            I::rating("hallways", "Hallways"),
            I::rating("general_cleanliness", "General cleanliness"),
            I::rating("general_smell", "General smell"),
            I::rating("other_interior", "Other interior conditions"),
        ]),
        EvaluationCategory::new("kitchen", "Kitchen", vec![
            I::rating("cabinets", "Cabinets"),
            I::rating("countertops", "Countertops"),
            I::rating("appliances", "Appliances"),
            I::rating("sink_faucet", "Sink & faucet"),
            I::rating("water_flow", "Water flow"),
            I::rating("ventilation", "Ventilation"),
            I::rating("backsplash", "Backsplash"),
            I::rating("electrical_outlets", "Electrical outlets"),
            I::rating("storage", "Storage"),
            I::rating("lighting_kitchen", "Lighting"),
            I::rating("overall_functionality", "Overall functionality"),
        ]),
        EvaluationCategory::new("bathrooms", "Bathrooms", vec![
            I::rating("bathroom_fixtures", "Fixtures condition"),
            I::rating("bathroom_tiles", "Tiles & grout"),
            I::rating("bathroom_ventilation", "Ventilation"),
            I::rating("bathroom_water_pressure", "Water pressure"),
            I::rating("bathroom_storage", "Storage space"),
            I::rating("bathroom_lighting", "Lighting"),
            I::rating("shower_tub", "Shower/tub condition"),
            I::rating("vanity_condition", "Vanity & countertops"),
        ]),
        EvaluationCategory::new("home_systems", "Home Systems", vec![
            I::rating("hvac_condition", "HVAC system"),
            I::rating("electrical_condition", "Electrical system"),
            I::rating("plumbing_condition", "Plumbing system"),
            I::radio("water_heater_ownership", "Hot water heater ownership", &["Owned", "Leased"]),
            I::radio("water_heater_type", "Hot water heater type", &["Tank", "Tankless"]),
        ]),
        EvaluationCategory::new("smart_features", "Smart Home Features", vec![
            checkbox("smart_thermostat", "Smart thermostat"),
            checkbox("smart_lights", "Smart lights"),
            checkbox("smart_doorbell", "Smart doorbell"),
            checkbox("smart_locks", "Smart locks"),
            checkbox("security_cameras", "Security cameras"),
            checkbox_with_text("smart_other", "Other"),
        ]),
        EvaluationCategory::new("additional_features", "Additional Features", vec![
            checkbox("fireplace", "Fireplace"),
            checkbox("finished_basement", "Finished basement"),
            checkbox("garage", "Garage"),
            checkbox("deck", "Deck"),
            checkbox("backyard_features", "Backyard features"),
            checkbox_with_text("additional_other", "Other"),
        ]),
        EvaluationCategory::new("location", "Location", vec![
            I::rating("street_noise", "Street noise"),
            I::rating("privacy", "Privacy"),
            I::rating("sunlight", "Sunlight"),
            I::rating("parking", "Parking"),
            I::rating("walkability", "Walkability"),
            I::rating("transit", "Transit access"),
            I::rating("schools", "Schools nearby"),
            I::rating("grocery_stores", "Grocery stores"),
            I::rating("parks", "Parks & recreation"),
            I::rating("safety", "Safety"),
            I::rating("neighbourhood_feel", "Neighbourhood feel"),
        ]),
        EvaluationCategory::new("monthly_costs", "Monthly Costs", vec![
            currency("utilities_cost", "Utilities"),
            currency("insurance_cost", "Insurance"),
            currency("condo_fees", "Condo/POTL fees"),
            currency("other_costs", "Other costs"),
        ]),
        EvaluationCategory::new("other_observations", "Other Observations", vec![
            EvaluationItem::new("general_notes", "General observations", ItemKind::FreeText),
        ]),
    ]
}

lazy_static! {
    static ref STANDARD_SCHEMA: EvaluationSchema = EvaluationSchema {
        categories: standard_categories(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::answer::RatingTier;

    #[test]
    fn test_standard_schema_shape() {
        let schema = EvaluationSchema::standard();
        assert_eq!(schema.categories().len(), 10);
        assert_eq!(schema.item_count(), 76);
        assert_eq!(schema.score_bearing_item_count(), 57);
        assert_eq!(schema.categories()[0].id, "exteriors");
    }

    #[test]
    fn test_standard_schema_passes_validation() {
        let rebuilt = EvaluationSchema::new(standard_categories());
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dup_items = EvaluationSchema::new(vec![EvaluationCategory::new("ext", "Ext", vec![
            EvaluationItem::rating("roof", "Roof"),
            EvaluationItem::rating("roof", "Roof again"),
        ])]);
        assert!(matches!(dup_items, Err(EvalError::Validation(_))));

        let dup_categories = EvaluationSchema::new(vec![
            EvaluationCategory::new("ext", "Ext", vec![]),
            EvaluationCategory::new("ext", "Ext 2", vec![]),
        ]);
        assert!(matches!(dup_categories, Err(EvalError::Validation(_))));
    }

    #[test]
    fn test_validate_answer_kinds() {
        let schema = EvaluationSchema::standard();
        assert!(schema
            .validate_answer("exteriors", "roof_condition", &AnswerValue::Rating(RatingTier::Good))
            .is_ok());
        assert!(schema
            .validate_answer("exteriors", "roof_condition", &AnswerValue::Checkbox(true))
            .is_err());
        assert!(schema
            .validate_answer("home_systems", "water_heater_type", &AnswerValue::Radio("Tankless".into()))
            .is_ok());
        assert!(schema
            .validate_answer("home_systems", "water_heater_type", &AnswerValue::Radio("Solar".into()))
            .is_err());
        assert!(schema
            .validate_answer("monthly_costs", "condo_fees", &AnswerValue::Currency(-5.0))
            .is_err());
        assert!(matches!(
            schema.validate_answer("garden", "roses", &AnswerValue::Checkbox(true)),
            Err(EvalError::InvalidAnswer { reason, .. }) if reason == "unknown category"
        ));
    }

    #[test]
    fn test_validate_notes_targets() {
        let schema = EvaluationSchema::standard();
        let notes = ItemNotes::new()
            .with("exteriors", "roof_condition", "Shingles curling at the north edge")
            .with("home_systems", "water_heater_type", "Installed 2019");
        assert!(schema.validate_notes(&notes).is_ok());

        let on_checkbox = ItemNotes::new().with("smart_features", "smart_thermostat", "Nest");
        assert!(matches!(
            schema.validate_notes(&on_checkbox),
            Err(EvalError::InvalidAnswer { .. })
        ));

        let oversized: ItemNotes = serde_json::from_value(serde_json::json!({
            "exteriors": { "roof_condition": "x".repeat(NOTE_MAX_CHARS + 1) }
        }))
        .unwrap();
        assert!(schema.validate_notes(&oversized).is_err());
    }
}
