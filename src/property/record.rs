//! Property record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};
use crate::evaluation::{AnswerSet, EvaluationStatus, EvaluationSummary, ItemNotes};

/// Buyer's stated disposition toward making an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferIntent {
    Yes,
    Maybe,
    No,
    #[default]
    Unset,
}

impl OfferIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferIntent::Yes => "yes",
            OfferIntent::Maybe => "maybe",
            OfferIntent::No => "no",
            OfferIntent::Unset => "unset",
        }
    }
}

impl std::fmt::Display for OfferIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for OfferIntent {
    fn from(s: String) -> Self {
        match s.as_str() {
            "yes" => OfferIntent::Yes,
            "maybe" => OfferIntent::Maybe,
            "no" => OfferIntent::No,
            _ => OfferIntent::Unset,
        }
    }
}

/// Key used for duplicate-address detection
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// A candidate property owned by one user's workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub user_id: String,
    pub workspace_id: String,
    pub address: String,
    pub neighborhood: Option<String>,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub year_built: Option<i32>,
    pub property_taxes: Option<f64>,
    pub square_footage: Option<u32>,
    pub favorite: bool,
    pub compare_selected: bool,
    pub evaluation_status: EvaluationStatus,
    pub offer_intent: OfferIntent,
    /// Derived from `answers`; only changes through an evaluation save
    pub overall_rating: f64,
    #[serde(default)]
    pub answers: AnswerSet,
    #[serde(default)]
    pub notes: ItemNotes,
    pub primary_photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User input for a new property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub address: String,
    pub neighborhood: Option<String>,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub year_built: Option<i32>,
    pub property_taxes: Option<f64>,
    pub square_footage: Option<u32>,
    pub primary_photo: Option<String>,
}

impl NewProperty {
    pub fn new(address: impl Into<String>, price: f64) -> Self {
        Self {
            address: address.into(),
            price,
            ..Default::default()
        }
    }

    pub fn with_rooms(mut self, bedrooms: u32, bathrooms: f32) -> Self {
        self.bedrooms = bedrooms;
        self.bathrooms = bathrooms;
        self
    }

    pub fn with_neighborhood(mut self, neighborhood: impl Into<String>) -> Self {
        self.neighborhood = Some(neighborhood.into());
        self
    }

    pub fn validate(&self) -> EvalResult<()> {
        validate_address(&self.address)?;
        validate_price(self.price)?;
        validate_bathrooms(self.bathrooms)?;
        validate_optional_amount("property taxes", self.property_taxes)
    }
}

/// A fully-defaulted record awaiting an id and timestamps from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub user_id: String,
    pub workspace_id: String,
    pub address: String,
    pub neighborhood: Option<String>,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub year_built: Option<i32>,
    pub property_taxes: Option<f64>,
    pub square_footage: Option<u32>,
    pub favorite: bool,
    pub compare_selected: bool,
    pub evaluation_status: EvaluationStatus,
    pub offer_intent: OfferIntent,
    pub overall_rating: f64,
    pub primary_photo: Option<String>,
}

impl PropertyDraft {
    pub fn new(user_id: impl Into<String>, workspace_id: impl Into<String>, input: NewProperty) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_id: workspace_id.into(),
            address: input.address.trim().to_string(),
            neighborhood: input.neighborhood.filter(|n| !n.trim().is_empty()),
            price: input.price,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            year_built: input.year_built,
            property_taxes: input.property_taxes,
            square_footage: input.square_footage,
            favorite: false,
            compare_selected: false,
            evaluation_status: EvaluationStatus::NotStarted,
            offer_intent: OfferIntent::Unset,
            overall_rating: 0.0,
            primary_photo: input.primary_photo,
        }
    }

    /// Materialize the draft with store-assigned identity
    pub fn into_record(self, id: impl Into<String>, now: DateTime<Utc>) -> PropertyRecord {
        PropertyRecord {
            id: id.into(),
            user_id: self.user_id,
            workspace_id: self.workspace_id,
            address: self.address,
            neighborhood: self.neighborhood,
            price: self.price,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            year_built: self.year_built,
            property_taxes: self.property_taxes,
            square_footage: self.square_footage,
            favorite: self.favorite,
            compare_selected: self.compare_selected,
            evaluation_status: self.evaluation_status,
            offer_intent: self.offer_intent,
            overall_rating: self.overall_rating,
            answers: AnswerSet::new(),
            notes: ItemNotes::new(),
            primary_photo: self.primary_photo,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial changes to a property record.
///
/// Derived evaluation fields can only be set through
/// [`PropertyPatch::evaluation`], which keeps the rating tied to its answers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    address: Option<String>,
    neighborhood: Option<Option<String>>,
    price: Option<f64>,
    bedrooms: Option<u32>,
    bathrooms: Option<f32>,
    year_built: Option<Option<i32>>,
    property_taxes: Option<Option<f64>>,
    square_footage: Option<Option<u32>>,
    favorite: Option<bool>,
    compare_selected: Option<bool>,
    offer_intent: Option<OfferIntent>,
    primary_photo: Option<Option<String>>,
    evaluation: Option<(AnswerSet, EvaluationSummary)>,
    notes: Option<ItemNotes>,
}

impl PropertyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into().trim().to_string());
        self
    }

    pub fn neighborhood(mut self, neighborhood: Option<String>) -> Self {
        self.neighborhood = Some(neighborhood);
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn bedrooms(mut self, bedrooms: u32) -> Self {
        self.bedrooms = Some(bedrooms);
        self
    }

    pub fn bathrooms(mut self, bathrooms: f32) -> Self {
        self.bathrooms = Some(bathrooms);
        self
    }

    pub fn year_built(mut self, year: Option<i32>) -> Self {
        self.year_built = Some(year);
        self
    }

    pub fn property_taxes(mut self, taxes: Option<f64>) -> Self {
        self.property_taxes = Some(taxes);
        self
    }

    pub fn square_footage(mut self, area: Option<u32>) -> Self {
        self.square_footage = Some(area);
        self
    }

    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = Some(favorite);
        self
    }

    pub fn compare_selected(mut self, selected: bool) -> Self {
        self.compare_selected = Some(selected);
        self
    }

    pub fn offer_intent(mut self, intent: OfferIntent) -> Self {
        self.offer_intent = Some(intent);
        self
    }

    pub fn primary_photo(mut self, photo: Option<String>) -> Self {
        self.primary_photo = Some(photo);
        self
    }

    /// Answers together with the figures derived from them
    pub(crate) fn evaluation(mut self, answers: AnswerSet, summary: EvaluationSummary) -> Self {
        self.evaluation = Some((answers, summary));
        self
    }

    /// Item notes, checked against the catalogue by the caller
    pub(crate) fn notes(mut self, notes: ItemNotes) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The address this patch sets, if any
    pub fn address_change(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// The compare flag this patch sets, if any
    pub fn compare_selected_change(&self) -> Option<bool> {
        self.compare_selected
    }

    pub fn validate(&self) -> EvalResult<()> {
        if let Some(address) = &self.address {
            validate_address(address)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(bathrooms) = self.bathrooms {
            validate_bathrooms(bathrooms)?;
        }
        if let Some(taxes) = self.property_taxes {
            validate_optional_amount("property taxes", taxes)?;
        }
        Ok(())
    }

    /// Write every field present in the patch onto `record`
    pub fn apply_to(&self, record: &mut PropertyRecord) {
        if let Some(address) = &self.address {
            record.address = address.clone();
        }
        if let Some(neighborhood) = &self.neighborhood {
            record.neighborhood = neighborhood.clone();
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(bedrooms) = self.bedrooms {
            record.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            record.bathrooms = bathrooms;
        }
        if let Some(year) = self.year_built {
            record.year_built = year;
        }
        if let Some(taxes) = self.property_taxes {
            record.property_taxes = taxes;
        }
        if let Some(area) = self.square_footage {
            record.square_footage = area;
        }
        if let Some(favorite) = self.favorite {
            record.favorite = favorite;
        }
        if let Some(selected) = self.compare_selected {
            record.compare_selected = selected;
        }
        if let Some(intent) = self.offer_intent {
            record.offer_intent = intent;
        }
        if let Some(photo) = &self.primary_photo {
            record.primary_photo = photo.clone();
        }
        if let Some((answers, summary)) = &self.evaluation {
            record.answers = answers.clone();
            record.overall_rating = summary.overall_rating;
            record.evaluation_status = summary.status;
        }
        if let Some(notes) = &self.notes {
            record.notes = notes.clone();
        }
    }
}

fn validate_address(address: &str) -> EvalResult<()> {
    if address.trim().is_empty() {
        return Err(EvalError::Validation("Address is required".to_string()));
    }
    Ok(())
}

fn validate_price(price: f64) -> EvalResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(EvalError::Validation("Price must be greater than 0".to_string()));
    }
    Ok(())
}

fn validate_bathrooms(bathrooms: f32) -> EvalResult<()> {
    if !bathrooms.is_finite() || bathrooms < 0.0 {
        return Err(EvalError::Validation("Bathrooms cannot be negative".to_string()));
    }
    Ok(())
}

fn validate_optional_amount(field: &str, amount: Option<f64>) -> EvalResult<()> {
    match amount {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(EvalError::Validation(format!("{} cannot be negative", field)))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{AnswerValue, RatingTier, ScoreAggregator};

    fn sample_record() -> PropertyRecord {
        PropertyDraft::new("user-1", "ws-1", NewProperty::new("  12 Elm St ", 650_000.0).with_rooms(3, 2.0))
            .into_record("home-1", Utc::now())
    }

    #[test]
    fn test_draft_defaults() {
        let record = sample_record();
        assert_eq!(record.address, "12 Elm St");
        assert!(!record.favorite);
        assert!(!record.compare_selected);
        assert_eq!(record.evaluation_status, EvaluationStatus::NotStarted);
        assert_eq!(record.offer_intent, OfferIntent::Unset);
        assert_eq!(record.overall_rating, 0.0);
        assert!(record.answers.is_empty());
    }

    #[test]
    fn test_new_property_validation() {
        assert!(NewProperty::new("12 Elm St", 1.0).validate().is_ok());
        assert!(matches!(NewProperty::new("   ", 1.0).validate(), Err(EvalError::Validation(_))));
        assert!(matches!(NewProperty::new("12 Elm St", 0.0).validate(), Err(EvalError::Validation(_))));
        assert!(matches!(NewProperty::new("12 Elm St", -10.0).validate(), Err(EvalError::Validation(_))));
        assert!(NewProperty::new("12 Elm St", 1.0).with_rooms(0, -1.0).validate().is_err());
    }

    #[test]
    fn test_patch_apply_touches_only_present_fields() {
        let mut record = sample_record();
        let before = record.clone();
        PropertyPatch::new().favorite(true).neighborhood(Some("Leslieville".into())).apply_to(&mut record);

        assert!(record.favorite);
        assert_eq!(record.neighborhood.as_deref(), Some("Leslieville"));
        assert_eq!(record.price, before.price);
        assert_eq!(record.compare_selected, before.compare_selected);
    }

    #[test]
    fn test_patch_validation() {
        assert!(PropertyPatch::new().price(0.0).validate().is_err());
        assert!(PropertyPatch::new().address(" ").validate().is_err());
        assert!(PropertyPatch::new().property_taxes(Some(-1.0)).validate().is_err());
        assert!(PropertyPatch::new().price(500_000.0).validate().is_ok());
        assert!(PropertyPatch::new().is_empty());
    }

    #[test]
    fn test_evaluation_patch_sets_derived_fields() {
        let answers = AnswerSet::new().with("exteriors", "roof_condition", AnswerValue::Rating(RatingTier::Good));
        let summary = ScoreAggregator::default().summarize(&answers);
        let mut record = sample_record();
        PropertyPatch::new().evaluation(answers.clone(), summary).apply_to(&mut record);

        assert_eq!(record.overall_rating, 5.0);
        assert_eq!(record.evaluation_status, EvaluationStatus::InProgress);
        assert_eq!(record.answers, answers);
    }

    #[test]
    fn test_optional_fields_set_and_cleared() {
        let mut record = PropertyDraft::new(
            "user-1",
            "ws-1",
            NewProperty::new("3 Pine Rd", 410_000.0).with_neighborhood("  "),
        )
        .into_record("home-2", Utc::now());
        assert!(record.neighborhood.is_none());

        PropertyPatch::new()
            .year_built(Some(1962))
            .square_footage(Some(1_450))
            .primary_photo(Some("photos/front.jpg".into()))
            .apply_to(&mut record);
        assert_eq!(record.year_built, Some(1962));
        assert_eq!(record.square_footage, Some(1_450));
        assert_eq!(record.primary_photo.as_deref(), Some("photos/front.jpg"));

        PropertyPatch::new().year_built(None).primary_photo(None).apply_to(&mut record);
        assert_eq!(record.year_built, None);
        assert_eq!(record.primary_photo, None);
        assert_eq!(record.square_footage, Some(1_450));
    }

    #[test]
    fn test_patch_reports_address_and_compare_changes() {
        let patch = PropertyPatch::new().address("  9 Birch Ln ").compare_selected(true);
        assert_eq!(patch.address_change(), Some("9 Birch Ln"));
        assert_eq!(patch.compare_selected_change(), Some(true));
        assert_eq!(PropertyPatch::new().favorite(true).address_change(), None);
    }

    #[test]
    fn test_notes_patch_leaves_answers_alone() {
        let mut record = sample_record();
        let notes = ItemNotes::new().with("kitchen", "cabinets", "Original 1990s oak");
        PropertyPatch::new().notes(notes.clone()).apply_to(&mut record);

        assert_eq!(record.notes, notes);
        assert!(record.answers.is_empty());
        assert_eq!(record.overall_rating, 0.0);
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("  12 ELM st "), normalize_address("12 elm St"));
    }
}
