//! Answer types
//!
//! One `AnswerValue` per checklist item, tagged with the kind of item it
//! answers so it can be checked against the catalogue.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::schema::ItemKind;

/// Three-tier condition rating for score-bearing items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingTier {
    Good,
    Fair,
    Poor,
}

impl RatingTier {
    /// Points contributed to the overall rating
    pub fn points(&self) -> u32 {
        match self {
            RatingTier::Good => 5,
            RatingTier::Fair => 3,
            RatingTier::Poor => 1,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "good" => Some(RatingTier::Good),
            "fair" => Some(RatingTier::Fair),
            "poor" => Some(RatingTier::Poor),
            _ => None,
        }
    }
}

impl std::fmt::Display for RatingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingTier::Good => write!(f, "good"),
            RatingTier::Fair => write!(f, "fair"),
            RatingTier::Poor => write!(f, "poor"),
        }
    }
}

/// A checkbox that may carry a free-text description instead of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoolOrText {
    Checked(bool),
    Text(String),
}

/// An answer to a single checklist item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Rating(RatingTier),
    Radio(String),
    Checkbox(bool),
    CheckboxWithText(BoolOrText),
    Currency(f64),
    FreeText(String),
}

impl AnswerValue {
    /// The item kind this answer belongs to
    pub fn kind(&self) -> ItemKind {
        match self {
            AnswerValue::Rating(_) => ItemKind::Rating,
            AnswerValue::Radio(_) => ItemKind::Radio,
            AnswerValue::Checkbox(_) => ItemKind::Checkbox,
            AnswerValue::CheckboxWithText(_) => ItemKind::CheckboxWithText,
            AnswerValue::Currency(_) => ItemKind::Currency,
            AnswerValue::FreeText(_) => ItemKind::FreeText,
        }
    }

    /// Whether the answer counts towards completion.
    ///
    /// Empty strings are treated as unanswered; `false` and `0` are answers.
    pub fn is_present(&self) -> bool {
        match self {
            AnswerValue::Radio(s) | AnswerValue::FreeText(s) => !s.is_empty(),
            AnswerValue::CheckboxWithText(BoolOrText::Text(s)) => !s.is_empty(),
            AnswerValue::Currency(v) => !v.is_nan(),
            AnswerValue::Rating(_) | AnswerValue::Checkbox(_) | AnswerValue::CheckboxWithText(BoolOrText::Checked(_)) => true,
        }
    }

    /// Parse user input for an item of the given kind
    pub fn parse(kind: ItemKind, raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        match kind {
            ItemKind::Rating => RatingTier::parse(trimmed)
                .map(AnswerValue::Rating)
                .ok_or_else(|| format!("'{}' is not one of good, fair, poor", trimmed)),
            ItemKind::Radio => Ok(AnswerValue::Radio(trimmed.to_string())),
            ItemKind::Checkbox => parse_flag(trimmed)
                .map(AnswerValue::Checkbox)
                .ok_or_else(|| format!("'{}' is not yes or no", trimmed)),
            ItemKind::CheckboxWithText => Ok(AnswerValue::CheckboxWithText(match parse_flag(trimmed) {
                Some(flag) => BoolOrText::Checked(flag),
                None => BoolOrText::Text(trimmed.to_string()),
            })),
            ItemKind::Currency => trimmed
                .trim_start_matches('$')
                .replace(',', "")
                .parse::<f64>()
                .map(AnswerValue::Currency)
                .map_err(|_| format!("'{}' is not an amount", trimmed)),
            ItemKind::FreeText => Ok(AnswerValue::FreeText(raw.to_string())),
        }
    }

    pub fn rating_tier(&self) -> Option<RatingTier> {
        match self {
            AnswerValue::Rating(tier) => Some(*tier),
            _ => None,
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Sparse answers keyed by category id, then item id.
///
/// An item missing from the map is unanswered, which is distinct from any
/// falsy answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, BTreeMap<String, AnswerValue>>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category_id: &str, item_id: &str) -> Option<&AnswerValue> {
        self.0.get(category_id).and_then(|items| items.get(item_id))
    }

    /// Record an answer, replacing any previous one for the same item
    pub fn set(&mut self, category_id: impl Into<String>, item_id: impl Into<String>, value: AnswerValue) {
        self.0.entry(category_id.into()).or_default().insert(item_id.into(), value);
    }

    /// Builder form of [`AnswerSet::set`]
    pub fn with(mut self, category_id: impl Into<String>, item_id: impl Into<String>, value: AnswerValue) -> Self {
        self.set(category_id, item_id, value);
        self
    }

    /// Remove an answer, returning it if one was recorded
    pub fn clear(&mut self, category_id: &str, item_id: &str) -> Option<AnswerValue> {
        let items = self.0.get_mut(category_id)?;
        let removed = items.remove(item_id);
        if items.is_empty() {
            self.0.remove(category_id);
        }
        removed
    }

    /// Iterate `(category_id, item_id, value)` triples
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &AnswerValue)> {
        self.0.iter().flat_map(|(category, items)| {
            items.iter().map(move |(item, value)| (category.as_str(), item.as_str(), value))
        })
    }

    pub fn len(&self) -> usize {
        self.0.values().map(|items| items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Longest note kept per item, in characters
pub const NOTE_MAX_CHARS: usize = 500;

/// Optional observations attached to rating and radio items.
///
/// Keyed like [`AnswerSet`] but kept apart from it: a note is never an
/// answer and has no effect on rating or completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemNotes(BTreeMap<String, BTreeMap<String, String>>);

impl ItemNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category_id: &str, item_id: &str) -> Option<&str> {
        self.0
            .get(category_id)
            .and_then(|items| items.get(item_id))
            .map(String::as_str)
    }

    /// Store a note, cut to [`NOTE_MAX_CHARS`]. A blank note removes it.
    pub fn set(&mut self, category_id: impl Into<String>, item_id: impl Into<String>, note: impl Into<String>) {
        let category_id = category_id.into();
        let item_id = item_id.into();
        let note: String = note.into().chars().take(NOTE_MAX_CHARS).collect();
        if note.trim().is_empty() {
            self.clear(&category_id, &item_id);
            return;
        }
        self.0.entry(category_id).or_default().insert(item_id, note);
    }

    pub fn with(
        mut self,
        category_id: impl Into<String>,
        item_id: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        self.set(category_id, item_id, note);
        self
    }

    pub fn clear(&mut self, category_id: &str, item_id: &str) -> Option<String> {
        let items = self.0.get_mut(category_id)?;
        let removed = items.remove(item_id);
        if items.is_empty() {
            self.0.remove(category_id);
        }
        removed
    }

    /// Iterate `(category_id, item_id, note)` triples
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.0.iter().flat_map(|(category, items)| {
            items
                .iter()
                .map(move |(item, note)| (category.as_str(), item.as_str(), note.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.0.values().map(|items| items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
