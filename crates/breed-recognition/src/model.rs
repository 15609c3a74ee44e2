use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The two animal categories the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnimalCategory {
    Cattle,
    Buffalo,
}

impl AnimalCategory {
    /// Catalog order: cattle first, then buffalo.
    pub const ALL: [AnimalCategory; 2] = [AnimalCategory::Cattle, AnimalCategory::Buffalo];

    pub fn as_str(self) -> &'static str {
        match self {
            AnimalCategory::Cattle => "cattle",
            AnimalCategory::Buffalo => "buffalo",
        }
    }

    /// Exact match against the lower-case category name, ignoring surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for AnimalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry describing one breed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BreedRecord {
    /// Canonical display name, e.g. "Red Sindhi".
    pub name: String,
    pub origin: String,
    pub utility: String,
    pub traits: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horn_shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// Body of a recognition call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecognitionRequest {
    /// Image as base64 text, or a `data:image/...;base64,` URL.
    pub image_base64: String,
    /// Optional hint: "cattle" or "buffalo".
    #[serde(default)]
    pub animal_type: Option<String>,
}

/// Fields pulled out of the classifier's labeled reply, before any catalog lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    pub image_quality: Option<String>,
    /// Lower-cased, not yet checked against the known categories.
    pub animal_type: Option<String>,
    pub breed_name_raw: Option<String>,
    pub confidence: Option<String>,
    pub reasoning: Option<String>,
    /// Comma-delimited candidate breeds as written by the classifier.
    pub alternatives_raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BreedSuggestion {
    pub breed: String,
    pub confidence: String,
    /// The classifier's original text for this candidate.
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed_info: Option<BreedRecord>,
}

/// Final answer for one recognition call.
///
/// `alternative_breeds` is absent, never empty, when no candidate resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecognitionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed_info: Option<BreedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_breeds: Option<Vec<BreedSuggestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognitionResult {
    /// A failed recognition: only `success=false` and the error description are set.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            breed: None,
            animal_type: None,
            confidence: None,
            breed_info: None,
            alternative_breeds: None,
            image_quality: None,
            reasoning: None,
            error: Some(error.into()),
        }
    }
}

/// Every catalog breed, per category, in catalog order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BreedListing {
    pub cattle: Vec<BreedRecord>,
    pub buffalo: Vec<BreedRecord>,
}

/// Model ids offered by the classifier host.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelList {
    pub models: Vec<String>,
}
