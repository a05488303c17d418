// Request-scoped value types for the predict pipeline
//
// Everything here lives for one request/response cycle; nothing is shared
// across requests or mutated after construction.

use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;

/// Fallback title when the upstream omits one
pub const UNKNOWN_RECIPE_TITLE: &str = "Unknown Recipe";

/// Fallback instructions when the upstream omits them
pub const NO_INSTRUCTIONS_PLACEHOLDER: &str = "No instructions available.";

/// Label + confidence extracted from the classifier response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Lower-cased food label, `"unknown"` if the upstream omitted one
    pub label: String,
    /// Confidence score in [0, 1], 0 if the upstream omitted one
    pub confidence: f64,
}

/// Single ingredient in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// Synthesized "amount unit" string, trimmed, possibly empty
    pub amount: String,
}

/// Canonical recipe detail, independent of upstream field naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetail {
    pub title: String,
    pub image_url: Option<String>,
    pub instructions: String,
    pub ingredients: Vec<Ingredient>,
    pub source_url: Option<String>,
}

/// Recipe detail plus target-language copies of its text fields
///
/// The translated fields are absent when translation is disabled, leaving the
/// base detail shape unchanged on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeCard {
    #[serde(flatten)]
    pub detail: RecipeDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_translated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions_translated: Option<String>,
}

impl RecipeCard {
    /// Card without translated fields, as served when translation is disabled
    pub fn untranslated(detail: RecipeDetail) -> Self {
        Self {
            detail,
            title_translated: None,
            instructions_translated: None,
        }
    }
}

/// Terminal state of one pipeline run
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Classification and recipe lookup both succeeded
    Found {
        prediction: Prediction,
        /// Target-language label, present only when translation ran
        predicted_food_translated: Option<String>,
        recipe: RecipeCard,
    },
    /// Classification succeeded but no candidate query matched a recipe
    RecipeMiss { prediction: Prediction },
    /// A stage raised a hard failure
    Failed(PipelineError),
}

/// The uniform JSON envelope returned to clients regardless of outcome
///
/// `recipe_found` is always present; optional fields are omitted from the
/// JSON when unset rather than serialized as null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub recipe_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_food: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_food_translated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResponse {
    /// Bare error envelope, used for request-level rejections before the
    /// pipeline runs
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            recipe_found: false,
            predicted_food: None,
            predicted_food_translated: None,
            confidence: None,
            recipe: None,
            message: None,
            error: Some(message.into()),
        }
    }
}

impl PipelineOutcome {
    /// Assemble the response envelope; total over every terminal state
    pub fn into_envelope(self) -> PipelineResponse {
        match self {
            PipelineOutcome::Found {
                prediction,
                predicted_food_translated,
                recipe,
            } => PipelineResponse {
                recipe_found: true,
                predicted_food: Some(prediction.label),
                predicted_food_translated,
                confidence: Some(prediction.confidence),
                recipe: Some(recipe),
                message: None,
                error: None,
            },
            PipelineOutcome::RecipeMiss { prediction } => PipelineResponse {
                recipe_found: false,
                predicted_food: Some(prediction.label.clone()),
                predicted_food_translated: None,
                confidence: Some(prediction.confidence),
                recipe: None,
                message: Some(format!("No recipe found for {}", prediction.label)),
                error: None,
            },
            PipelineOutcome::Failed(err) => PipelineResponse::from_error(err.to_string()),
        }
    }
}
