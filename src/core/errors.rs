// Custom error types for the predict pipeline
//
// One enum per upstream concern, plus PipelineError attributing a hard
// failure to the stage that produced it. Soft outcomes (a recipe miss, a
// translation falling back to source text) are not errors and never appear
// here.

use thiserror::Error;

/// Image normalization errors
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("could not decode uploaded image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("JPEG re-encoding failed: {0}")]
    Encode(#[source] image::ImageError),

    #[error("image task join failed: {0}")]
    Task(String),
}

/// Classification service errors
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("classifier returned a non-JSON body (status {status}): {snippet}")]
    InvalidJson { status: u16, snippet: String },

    #[error("classifier error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("model still loading after {attempts} attempts: {message}")]
    ModelLoading { attempts: u32, message: String },

    #[error("classifier returned no usable prediction")]
    NoPrediction,
}

/// Recipe search / detail errors
#[derive(Debug, Error)]
pub enum RecipeError {
    // No #[from]: the request URL carries the API key in its query string,
    // so construction must go through without_url()
    #[error("recipe API request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("recipe API returned a malformed body: {0}")]
    InvalidJson(String),

    #[error("recipe API error (status {status}): {message}")]
    Upstream { status: u16, message: String },
}

/// Translation service errors
///
/// These never abort a request; the caller degrades the affected field to its
/// source text.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation API error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("translation API returned a malformed body: {0}")]
    InvalidResponse(String),
}

/// Hard pipeline failures, tagged with the stage that raised them
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid image: {0}")]
    InvalidImage(#[source] ImageError),

    #[error("classification failed: {0}")]
    Classification(#[source] ClassifyError),

    #[error("recipe search failed: {0}")]
    Search(#[source] RecipeError),

    #[error("recipe detail fetch failed: {0}")]
    DetailFetch(#[source] RecipeError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid image config: {0}")]
    InvalidImageConfig(String),

    #[error("Invalid classifier config: {0}")]
    InvalidClassifierConfig(String),

    #[error("Invalid recipe config: {0}")]
    InvalidRecipeConfig(String),

    #[error("Invalid translation config: {0}")]
    InvalidTranslationConfig(String),
}
