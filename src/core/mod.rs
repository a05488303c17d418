pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{
    ClassifyError, ConfigError, ImageError, PipelineError, RecipeError, TranslationError,
};
pub use types::{
    Ingredient, PipelineOutcome, PipelineResponse, Prediction, RecipeCard, RecipeDetail,
};
