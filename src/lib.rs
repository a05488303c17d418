// Library exports for the food photo to recipe workflow

// Core modules
pub mod core;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use self::core::{
    config::Config,
    errors::{
        ClassifyError, ConfigError, ImageError, PipelineError, RecipeError, TranslationError,
    },
    types::{
        Ingredient, PipelineOutcome, PipelineResponse, Prediction, RecipeCard, RecipeDetail,
    },
};

pub use pipeline::{PredictPipeline, RecipeResolver};

pub use services::{ClassifierClient, RecipeClient, TranslationClient};

pub use utils::{normalize_to_jpeg, normalize_to_jpeg_async, Metrics};
