pub mod orchestrator;
pub mod resolver;

pub use orchestrator::PredictPipeline;
pub use resolver::RecipeResolver;
