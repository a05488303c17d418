use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::core::config::Config;
use crate::core::errors::PipelineError;
use crate::core::types::{PipelineOutcome, RecipeCard};
use crate::pipeline::resolver::RecipeResolver;
use crate::services::{ClassifierClient, RecipeClient, TranslationClient};
use crate::utils::{normalize_to_jpeg_async, Metrics};

/// End-to-end photo-to-recipe pipeline
///
/// Stages run strictly in sequence per request:
/// 1. Normalize the upload to a bounded JPEG
/// 2. Classify the dish
/// 3. Resolve the label to a recipe id
/// 4. Fetch recipe detail
/// 5. Translate display fields (optional)
pub struct PredictPipeline {
    config: Arc<Config>,
    classifier: ClassifierClient,
    recipes: Arc<RecipeClient>,
    resolver: RecipeResolver,
    translator: Option<TranslationClient>,
    metrics: Option<Metrics>,
}

impl PredictPipeline {
    pub fn new(config: Arc<Config>, metrics: Option<Metrics>) -> Result<Self> {
        let classifier = ClassifierClient::new(Arc::clone(&config), metrics.clone())?;
        let recipes = Arc::new(RecipeClient::new(Arc::clone(&config), metrics.clone())?);
        let resolver = RecipeResolver::new(Arc::clone(&config), Arc::clone(&recipes));
        let translator = if config.translation.enabled {
            Some(TranslationClient::new(Arc::clone(&config), metrics.clone())?)
        } else {
            None
        };

        Ok(Self {
            config,
            classifier,
            recipes,
            resolver,
            translator,
            metrics,
        })
    }

    /// Run the pipeline on a raw upload.
    ///
    /// Always returns an outcome; hard failures land in
    /// `PipelineOutcome::Failed` instead of propagating.
    #[instrument(skip(self, image_bytes), fields(bytes = image_bytes.len()))]
    pub async fn run(&self, image_bytes: Vec<u8>) -> PipelineOutcome {
        match self.execute(image_bytes).await {
            Ok(outcome) => {
                if let Some(ref metrics) = self.metrics {
                    match outcome {
                        PipelineOutcome::Found { .. } => metrics.record_recipe_found(),
                        PipelineOutcome::RecipeMiss { .. } => metrics.record_recipe_miss(),
                        PipelineOutcome::Failed(_) => metrics.record_pipeline_failure(),
                    }
                }
                outcome
            }
            Err(e) => {
                error!("pipeline failed: {e}");
                if let Some(ref metrics) = self.metrics {
                    metrics.record_pipeline_failure();
                }
                PipelineOutcome::Failed(e)
            }
        }
    }

    async fn execute(&self, image_bytes: Vec<u8>) -> Result<PipelineOutcome, PipelineError> {
        let started = Instant::now();
        let jpeg = normalize_to_jpeg_async(
            image_bytes,
            self.config.image.max_dimension,
            self.config.image.jpeg_quality,
        )
        .await
        .map_err(PipelineError::InvalidImage)?;
        if let Some(ref metrics) = self.metrics {
            metrics.record_normalize_duration(started.elapsed());
        }

        let started = Instant::now();
        let prediction = self
            .classifier
            .classify(&jpeg)
            .await
            .map_err(PipelineError::Classification)?;
        if let Some(ref metrics) = self.metrics {
            metrics.record_classify_duration(started.elapsed());
        }
        info!(
            "predicted {:?} (confidence {:.3})",
            prediction.label, prediction.confidence
        );

        let started = Instant::now();
        let recipe_id = self
            .resolver
            .resolve(&prediction.label)
            .await
            .map_err(PipelineError::Search)?;
        if let Some(ref metrics) = self.metrics {
            metrics.record_resolve_duration(started.elapsed());
        }

        let Some(recipe_id) = recipe_id else {
            info!("no recipe matched {:?}", prediction.label);
            return Ok(PipelineOutcome::RecipeMiss { prediction });
        };

        let started = Instant::now();
        let detail = self
            .recipes
            .information(recipe_id)
            .await
            .map_err(PipelineError::DetailFetch)?;
        if let Some(ref metrics) = self.metrics {
            metrics.record_detail_duration(started.elapsed());
        }
        info!("recipe {}: {:?}", recipe_id, detail.title);

        let (predicted_food_translated, recipe) = match self.translator {
            Some(ref translator) => {
                let started = Instant::now();
                let label = translator.translate_or_original(&prediction.label).await;
                let title = translator.translate_or_original(&detail.title).await;
                let instructions = translator.translate_or_original(&detail.instructions).await;
                if let Some(ref metrics) = self.metrics {
                    metrics.record_translate_duration(started.elapsed());
                }
                (
                    Some(label),
                    RecipeCard {
                        detail,
                        title_translated: Some(title),
                        instructions_translated: Some(instructions),
                    },
                )
            }
            None => (None, RecipeCard::untranslated(detail)),
        };

        Ok(PipelineOutcome::Found {
            prediction,
            predicted_food_translated,
            recipe,
        })
    }
}
