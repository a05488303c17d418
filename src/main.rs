// Main entry point for the food photo to recipe workflow

use smartchef::{
    core::Config,
    pipeline::PredictPipeline,
    server::{router, AppState},
    utils::Metrics,
};

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Arc::new(Config::new().expect("Failed to load configuration"));

    // Initialize logging
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!("smartchef={}", config.server.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("=== SMARTCHEF RECIPE BACKEND ===");
    info!(
        "Config: model={} max_dim={} quality={} translation={}",
        config.classifier.model,
        config.image.max_dimension,
        config.image.jpeg_quality,
        if config.translation.enabled { "ON" } else { "OFF" }
    );

    if config.classifier.api_key.is_empty() {
        warn!("HUGGINGFACE_API_KEY is not set; classification requests will be rejected upstream");
    }
    if config.recipes.api_key.is_empty() {
        warn!("SPOONACULAR_API_KEY is not set; recipe lookups will be rejected upstream");
    }

    // Initialize metrics
    let metrics = Metrics::new();

    // Initialize pipeline
    info!("Initializing prediction pipeline...");
    let pipeline = Arc::new(PredictPipeline::new(config.clone(), Some(metrics.clone()))?);

    let app = router(AppState {
        config: config.clone(),
        pipeline,
        metrics,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("{}", "=".repeat(70));
    info!("Server starting on http://{}", addr);
    info!("{}", "-".repeat(70));
    info!("Endpoints:");
    info!("  GET  /         - Root endpoint");
    info!("  GET  /health   - Health check");
    info!("  GET  /metrics  - Prometheus metrics");
    info!("  GET  /stats    - Detailed statistics");
    info!("  POST /predict  - Identify a dish and fetch its recipe (multipart/form-data)");
    info!("{}", "=".repeat(70));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
