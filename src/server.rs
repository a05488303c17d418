// HTTP layer: shared state, routes, and handlers

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::core::config::Config;
use crate::core::types::PipelineResponse;
use crate::pipeline::PredictPipeline;
use crate::utils::Metrics;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<PredictPipeline>,
    pub metrics: Metrics,
}

/// Build the application router with all routes and layers attached
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/stats", get(stats_endpoint))
        .route("/predict", post(predict))
        .with_state(state)
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024)) // 25MB uploads
        .layer(cors)
}

async fn root(State(state): State<AppState>) -> &'static str {
    state.metrics.record_endpoint_request("/");
    "SmartChef Recipe Backend"
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.metrics.record_endpoint_request("/health");
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.classifier.model,
        "translation_enabled": state.config.translation.enabled,
    }))
}

/// Prometheus metrics endpoint
async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.record_endpoint_request("/metrics");
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// Detailed statistics endpoint (JSON)
async fn stats_endpoint(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state.metrics.record_endpoint_request("/stats");
    let snapshot = state.metrics.snapshot();
    serde_json::to_value(snapshot).map(Json).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serialize metrics: {}", e),
        )
    })
}

/// Predict endpoint
///
/// # Request Format:
/// - multipart/form-data
/// - Field "file": One image file (PNG/JPEG/WebP)
///
/// # Response:
/// Uniform envelope JSON. Pipeline failures are reported inside the envelope
/// with HTTP 200; only malformed requests get a 4xx.
async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PipelineResponse>, (StatusCode, Json<PipelineResponse>)> {
    let start_time = std::time::Instant::now();
    state.metrics.record_endpoint_request("/predict");

    let mut upload: Option<Vec<u8>> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Read error: {}", e)))?;

            info!("Received upload {:?} ({} bytes)", filename, data.len());
            upload = Some(data.to_vec());
            break;
        }
    }

    let Some(image_bytes) = upload else {
        return Err(bad_request("No file field in multipart request"));
    };
    if image_bytes.is_empty() {
        return Err(bad_request("Uploaded file is empty"));
    }

    let envelope = state.pipeline.run(image_bytes).await.into_envelope();

    info!(
        "Request completed in {:.2}s: recipe_found={}",
        start_time.elapsed().as_secs_f64(),
        envelope.recipe_found
    );

    Ok(Json(envelope))
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<PipelineResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(PipelineResponse::from_error(message)),
    )
}
