//! Quick pipeline test binary - run the photo-to-recipe flow on a local image
//! Run with: cargo run --release --bin test_predict -- <image_path>

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use smartchef::{core::Config, pipeline::PredictPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("smartchef=debug")
        .with_target(false)
        .init();

    // Get image path from args
    let args: Vec<String> = std::env::args().collect();
    let sample_path = if args.len() > 1 {
        args[1].clone()
    } else {
        "test_sample.jpg".to_string()
    };

    if !Path::new(&sample_path).exists() {
        eprintln!("Image not found: {}", sample_path);
        std::process::exit(1);
    }

    info!("Loading image: {}", sample_path);
    let image_bytes = std::fs::read(&sample_path)?;
    info!("Read {} bytes", image_bytes.len());

    let config = Arc::new(Config::new()?);
    let pipeline = PredictPipeline::new(config, None)?;

    info!("\n=== Running pipeline ===");
    let envelope = pipeline.run(image_bytes).await.into_envelope();

    println!("\n=== Results ===");
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    Ok(())
}
