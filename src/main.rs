// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use safevision_backend::{
    api::{start_server, AppState},
    config::ServiceConfig,
    vision::{DetectorProvider, DetrLoader},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting SafeVision backend...\n");
    println!("📦 {}", safevision_backend::version::get_version_string());
    println!("🏷️  Build: {}", safevision_backend::version::VERSION);
    println!();

    let config = ServiceConfig::parse();
    config.validate().context("Invalid configuration")?;

    let detector_config = config.detector_config();
    tracing::info!(
        "🧠 Detector: {} ({}), threshold {:.2}, device {:?}",
        detector_config.source.model_name(),
        detector_config.model_file,
        detector_config.confidence_threshold,
        detector_config.device
    );

    let provider = Arc::new(DetectorProvider::new(Arc::new(DetrLoader::new(
        detector_config,
    ))));

    if config.preload {
        println!("⏳ Preloading detection model...");
        provider
            .get()
            .await
            .context("Failed to preload detection model")?;
        println!("✅ Detection model ready\n");
    } else {
        tracing::info!("Model will be loaded on the first /infer request");
    }

    let state = AppState::new(provider, config.max_upload_bytes);
    start_server(&config, state).await
}
