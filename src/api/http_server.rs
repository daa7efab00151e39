// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::alerts::{create_alert_handler, list_alerts_handler};
use super::handlers::health_handler;
use super::infer::infer_handler;
use crate::alerts::AlertStore;
use crate::config::ServiceConfig;
use crate::vision::{DetectorProvider, ObjectDetector};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<DetectorProvider>,
    pub alerts: Arc<AlertStore>,
    /// Largest accepted image upload
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(detector: Arc<DetectorProvider>, max_upload_bytes: usize) -> Self {
        Self {
            detector,
            alerts: Arc::new(AlertStore::new()),
            max_upload_bytes,
        }
    }

    /// State around an already constructed detector
    pub fn with_detector(detector: Arc<dyn ObjectDetector>, max_upload_bytes: usize) -> Self {
        Self::new(
            Arc::new(DetectorProvider::preloaded(detector)),
            max_upload_bytes,
        )
    }
}

/// CORS policy: only the listed origins, with credentials, any method or header
pub fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health_handler))
        .route("/infer", post(infer_handler))
        .route(
            "/api/alerts",
            get(list_alerts_handler).post(create_alert_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: &ServiceConfig, state: AppState) -> anyhow::Result<()> {
    let cors = cors_layer(config.cors_origin_values()?);
    let app = create_router(state, cors);

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind {}", addr))?;

    tracing::info!("🌐 SafeVision API listening on http://{}", addr);
    tracing::info!("   CORS origins: {}", config.cors_origins.join(", "));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
