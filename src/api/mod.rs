// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod alerts;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod infer;

pub use alerts::{create_alert_handler, list_alerts_handler, CreateAlertRequest};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{health_handler, HealthResponse};
pub use http_server::{cors_layer, create_router, start_server, AppState};
pub use infer::{infer_handler, InferenceResponse};
