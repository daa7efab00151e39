// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod alerts;
pub mod api;
pub mod config;
pub mod version;
pub mod vision;

pub use alerts::{Alert, AlertStore};
pub use api::{create_router, AppState};
pub use config::ServiceConfig;
pub use vision::{Detection, DetectorProvider, ObjectDetector};
