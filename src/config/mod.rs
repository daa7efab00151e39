// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration from command-line flags and environment variables

use anyhow::{bail, Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::vision::image_utils::DEFAULT_MAX_IMAGE_SIZE;
use crate::vision::model_manager::{
    DEFAULT_MODEL_FILE, DEFAULT_MODEL_REPO, DEFAULT_MODEL_REVISION,
};
use crate::vision::{
    validate_threshold, DetectorConfig, DevicePreference, ModelSource,
    DEFAULT_CONFIDENCE_THRESHOLD,
};

/// Origins of the development dashboard
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://127.0.0.1:5173"];

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
}

/// SafeVision detection service
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "safevision-backend")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Object detection HTTP service backed by DETR", long_about = None)]
pub struct ServiceConfig {
    /// Address to listen on
    #[arg(long, env = "SAFEVISION_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "SAFEVISION_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Hugging Face repository with the ONNX export of the model
    #[arg(long, env = "SAFEVISION_MODEL_REPO", default_value = DEFAULT_MODEL_REPO)]
    pub model_repo: String,

    /// Repository revision (branch, tag or commit)
    #[arg(long, env = "SAFEVISION_MODEL_REVISION", default_value = DEFAULT_MODEL_REVISION)]
    pub model_revision: String,

    /// ONNX graph path inside the repository or model directory
    #[arg(long, env = "SAFEVISION_MODEL_FILE", default_value = DEFAULT_MODEL_FILE)]
    pub model_file: String,

    /// Load the model from this directory instead of the hub
    #[arg(long, env = "SAFEVISION_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Hub download cache (defaults to the hf-hub cache)
    #[arg(long, env = "SAFEVISION_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Minimum score for a detection to be returned
    #[arg(long, env = "SAFEVISION_CONFIDENCE_THRESHOLD", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence_threshold: f32,

    /// Execution provider
    #[arg(long, env = "SAFEVISION_DEVICE", value_enum, default_value_t = DevicePreference::Auto)]
    pub device: DevicePreference,

    /// Load the model before accepting requests
    #[arg(long, env = "SAFEVISION_PRELOAD")]
    pub preload: bool,

    /// Allowed CORS origins
    #[arg(
        long = "cors-origin",
        env = "SAFEVISION_CORS_ORIGINS",
        value_delimiter = ',',
        default_values_t = default_cors_origins()
    )]
    pub cors_origins: Vec<String>,

    /// Largest accepted image upload in bytes
    #[arg(long, env = "SAFEVISION_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_IMAGE_SIZE)]
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            model_revision: DEFAULT_MODEL_REVISION.to_string(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            model_dir: None,
            cache_dir: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            device: DevicePreference::Auto,
            preload: false,
            cors_origins: default_cors_origins(),
            max_upload_bytes: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}

impl ServiceConfig {
    /// Check the configuration before starting the service
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.confidence_threshold)?;

        if self.model_dir.is_none() && self.model_repo.trim().is_empty() {
            bail!("model repository must not be empty");
        }
        if self.model_file.trim().is_empty() {
            bail!("model file must not be empty");
        }
        if self.max_upload_bytes == 0 {
            bail!("max upload size must be greater than zero");
        }

        self.listen_addr()?;
        self.cors_origin_values()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .context(format!("Invalid listen address '{}'", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// CORS origins as header values
    pub fn cors_origin_values(&self) -> Result<Vec<HeaderValue>> {
        self.cors_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin).context(format!("Invalid CORS origin '{}'", origin))
            })
            .collect()
    }

    pub fn detector_config(&self) -> DetectorConfig {
        let source = match &self.model_dir {
            Some(dir) => ModelSource::Local(dir.clone()),
            None => ModelSource::Hub {
                repo: self.model_repo.clone(),
                revision: self.model_revision.clone(),
                cache_dir: self.cache_dir.clone(),
            },
        };

        DetectorConfig {
            source,
            model_file: self.model_file.clone(),
            device: self.device,
            confidence_threshold: self.confidence_threshold,
        }
    }
}
