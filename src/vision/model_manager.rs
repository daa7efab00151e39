// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector loading and the process-wide detector provider
//!
//! The detector is expensive to build (weights download, session
//! initialization), so it is constructed once and shared by every request.
//! [`DetectorProvider`] owns that single instance and builds it on first use.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::detector::{ObjectDetector, DEFAULT_CONFIDENCE_THRESHOLD};
use super::detr::{DetrDetector, DetrModelFiles, DevicePreference};
use super::DetectorError;

/// Default Hugging Face repository holding the DETR ONNX export
pub const DEFAULT_MODEL_REPO: &str = "Xenova/detr-resnet-50";

/// Default repository revision
pub const DEFAULT_MODEL_REVISION: &str = "main";

/// Default path of the ONNX graph inside the repository
pub const DEFAULT_MODEL_FILE: &str = "onnx/model.onnx";

/// Where model files come from
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Download from the Hugging Face Hub (cached on disk by hf-hub)
    Hub {
        repo: String,
        revision: String,
        cache_dir: Option<PathBuf>,
    },
    /// Read from a local directory with the same layout as the hub repository
    Local(PathBuf),
}

impl ModelSource {
    /// Human-readable model name used in logs
    pub fn model_name(&self) -> String {
        match self {
            ModelSource::Hub { repo, .. } => repo.clone(),
            ModelSource::Local(dir) => dir.display().to_string(),
        }
    }
}

/// Configuration for building the detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub source: ModelSource,
    /// ONNX graph path relative to the repository or directory root
    pub model_file: String,
    pub device: DevicePreference,
    pub confidence_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::Hub {
                repo: DEFAULT_MODEL_REPO.to_string(),
                revision: DEFAULT_MODEL_REVISION.to_string(),
                cache_dir: None,
            },
            model_file: DEFAULT_MODEL_FILE.to_string(),
            device: DevicePreference::Auto,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Builds a detector instance
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetectorLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn ObjectDetector>, DetectorError>;
}

/// Loads the DETR detector described by a [`DetectorConfig`]
#[derive(Debug, Clone)]
pub struct DetrLoader {
    config: DetectorConfig,
}

impl DetrLoader {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Resolve the model files to local paths, downloading them if needed
    pub async fn resolve_files(&self) -> Result<DetrModelFiles, DetectorError> {
        match &self.config.source {
            ModelSource::Local(dir) => {
                if !dir.is_dir() {
                    return Err(DetectorError::ModelLoad(format!(
                        "model directory not found: {}",
                        dir.display()
                    )));
                }
                Ok(DetrModelFiles::in_dir(dir, &self.config.model_file))
            }
            ModelSource::Hub {
                repo,
                revision,
                cache_dir,
            } => fetch_from_hub(repo, revision, cache_dir.as_ref(), &self.config.model_file).await,
        }
    }
}

async fn fetch_from_hub(
    repo: &str,
    revision: &str,
    cache_dir: Option<&PathBuf>,
    model_file: &str,
) -> Result<DetrModelFiles, DetectorError> {
    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir.clone());
    }
    let api = builder
        .build()
        .map_err(|e| DetectorError::ModelFetch(format!("failed to create hub client: {}", e)))?;

    let repo_api = api.repo(Repo::with_revision(
        repo.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    info!("📥 Fetching {} ({}) from Hugging Face Hub", repo, revision);

    let model = repo_api
        .get(model_file)
        .await
        .map_err(|e| DetectorError::ModelFetch(format!("{}/{}: {}", repo, model_file, e)))?;

    // The label map and preprocessing settings are optional: without them the
    // detector falls back to numeric labels and standard DETR preprocessing.
    let config = match repo_api.get("config.json").await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("⚠️  Could not fetch config.json from {}: {}", repo, e);
            None
        }
    };
    let preprocessor_config = match repo_api.get("preprocessor_config.json").await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("⚠️  Could not fetch preprocessor_config.json from {}: {}", repo, e);
            None
        }
    };

    Ok(DetrModelFiles {
        model,
        config,
        preprocessor_config,
    })
}

#[async_trait]
impl DetectorLoader for DetrLoader {
    async fn load(&self) -> Result<Arc<dyn ObjectDetector>, DetectorError> {
        let started = Instant::now();
        let files = self.resolve_files().await?;

        let model_name = self.config.source.model_name();
        let device = self.config.device;
        let threshold = self.config.confidence_threshold;

        // Session construction parses the whole graph; keep it off the runtime threads
        let detector = tokio::task::spawn_blocking(move || {
            DetrDetector::from_files(model_name, &files, device, threshold)
        })
        .await
        .map_err(|e| DetectorError::ModelLoad(format!("loader task failed: {}", e)))??;

        info!(
            "✅ Detector loaded in {:.2}s",
            started.elapsed().as_secs_f64()
        );

        Ok(Arc::new(detector))
    }
}

/// Process-wide holder of the detector
///
/// The first call to [`DetectorProvider::get`] runs the loader; concurrent
/// first calls wait for that same load. A failed load leaves the provider
/// empty so the next call tries again.
pub struct DetectorProvider {
    loader: Arc<dyn DetectorLoader>,
    detector: OnceCell<Arc<dyn ObjectDetector>>,
}

impl DetectorProvider {
    /// Create a provider that loads lazily through `loader`
    pub fn new(loader: Arc<dyn DetectorLoader>) -> Self {
        Self {
            loader,
            detector: OnceCell::new(),
        }
    }

    /// Create a provider around an already constructed detector
    pub fn preloaded(detector: Arc<dyn ObjectDetector>) -> Self {
        Self {
            loader: Arc::new(NoopLoader),
            detector: OnceCell::new_with(Some(detector)),
        }
    }

    /// Get the detector, loading it on first use
    pub async fn get(&self) -> Result<Arc<dyn ObjectDetector>, DetectorError> {
        let detector = self
            .detector
            .get_or_try_init(|| async {
                info!("Loading detector on first use");
                self.loader.load().await
            })
            .await?;
        Ok(Arc::clone(detector))
    }

    pub fn is_loaded(&self) -> bool {
        self.detector.initialized()
    }
}

impl std::fmt::Debug for DetectorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorProvider")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Loader for providers that start initialized
struct NoopLoader;

#[async_trait]
impl DetectorLoader for NoopLoader {
    async fn load(&self) -> Result<Arc<dyn ObjectDetector>, DetectorError> {
        Err(DetectorError::ModelLoad(
            "provider was created without a loader".to_string(),
        ))
    }
}
