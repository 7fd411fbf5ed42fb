//! Embeddings generation using Model2Vec

use crate::config::Config;
use crate::error::{JobVecError, Result};
use crate::processing::embedding_manager::EmbeddingModelManager;
use async_trait::async_trait;
use log::{debug, info};
use model2vec_rs::model::StaticModel;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Text in, fixed-length vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// Output length, fixed for the lifetime of the embedder
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub struct Model2VecEmbedder {
    model: Arc<StaticModel>,
    model_name: String,
    dimensions: usize,
    timeout: Duration,
    cache: Option<Mutex<HashMap<String, Vec<f32>>>>,
}

impl Model2VecEmbedder {
    /// Resolve, download if needed, load, and probe the configured model.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let mut manager = EmbeddingModelManager::new(config.models_dir().clone()).await?;
        let reference = &config.models.embedding_model;

        if let Some(expected) = manager.expected_dimensions(reference) {
            if expected != config.index.dimensions {
                return Err(JobVecError::Configuration(format!(
                    "Model {} produces {}-dimensional vectors but index.dimensions is {}",
                    reference, expected, config.index.dimensions
                )));
            }
        }

        let model_path = manager.ensure_model_available(reference).await?;
        let embedder = Self::load(
            &model_path,
            reference,
            config.embed_timeout(),
            config.processing.enable_caching,
        )
        .await?;

        if embedder.dimensions() != config.index.dimensions {
            return Err(JobVecError::Configuration(format!(
                "Embedder output has {} dimensions but index.dimensions is {}",
                embedder.dimensions(),
                config.index.dimensions
            )));
        }

        Ok(embedder)
    }

    pub async fn load(model_path: &Path, model_name: &str, timeout: Duration, caching: bool) -> Result<Self> {
        let start_time = Instant::now();
        info!("Loading Model2Vec embedding model from: {}", model_path.display());

        let path = model_path.to_path_buf();
        let model = tokio::task::spawn_blocking(move || StaticModel::from_pretrained(&path, None, None, None))
            .await
            .map_err(|e| JobVecError::ModelError(format!("Model loading task failed: {}", e)))??;

        let dimensions = model.encode_single("dimension probe").len();
        if dimensions == 0 {
            return Err(JobVecError::ModelError(format!(
                "Model at {} produced an empty vector",
                model_path.display()
            )));
        }

        info!(
            "Model loaded in {:.2?} ({} dimensions)",
            start_time.elapsed(),
            dimensions
        );

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
            dimensions,
            timeout,
            cache: caching.then(|| Mutex::new(HashMap::new())),
        })
    }

    fn cached(&self, text: &str) -> Option<Vec<f32>> {
        let cache = self.cache.as_ref()?;
        let guard = cache.lock().ok()?;
        guard.get(text).cloned()
    }

    fn remember(&self, text: &str, vector: &[f32]) {
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.lock() {
                guard.insert(text.to_string(), vector.to_vec());
            }
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|cache| cache.lock().ok().map(|guard| guard.len()))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Embedder for Model2VecEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.cached(text) {
            debug!("Embedding cache hit ({} chars)", text.len());
            return Ok(vector);
        }

        let model = Arc::clone(&self.model);
        let owned = text.to_string();
        let task = tokio::task::spawn_blocking(move || model.encode_single(&owned));

        let vector = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| JobVecError::Embedding(format!("Embedding timed out after {:?}", self.timeout)))?
            .map_err(|e| JobVecError::Embedding(format!("Embedding task failed: {}", e)))?;

        if vector.len() != self.dimensions {
            return Err(JobVecError::Embedding(format!(
                "Model returned {} values, expected {}",
                vector.len(),
                self.dimensions
            )));
        }

        self.remember(text, &vector);
        Ok(vector)
    }
}
