//! Model2Vec model catalog, download and lookup

use crate::error::{JobVecError, Result};
use hf_hub::api::tokio::Api;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Files `StaticModel::from_pretrained` needs in a local model directory.
pub const REQUIRED_MODEL_FILES: [&str; 3] = ["model.safetensors", "tokenizer.json", "config.json"];

/// Information about a downloadable embedding model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModelInfo {
    pub name: String,
    pub repo_id: String,
    pub size_mb: u64,
    pub description: String,
    /// Output vector length; must equal the vector index dimensionality
    pub dimensions: usize,
}

pub struct EmbeddingModelManager {
    models_dir: PathBuf,
    available_models: BTreeMap<String, EmbeddingModelInfo>,
    downloaded_models: HashSet<String>,
}

impl EmbeddingModelManager {
    pub async fn new(models_dir: PathBuf) -> Result<Self> {
        if !models_dir.exists() {
            fs::create_dir_all(&models_dir).await.map_err(|e| {
                JobVecError::ModelError(format!("Failed to create models directory: {}", e))
            })?;
        }

        let mut manager = Self {
            models_dir,
            available_models: Self::catalog(),
            downloaded_models: HashSet::new(),
        };
        manager.scan_downloaded_models().await?;

        Ok(manager)
    }

    fn catalog() -> BTreeMap<String, EmbeddingModelInfo> {
        let mut models = BTreeMap::new();

        models.insert(
            "potion-base-8M".to_string(),
            EmbeddingModelInfo {
                name: "Potion Base 8M".to_string(),
                repo_id: "minishlab/potion-base-8M".to_string(),
                size_mb: 33,
                description: "Small general-purpose static embeddings (default)".to_string(),
                dimensions: 256,
            },
        );
        models.insert(
            "potion-base-32M".to_string(),
            EmbeddingModelInfo {
                name: "Potion Base 32M".to_string(),
                repo_id: "minishlab/potion-base-32M".to_string(),
                size_mb: 130,
                description: "Larger static embeddings with better recall".to_string(),
                dimensions: 512,
            },
        );
        models.insert(
            "m2v-base".to_string(),
            EmbeddingModelInfo {
                name: "Model2Vec Base".to_string(),
                repo_id: "minishlab/M2V_base_output".to_string(),
                size_mb: 90,
                description: "Legacy Model2Vec base model".to_string(),
                dimensions: 256,
            },
        );

        models
    }

    async fn scan_downloaded_models(&mut self) -> Result<()> {
        let mut entries = fs::read_dir(&self.models_dir).await.map_err(|e| {
            JobVecError::ModelError(format!("Failed to scan models directory: {}", e))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() && is_model_directory(&entry.path()).await {
                self.downloaded_models
                    .insert(entry.file_name().to_string_lossy().to_string());
            }
        }

        Ok(())
    }

    /// Download a catalog model from the Hugging Face Hub
    pub async fn download_model(&mut self, model_id: &str) -> Result<PathBuf> {
        let model_info = self
            .available_models
            .get(model_id)
            .ok_or_else(|| JobVecError::ModelNotFound(model_id.to_string()))?
            .clone();

        let model_dir = self.models_dir.join(model_id);
        fs::create_dir_all(&model_dir).await?;

        info!(
            "Downloading embedding model {} ({} MB) from {}",
            model_info.name, model_info.size_mb, model_info.repo_id
        );

        let api = Api::new()
            .map_err(|e| JobVecError::ModelError(format!("Failed to initialize HF API: {}", e)))?;
        let repo = api.repo(hf_hub::Repo::model(model_info.repo_id.clone()));

        for file in REQUIRED_MODEL_FILES {
            let cached = repo.get(file).await.map_err(|e| {
                JobVecError::ModelError(format!("Failed to download required file {}: {}", file, e))
            })?;
            fs::copy(&cached, model_dir.join(file)).await.map_err(|e| {
                JobVecError::ModelError(format!("Failed to copy {}: {}", file, e))
            })?;
            info!("  downloaded {}", file);
        }

        if let Err(e) = repo.get("README.md").await {
            warn!("Optional README.md not available for {}: {}", model_id, e);
        }

        self.downloaded_models.insert(model_id.to_string());
        Ok(model_dir)
    }

    pub fn get_model_path(&self, model_id: &str) -> Option<PathBuf> {
        if self.downloaded_models.contains(model_id) {
            Some(self.models_dir.join(model_id))
        } else {
            None
        }
    }

    /// Resolve a configured model reference to a local directory,
    /// downloading catalog models on first use.
    pub async fn ensure_model_available(&mut self, reference: &str) -> Result<PathBuf> {
        let local = Path::new(reference);
        if local.is_dir() {
            if is_model_directory(local).await {
                return Ok(local.to_path_buf());
            }
            return Err(JobVecError::ModelError(format!(
                "{} is missing one of {}",
                local.display(),
                REQUIRED_MODEL_FILES.join(", ")
            )));
        }

        let model_id = self
            .resolve_model_id(reference)
            .ok_or_else(|| JobVecError::ModelNotFound(reference.to_string()))?;

        if let Some(path) = self.get_model_path(&model_id) {
            return Ok(path);
        }
        self.download_model(&model_id).await
    }

    pub async fn remove_model(&mut self, model_id: &str) -> Result<PathBuf> {
        if !self.downloaded_models.contains(model_id) {
            return Err(JobVecError::ModelNotFound(model_id.to_string()));
        }
        let model_dir = self.models_dir.join(model_id);
        fs::remove_dir_all(&model_dir).await.map_err(|e| {
            JobVecError::ModelError(format!("Failed to remove model: {}", e))
        })?;
        self.downloaded_models.remove(model_id);
        Ok(model_dir)
    }

    /// Catalog entries, ordered by id
    pub fn list_available_models(&self) -> Vec<(&String, &EmbeddingModelInfo)> {
        self.available_models.iter().collect()
    }

    pub fn get_model_info(&self, model_id: &str) -> Option<&EmbeddingModelInfo> {
        self.available_models.get(model_id)
    }

    pub fn is_model_downloaded(&self, model_id: &str) -> bool {
        self.downloaded_models.contains(model_id)
    }

    /// Known output dimensionality for a model reference, if it is in the catalog
    pub fn expected_dimensions(&self, reference: &str) -> Option<usize> {
        self.resolve_model_id(reference)
            .and_then(|id| self.available_models.get(&id))
            .map(|info| info.dimensions)
    }

    /// Resolve by catalog id, repo id, or case-insensitive display name
    pub fn resolve_model_id(&self, input: &str) -> Option<String> {
        if self.available_models.contains_key(input) {
            return Some(input.to_string());
        }

        let input_lower = input.to_lowercase();
        self.available_models
            .iter()
            .find(|(_, info)| info.repo_id == input || info.name.to_lowercase() == input_lower)
            .map(|(id, _)| id.clone())
    }
}

async fn is_model_directory(path: &Path) -> bool {
    for file in REQUIRED_MODEL_FILES {
        if fs::metadata(path.join(file)).await.is_err() {
            return false;
        }
    }
    true
}
