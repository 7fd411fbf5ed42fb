//! Configuration management for the job vectorizer
//!
//! Settings live in a TOML file; store credentials only ever come from the
//! environment (optionally loaded from a `.env` file).

use crate::error::{JobVecError, Result};
use crate::processing::extractor::SourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_MONGODB_URI: &str = "JOBVEC_MONGODB_URI";
pub const ENV_MONGODB_USERNAME: &str = "JOBVEC_MONGODB_USERNAME";
pub const ENV_MONGODB_PASSWORD: &str = "JOBVEC_MONGODB_PASSWORD";

/// Atlas rejects `numCandidates` above this value.
pub const MAX_NUM_CANDIDATES: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub processing: ProcessingConfig,
    pub store: StoreConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    /// Catalog id (e.g. `potion-base-8M`) or a local model directory
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub embed_timeout_secs: u64,
    pub enable_caching: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string without credentials; credentials are applied separately.
    pub connection_string: String,
    pub database: String,
    pub collection: String,
    pub app_name: String,
    pub connect_timeout_secs: u64,
    pub operation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    pub vector_path: String,
    pub dimensions: usize,
    pub verify_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub limit: usize,
    pub oversampling: usize,
    pub similarity_threshold: f64,
    /// Record kind searched against; resumes are matched to postings by default
    #[serde(default = "default_search_target")]
    pub target: SourceKind,
}

fn default_search_target() -> SourceKind {
    SourceKind::JobPosting
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".jobvec")
            .join("models");

        Self {
            models: ModelConfig {
                models_dir,
                embedding_model: "potion-base-8M".to_string(),
            },
            processing: ProcessingConfig {
                embed_timeout_secs: 30,
                enable_caching: true,
            },
            store: StoreConfig {
                connection_string:
                    "mongodb+srv://cluster0.example.mongodb.net/?retryWrites=true&w=majority"
                        .to_string(),
                database: "job_database".to_string(),
                collection: "job_collection".to_string(),
                app_name: "jobvec".to_string(),
                connect_timeout_secs: 10,
                operation_timeout_secs: 30,
            },
            index: IndexConfig {
                name: "similarity_search".to_string(),
                vector_path: "vector".to_string(),
                dimensions: 256,
                verify_on_startup: true,
            },
            search: SearchConfig {
                limit: 10,
                oversampling: 10,
                similarity_threshold: 0.0,
                target: default_search_target(),
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing default file is created with defaults; a missing explicit path is an error.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(JobVecError::Configuration(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::read(path)?
            }
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::read(&default_path)?
                } else {
                    let config = Self::default();
                    config.save()?;
                    config
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| JobVecError::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| JobVecError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("jobvec")
            .join("config.toml")
    }

    /// Reject settings that would only fail later, at first use.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(JobVecError::Configuration(msg));

        if self.index.dimensions == 0 {
            return fail("index.dimensions must be greater than zero".to_string());
        }
        if self.index.name.trim().is_empty() {
            return fail("index.name is required".to_string());
        }
        if self.index.vector_path.trim().is_empty() {
            return fail("index.vector_path is required".to_string());
        }
        // Stored as a single top-level field, so no nested paths
        if self.index.vector_path.contains('.') || self.index.vector_path.starts_with('$') {
            return fail(format!(
                "index.vector_path '{}' must be a top-level field name without '.' or a leading '$'",
                self.index.vector_path
            ));
        }
        if self.index.vector_path == "source" {
            return fail("index.vector_path must not be 'source'".to_string());
        }
        if self.store.database.trim().is_empty() || self.store.collection.trim().is_empty() {
            return fail("store.database and store.collection are required".to_string());
        }
        if self.search.limit == 0 {
            return fail("search.limit must be greater than zero".to_string());
        }
        if self.search.limit > MAX_NUM_CANDIDATES {
            return fail(format!("search.limit must not exceed {}", MAX_NUM_CANDIDATES));
        }
        if self.search.oversampling == 0 {
            return fail("search.oversampling must be at least 1".to_string());
        }
        if !self.search.similarity_threshold.is_finite() {
            return fail("search.similarity_threshold must be a finite number".to_string());
        }
        if self.processing.embed_timeout_secs == 0 || self.store.operation_timeout_secs == 0 {
            return fail("timeouts must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.processing.embed_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.store.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.store.operation_timeout_secs)
    }
}

/// Store principal, read from the environment at process start.
#[derive(Clone)]
pub enum StoreCredentials {
    /// Full connection string including credentials; replaces `store.connection_string`.
    Uri(String),
    UsernamePassword { username: String, password: String },
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreCredentials::Uri(_) => f.write_str("StoreCredentials::Uri(<redacted>)"),
            StoreCredentials::UsernamePassword { username, .. } => f
                .debug_struct("StoreCredentials::UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

impl StoreCredentials {
    pub fn from_env() -> Result<Self> {
        // .env is optional
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(uri) = present(ENV_MONGODB_URI) {
            return Ok(StoreCredentials::Uri(uri));
        }

        match (present(ENV_MONGODB_USERNAME), present(ENV_MONGODB_PASSWORD)) {
            (Some(username), Some(password)) => {
                Ok(StoreCredentials::UsernamePassword { username, password })
            }
            (Some(_), None) => Err(JobVecError::Configuration(format!(
                "{} is set but {} is missing",
                ENV_MONGODB_USERNAME, ENV_MONGODB_PASSWORD
            ))),
            _ => Err(JobVecError::Configuration(format!(
                "Missing store credentials: set {} or {} and {}",
                ENV_MONGODB_URI, ENV_MONGODB_USERNAME, ENV_MONGODB_PASSWORD
            ))),
        }
    }
}
