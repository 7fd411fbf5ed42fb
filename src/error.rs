//! Error handling for the job vectorizer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobVecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    /// A label matched but its value could not be converted.
    /// Recovered locally by the extractor; the field stays null.
    #[error("Field extraction error ({field}): {message}")]
    Extraction { field: &'static str, message: String },

    #[error("Embedding failure: {0}")]
    Embedding(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Degenerate vector: {0}")]
    DegenerateVector(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, JobVecError>;

impl JobVecError {
    /// True for failures that abort a single record but leave the process usable.
    pub fn is_per_record(&self) -> bool {
        matches!(
            self,
            JobVecError::Embedding(_)
                | JobVecError::Persistence(_)
                | JobVecError::DegenerateVector(_)
                | JobVecError::InvalidInput(_)
                | JobVecError::Serialization(_)
        )
    }
}

/// Model2Vec loading reports through anyhow
impl From<anyhow::Error> for JobVecError {
    fn from(err: anyhow::Error) -> Self {
        JobVecError::ModelError(format!("{:#}", err))
    }
}

impl From<mongodb::error::Error> for JobVecError {
    fn from(err: mongodb::error::Error) -> Self {
        JobVecError::Persistence(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for JobVecError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        JobVecError::Persistence(format!("Failed to encode document: {}", err))
    }
}
