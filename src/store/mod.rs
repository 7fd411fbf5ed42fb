//! Persistence of records and nearest-neighbour queries against them

pub mod atlas;
pub mod memory;

use crate::config::MAX_NUM_CANDIDATES;
use crate::error::{JobVecError, Result};
use crate::processing::extractor::SourceKind;
use crate::processing::record::Record;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use atlas::AtlasStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a record. Fails with `Persistence` before any I/O
    /// when the record carries no usable vector.
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome>;

    /// Up to `query.limit` hits, best score first.
    async fn query_nearest(&self, query: &NearestQuery) -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Key used to make re-ingestion replace instead of duplicate. Postings and
/// resumes share a collection, so every key is scoped to the record source.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertKey {
    Id(SourceKind, i64),
    Link(SourceKind, String),
}

impl UpsertKey {
    /// `id` first, then `link`; `None` means the record can only be inserted.
    pub fn for_record(record: &Record) -> Option<Self> {
        if let Some(id) = record.id {
            return Some(UpsertKey::Id(record.source, id));
        }
        record
            .link
            .as_ref()
            .filter(|link| !link.trim().is_empty())
            .map(|link| UpsertKey::Link(record.source, link.clone()))
    }
}

/// Write precondition shared by every store: a vector must exist, match the
/// collection dimensionality, be finite and have a non-zero norm.
pub fn ensure_writable(record: &Record, dimensions: usize) -> Result<&[f32]> {
    let vector = record
        .vector
        .as_deref()
        .ok_or_else(|| JobVecError::Persistence("record has no vector; refusing to write".to_string()))?;

    if vector.is_empty() {
        return Err(JobVecError::Persistence("record vector is empty".to_string()));
    }
    if vector.len() != dimensions {
        return Err(JobVecError::Persistence(format!(
            "record vector has {} dimensions, collection expects {}",
            vector.len(),
            dimensions
        )));
    }
    if vector.iter().any(|value| !value.is_finite()) {
        return Err(JobVecError::Persistence("record vector contains non-finite values".to_string()));
    }
    // A cosine index cannot score a zero-magnitude vector
    if vector.iter().all(|value| *value == 0.0) {
        return Err(JobVecError::Persistence(
            "record vector has zero magnitude; refusing to write".to_string(),
        ));
    }
    Ok(vector)
}

/// One approximate nearest-neighbour request.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub index_name: String,
    /// Only documents with this `source` are considered
    pub source: Option<SourceKind>,
    oversampling: usize,
}

impl NearestQuery {
    pub fn new(vector: Vec<f32>, limit: usize, index_name: impl Into<String>) -> Self {
        Self {
            vector,
            limit,
            index_name: index_name.into(),
            source: None,
            oversampling: 10,
        }
    }

    pub fn with_source(mut self, source: Option<SourceKind>) -> Self {
        self.source = source;
        self
    }

    pub fn with_oversampling(mut self, factor: usize) -> Self {
        self.oversampling = factor.max(1);
        self
    }

    /// Candidate pool handed to the ANN index: `limit * oversampling`,
    /// never below `limit` and never above the server maximum.
    pub fn num_candidates(&self) -> usize {
        self.limit
            .saturating_mul(self.oversampling)
            .clamp(self.limit, MAX_NUM_CANDIDATES.max(self.limit))
    }
}

/// A stored document as returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub identifier: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub score: f64,
}
