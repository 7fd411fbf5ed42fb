//! Similarity query construction and post-filtering
//!
//! The store ranks; this module normalizes the query vector beforehand and
//! applies the caller's threshold and display ranks afterwards. The store
//! never sees the threshold.

use crate::error::{JobVecError, Result};
use crate::processing::extractor::SourceKind;
use crate::store::{NearestQuery, SearchHit, VectorStore};
use log::debug;
use serde::{Deserialize, Serialize};

/// A hit that passed the threshold, with its 1-based position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub rank: usize,
    pub identifier: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct SimilarityQueryBuilder {
    index_name: String,
    limit: usize,
    oversampling: usize,
    target: Option<SourceKind>,
}

impl SimilarityQueryBuilder {
    pub fn new(index_name: impl Into<String>, limit: usize, oversampling: usize) -> Self {
        Self {
            index_name: index_name.into(),
            limit,
            oversampling,
            target: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Restrict candidates to records of one kind; `None` searches everything.
    pub fn with_target(mut self, target: Option<SourceKind>) -> Self {
        self.target = target;
        self
    }

    /// Normalize `raw_vector`, query the store, keep scores strictly above
    /// `threshold`, and rank the survivors.
    pub async fn search(
        &self,
        store: &dyn VectorStore,
        raw_vector: &[f32],
        threshold: f64,
    ) -> Result<SearchOutcome> {
        let query = self.build(raw_vector)?;
        let hits = store.query_nearest(&query).await?;
        let candidates = hits.len();
        let results = filter_and_rank(hits, threshold);

        debug!(
            "{} of {} candidates scored above {}",
            results.len(),
            candidates,
            threshold
        );

        Ok(SearchOutcome { candidates, results })
    }

    pub fn build(&self, raw_vector: &[f32]) -> Result<NearestQuery> {
        let vector = l2_normalize(raw_vector)?;
        Ok(NearestQuery::new(vector, self.limit, self.index_name.clone())
            .with_oversampling(self.oversampling)
            .with_source(self.target))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Hits returned by the store before thresholding
    pub candidates: usize,
    pub results: Vec<RankedResult>,
}

/// Scale to unit Euclidean length.
pub fn l2_normalize(vector: &[f32]) -> Result<Vec<f32>> {
    let norm = vector
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt();

    if norm == 0.0 || !norm.is_finite() {
        return Err(JobVecError::DegenerateVector(format!(
            "vector of {} values has norm {}; cannot search with it",
            vector.len(),
            norm
        )));
    }

    Ok(vector.iter().map(|v| (f64::from(*v) / norm) as f32).collect())
}

/// Keep hits scoring strictly above `threshold`, preserving order, and
/// number them from 1.
pub fn filter_and_rank(hits: Vec<SearchHit>, threshold: f64) -> Vec<RankedResult> {
    hits.into_iter()
        .filter(|hit| hit.score > threshold)
        .enumerate()
        .map(|(position, hit)| RankedResult {
            rank: position + 1,
            identifier: hit.identifier,
            title: hit.title,
            link: hit.link,
            score: hit.score,
        })
        .collect()
}
