//! In-process store with exact cosine search.

use crate::error::{JobVecError, Result};
use crate::processing::record::Record;
use crate::store::{ensure_writable, NearestQuery, SearchHit, UpsertKey, UpsertOutcome, VectorStore};
use async_trait::async_trait;
use std::sync::Mutex;

pub struct MemoryStore {
    dimensions: usize,
    records: Mutex<Vec<Record>>,
}

impl MemoryStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome> {
        ensure_writable(record, self.dimensions)?;

        let mut records = self
            .records
            .lock()
            .map_err(|_| JobVecError::Persistence("memory store poisoned".to_string()))?;

        let existing = UpsertKey::for_record(record).and_then(|key| {
            records
                .iter()
                .position(|stored| UpsertKey::for_record(stored).as_ref() == Some(&key))
        });

        match existing {
            Some(position) => {
                records[position] = record.clone();
                Ok(UpsertOutcome::Replaced)
            }
            None => {
                records.push(record.clone());
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn query_nearest(&self, query: &NearestQuery) -> Result<Vec<SearchHit>> {
        let records = self
            .records
            .lock()
            .map_err(|_| JobVecError::Persistence("memory store poisoned".to_string()))?;

        let mut hits: Vec<SearchHit> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| query.source.map_or(true, |source| record.source == source))
            .filter_map(|(position, record)| {
                let vector = record.vector.as_deref()?;
                Some(SearchHit {
                    identifier: record.display_id().unwrap_or_else(|| position.to_string()),
                    title: record.title.clone(),
                    link: record.link.clone(),
                    score: cosine_similarity(&query.vector, vector),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.limit);
        Ok(hits)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::extractor::SourceKind;
    use crate::store::tests::record_with;

    #[tokio::test]
    async fn test_vectorless_record_never_written() {
        let store = MemoryStore::new(2);
        let result = store.upsert(&record_with(None)).await;

        assert!(matches!(result, Err(JobVecError::Persistence(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_by_id_replaces() {
        let store = MemoryStore::new(2);
        let mut record = record_with(Some(vec![1.0, 0.0]));
        record.id = Some(11);

        assert_eq!(store.upsert(&record).await.unwrap(), UpsertOutcome::Inserted);
        record.title = Some("Updated".to_string());
        assert_eq!(store.upsert(&record).await.unwrap(), UpsertOutcome::Replaced);

        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].title.as_deref(), Some("Updated"));
    }

    #[tokio::test]
    async fn test_same_id_different_source_kept_apart() {
        let store = MemoryStore::new(2);
        let mut posting = record_with(Some(vec![1.0, 0.0]));
        posting.id = Some(7);
        let mut resume = record_with(Some(vec![0.0, 1.0]));
        resume.id = Some(7);
        resume.source = SourceKind::Resume;

        assert_eq!(store.upsert(&posting).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(&resume).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_query_restricted_to_source() {
        let store = MemoryStore::new(2);
        let mut posting = record_with(Some(vec![0.0, 1.0]));
        posting.id = Some(1);
        let mut resume = record_with(Some(vec![1.0, 0.0]));
        resume.id = Some(2);
        resume.source = SourceKind::Resume;
        store.upsert(&posting).await.unwrap();
        store.upsert(&resume).await.unwrap();

        let query = NearestQuery::new(vec![1.0, 0.0], 10, "memory")
            .with_source(Some(SourceKind::JobPosting));
        let hits = store.query_nearest(&query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier, "1");

        let unrestricted = NearestQuery::new(vec![1.0, 0.0], 10, "memory");
        assert_eq!(store.query_nearest(&unrestricted).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_keyless_records_are_inserted() {
        let store = MemoryStore::new(2);
        let record = record_with(Some(vec![1.0, 0.0]));
        store.upsert(&record).await.unwrap();
        store.upsert(&record).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_query_orders_by_score() {
        let store = MemoryStore::new(2);
        for (id, vector) in [(1, vec![0.0, 1.0]), (2, vec![1.0, 0.0]), (3, vec![1.0, 1.0])] {
            let mut record = record_with(Some(vector));
            record.id = Some(id);
            store.upsert(&record).await.unwrap();
        }

        let query = NearestQuery::new(vec![1.0, 0.0], 2, "memory");
        let hits = store.query_nearest(&query).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].identifier, "2");
        assert_eq!(hits[1].identifier, "3");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
    }
}
