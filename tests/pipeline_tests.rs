//! End-to-end pipeline tests against the in-memory store

use async_trait::async_trait;
use jobvec::config::Config;
use jobvec::error::{JobVecError, Result};
use jobvec::input::postings::{parse_posting, read_feed};
use jobvec::pipeline::{IngestSummary, Pipeline};
use jobvec::processing::embeddings::Embedder;
use jobvec::processing::extractor::SourceKind;
use jobvec::store::{MemoryStore, NearestQuery, SearchHit, UpsertOutcome, VectorStore};
use jobvec::processing::record::Record;
use std::path::Path;
use std::sync::Arc;

const DIMS: usize = 64;

/// Bag of hashed words; identical text always gives an identical vector.
struct HashingEmbedder;

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing-test"
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIMS];
        for word in text.split_whitespace().filter(|w| w.len() > 3) {
            let hash = word
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x100000001b3));
            vector[(hash % DIMS as u64) as usize] += 1.0;
        }
        Ok(vector)
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing-test"
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(JobVecError::Embedding("model unavailable".to_string()))
    }
}

struct ZeroEmbedder;

#[async_trait]
impl Embedder for ZeroEmbedder {
    fn model_name(&self) -> &str {
        "zero-test"
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; DIMS])
    }
}

/// Lets the test keep a handle on the store the pipeline owns.
struct SharedStore(Arc<MemoryStore>);

#[async_trait]
impl VectorStore for SharedStore {
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome> {
        self.0.upsert(record).await
    }

    async fn query_nearest(&self, query: &NearestQuery) -> Result<Vec<SearchHit>> {
        self.0.query_nearest(query).await
    }
}

fn pipeline_with(embedder: Box<dyn Embedder>) -> (Pipeline, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(DIMS));
    let pipeline = Pipeline::new(
        &Config::default(),
        embedder,
        Box::new(SharedStore(Arc::clone(&store))),
    );
    (pipeline, store)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(Path::new("tests/fixtures").join(name)).unwrap()
}

const ANALYST_POSTING: &str = "ID: 900\nTitle: Data Analyst\nLocation: Berlin\n\
    Analyze product metrics with spreadsheets and present quarterly findings.";

#[tokio::test]
async fn test_ingest_then_search_ranks_closest_posting_first() {
    let (pipeline, store) = pipeline_with(Box::new(HashingEmbedder));

    pipeline
        .ingest(&fixture("sample_posting.txt"), SourceKind::JobPosting, None)
        .await
        .unwrap();
    pipeline
        .ingest(ANALYST_POSTING, SourceKind::JobPosting, None)
        .await
        .unwrap();
    assert_eq!(store.len(), 2);

    let report = pipeline
        .search(&fixture("sample_resume.txt"), SourceKind::Resume, 0.0)
        .await
        .unwrap();

    assert_eq!(report.candidates, 2);
    assert!(!report.results.is_empty());
    assert_eq!(report.results[0].rank, 1);
    assert_eq!(report.results[0].identifier, "4821");
    assert_eq!(report.results[0].title.as_deref(), Some("Backend Engineer"));
    assert_eq!(report.query.title.as_deref(), Some("Senior Software Engineer"));
    assert!(report.query_tokens > 0);

    for pair in report.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
        assert_eq!(pair[1].rank, pair[0].rank + 1);
    }
}

#[tokio::test]
async fn test_ingested_record_contents() {
    let (pipeline, store) = pipeline_with(Box::new(HashingEmbedder));

    let outcome = pipeline
        .ingest(&fixture("sample_posting.txt"), SourceKind::JobPosting, None)
        .await
        .unwrap();
    assert_eq!(outcome.upsert, UpsertOutcome::Inserted);

    let record = &store.records()[0];
    assert_eq!(record.id, Some(4821));
    assert_eq!(record.source, SourceKind::JobPosting);
    assert_eq!(record.embedding_model.as_deref(), Some("hashing-test"));
    assert_eq!(record.vector.as_ref().map(Vec::len), Some(DIMS));
    assert_eq!(
        record.skillset,
        Some(vec![
            "Rust".to_string(),
            "PostgreSQL".to_string(),
            "Kubernetes".to_string(),
            "gRPC".to_string()
        ])
    );
    assert!(record.tokens.contains(&"rust".to_string()));
    assert!(!record.tokens.contains(&"the".to_string()));
    assert!(!record.tokens.contains(&"to".to_string()));
    assert_eq!(record.company, None);
}

#[tokio::test]
async fn test_embedding_failure_writes_nothing() {
    let (pipeline, store) = pipeline_with(Box::new(FailingEmbedder));

    let result = pipeline
        .ingest(&fixture("sample_posting.txt"), SourceKind::JobPosting, None)
        .await;

    assert!(matches!(result, Err(JobVecError::Embedding(_))));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_reingest_by_id_replaces() {
    let (pipeline, store) = pipeline_with(Box::new(HashingEmbedder));
    let text = fixture("sample_posting.txt");

    let first = pipeline.ingest(&text, SourceKind::JobPosting, None).await.unwrap();
    let second = pipeline.ingest(&text, SourceKind::JobPosting, None).await.unwrap();

    assert_eq!(first.upsert, UpsertOutcome::Inserted);
    assert_eq!(second.upsert, UpsertOutcome::Replaced);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_reingest_by_link_replaces() {
    let (pipeline, store) = pipeline_with(Box::new(HashingEmbedder));
    let text = "Title: Platform Engineer\nhttps://jobs.example.com/postings/77\nRun the build farm.";

    pipeline.ingest(text, SourceKind::JobPosting, None).await.unwrap();
    let again = pipeline.ingest(text, SourceKind::JobPosting, None).await.unwrap();

    assert_eq!(again.upsert, UpsertOutcome::Replaced);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_degenerate_query_is_rejected() {
    let (pipeline, _store) = pipeline_with(Box::new(ZeroEmbedder));

    let result = pipeline.search("anything at all", SourceKind::Resume, 0.0).await;
    assert!(matches!(result, Err(JobVecError::DegenerateVector(_))));
}

#[tokio::test]
async fn test_threshold_filters_everything() {
    let (pipeline, _store) = pipeline_with(Box::new(HashingEmbedder));
    pipeline
        .ingest(&fixture("sample_posting.txt"), SourceKind::JobPosting, None)
        .await
        .unwrap();

    let report = pipeline
        .search(&fixture("sample_posting.txt"), SourceKind::JobPosting, 1.5)
        .await
        .unwrap();

    assert_eq!(report.candidates, 1);
    assert!(report.results.is_empty());
}

#[tokio::test]
async fn test_limit_caps_results() {
    let (pipeline, _store) = pipeline_with(Box::new(HashingEmbedder));
    for id in 1..=5 {
        let text = format!("ID: {}\nTitle: Rust Engineer {}\nBuild services in Rust.", id, id);
        pipeline.ingest(&text, SourceKind::JobPosting, None).await.unwrap();
    }

    let pipeline = pipeline.with_limit(3);
    let report = pipeline
        .search("Rust engineer building services", SourceKind::Resume, 0.0)
        .await
        .unwrap();

    assert_eq!(report.candidates, 3);
    assert_eq!(report.results.len(), 3);
}

#[tokio::test]
async fn test_feed_metadata_wins_over_description() {
    let (pipeline, store) = pipeline_with(Box::new(HashingEmbedder));
    let posting = parse_posting(
        r#"{"title":"Engineer II","company":"Acme","link":"https://jobs.example.com/postings/1","description":"ID: 1\nTitle: Staff Engineer\nLocation: Remote\nBuild storage services."}"#,
    )
    .unwrap();

    pipeline
        .ingest(&posting.description, SourceKind::JobPosting, Some(&posting.metadata()))
        .await
        .unwrap();

    let record = &store.records()[0];
    assert_eq!(record.title.as_deref(), Some("Engineer II"));
    assert_eq!(record.location.as_deref(), Some("Remote"));
    assert_eq!(record.company.as_deref(), Some("Acme"));
    assert_eq!(record.link.as_deref(), Some("https://jobs.example.com/postings/1"));
    assert_eq!(record.id, Some(1));
    assert_eq!(
        record.description_length,
        Some(posting.description.chars().count() as i64)
    );
}

#[tokio::test]
async fn test_feed_ingestion_continues_past_bad_lines() {
    let (pipeline, store) = pipeline_with(Box::new(HashingEmbedder));
    let feed = read_feed(Path::new("tests/fixtures/postings.jsonl")).await.unwrap();

    let mut summary = IngestSummary::default();
    for line in feed {
        let result = match line.posting {
            Ok(posting) => {
                pipeline
                    .ingest(&posting.description, SourceKind::JobPosting, Some(&posting.metadata()))
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(outcome) => summary.record_success(outcome.upsert),
            Err(e) => {
                assert!(e.is_per_record(), "{}", e);
                summary.record_failure(format!("feed:{}", line.line_number), &e);
            }
        }
    }

    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.failures[0].source, "feed:4");
    assert_eq!(summary.failures[1].source, "feed:5");
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_resume_and_posting_with_same_id_coexist() {
    let (pipeline, store) = pipeline_with(Box::new(HashingEmbedder));

    let posting = pipeline
        .ingest("ID: 7\nTitle: Backend Engineer", SourceKind::JobPosting, None)
        .await
        .unwrap();
    let resume = pipeline
        .ingest("ID: 7\nTitle: Jane Doe", SourceKind::Resume, None)
        .await
        .unwrap();

    assert_eq!(posting.upsert, UpsertOutcome::Inserted);
    assert_eq!(resume.upsert, UpsertOutcome::Inserted);
    assert_eq!(store.len(), 2);

    let titles: Vec<_> = store
        .records()
        .into_iter()
        .map(|record| (record.source, record.title))
        .collect();
    assert!(titles.contains(&(SourceKind::JobPosting, Some("Backend Engineer".to_string()))));
    assert!(titles.contains(&(SourceKind::Resume, Some("Jane Doe".to_string()))));
}

#[tokio::test]
async fn test_search_returns_postings_not_resumes() {
    let (pipeline, _store) = pipeline_with(Box::new(HashingEmbedder));
    let resume_text = fixture("sample_resume.txt");

    pipeline
        .ingest(&fixture("sample_posting.txt"), SourceKind::JobPosting, None)
        .await
        .unwrap();
    pipeline
        .ingest(&resume_text, SourceKind::Resume, None)
        .await
        .unwrap();

    let report = pipeline
        .search(&resume_text, SourceKind::Resume, 0.0)
        .await
        .unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].identifier, "4821");

    let pipeline = pipeline.with_target(SourceKind::Resume);
    let report = pipeline
        .search(&resume_text, SourceKind::Resume, 0.0)
        .await
        .unwrap();
    assert_eq!(report.candidates, 1);
    assert_ne!(report.results[0].identifier, "4821");
}

#[tokio::test]
async fn test_zero_vector_is_never_written() {
    let (pipeline, store) = pipeline_with(Box::new(ZeroEmbedder));

    let result = pipeline.ingest("...", SourceKind::JobPosting, None).await;

    assert!(matches!(result, Err(JobVecError::Persistence(_))));
    assert!(store.is_empty());
}
