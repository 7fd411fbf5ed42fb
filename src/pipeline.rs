//! Shared write and read paths
//!
//! Every entry point (file ingestion, scrape feed, search) goes through
//! [`Pipeline`]; the CLI only supplies text and metadata.

use crate::config::Config;
use crate::error::{JobVecError, Result};
use crate::processing::embeddings::Embedder;
use crate::processing::extractor::{ExtractedFields, FieldExtractor, SourceKind};
use crate::processing::record::{AssemblyInput, Record, RecordAssembler, SourceMetadata};
use crate::processing::text_processor::TextNormalizer;
use crate::search::{RankedResult, SimilarityQueryBuilder};
use crate::store::{UpsertOutcome, VectorStore};
use chrono::Utc;
use log::info;
use serde::Serialize;

pub struct Pipeline {
    extractor: FieldExtractor,
    normalizer: TextNormalizer,
    assembler: RecordAssembler,
    embedder: Box<dyn Embedder>,
    store: Box<dyn VectorStore>,
    query_builder: SimilarityQueryBuilder,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub record: Record,
    pub upsert: UpsertOutcome,
}

/// Per-run tally for batch ingestion. One failed record never stops the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub inserted: usize,
    pub replaced: usize,
    pub failures: Vec<IngestFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    /// File path or `feed:<line>` for scrape feed entries
    pub source: String,
    pub error: String,
}

impl IngestSummary {
    pub fn record_success(&mut self, upsert: UpsertOutcome) {
        match upsert {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Replaced => self.replaced += 1,
        }
    }

    pub fn record_failure(&mut self, source: impl Into<String>, error: &JobVecError) {
        self.failures.push(IngestFailure {
            source: source.into(),
            error: error.to_string(),
        });
    }

    pub fn written(&self) -> usize {
        self.inserted + self.replaced
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Everything a search caller gets back.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: ExtractedFields,
    pub query_tokens: usize,
    pub threshold: f64,
    pub candidates: usize,
    pub results: Vec<RankedResult>,
}

impl Pipeline {
    pub fn new(config: &Config, embedder: Box<dyn Embedder>, store: Box<dyn VectorStore>) -> Self {
        Self {
            extractor: FieldExtractor::new(),
            normalizer: TextNormalizer::new(),
            assembler: RecordAssembler::new(),
            embedder,
            store,
            query_builder: SimilarityQueryBuilder::new(
                config.index.name.clone(),
                config.search.limit,
                config.search.oversampling,
            )
            .with_target(Some(config.search.target)),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.query_builder = self.query_builder.with_limit(limit);
        self
    }

    /// Search only records of `target` kind.
    pub fn with_target(mut self, target: SourceKind) -> Self {
        self.query_builder = self.query_builder.with_target(Some(target));
        self
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// extract -> normalize -> embed -> assemble -> upsert.
    /// An embedding failure returns before anything is written.
    pub async fn ingest(
        &self,
        text: &str,
        kind: SourceKind,
        metadata: Option<&SourceMetadata>,
    ) -> Result<IngestOutcome> {
        let extracted = self.extractor.extract(text, kind);
        let normalized = self.normalizer.normalize(text);
        let vector = self.embedder.embed(&normalized.cleaned).await?;

        let record = self.assembler.assemble(AssemblyInput {
            source: kind,
            extracted: &extracted,
            tokens: &normalized.tokens,
            vector: Some(vector.as_slice()),
            embedding_model: Some(self.embedder.model_name()),
            metadata,
            ingested_at: Utc::now(),
        });

        let upsert = self.store.upsert(&record).await?;
        info!(
            "{:?} {} {} ({} tokens)",
            upsert,
            kind,
            record.display_id().unwrap_or_else(|| "<unkeyed>".to_string()),
            record.tokens.len()
        );

        Ok(IngestOutcome { record, upsert })
    }

    /// Embed `text` the same way stored records were embedded and return the
    /// stored documents of the target kind scoring strictly above `threshold`.
    pub async fn search(&self, text: &str, kind: SourceKind, threshold: f64) -> Result<SearchReport> {
        let query = self.extractor.extract(text, kind);
        let normalized = self.normalizer.normalize(text);
        let vector = self.embedder.embed(&normalized.cleaned).await?;

        let outcome = self
            .query_builder
            .search(self.store.as_ref(), &vector, threshold)
            .await?;

        Ok(SearchReport {
            query,
            query_tokens: normalized.tokens.len(),
            threshold,
            candidates: outcome.candidates,
            results: outcome.results,
        })
    }
}
