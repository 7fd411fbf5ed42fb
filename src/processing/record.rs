//! Canonical record assembly

use crate::processing::extractor::{ExtractedFields, SourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The unit persisted to the store. Optional fields serialize as explicit
/// `null` so "not extracted" stays distinguishable from "extracted as empty".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Option<i64>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub sponsorship: Option<String>,
    pub skillset: Option<Vec<String>>,
    pub work_experience: Option<String>,
    pub company: Option<String>,
    pub company_link: Option<String>,
    pub date: Option<String>,
    pub insights: Option<Vec<String>>,
    pub description_length: Option<i64>,
    pub source: SourceKind,
    pub tokens: Vec<String>,
    pub vector: Option<Vec<f32>>,
    pub embedding_model: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

/// Structured fields delivered alongside the text, e.g. by a scraper.
/// Anything set here overrides the extracted value of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: Option<String>,
    pub company: Option<String>,
    pub company_link: Option<String>,
    pub date: Option<String>,
    pub link: Option<String>,
    pub insights: Option<Vec<String>>,
    pub description_length: Option<i64>,
}

/// Everything the assembler merges into one record.
pub struct AssemblyInput<'a> {
    pub source: SourceKind,
    pub extracted: &'a ExtractedFields,
    pub tokens: &'a [String],
    pub vector: Option<&'a [f32]>,
    pub embedding_model: Option<&'a str>,
    pub metadata: Option<&'a SourceMetadata>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RecordAssembler;

impl RecordAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build a record from borrowed parts; inputs are never modified.
    pub fn assemble(&self, input: AssemblyInput<'_>) -> Record {
        let extracted = input.extracted;
        let empty = SourceMetadata::default();
        let metadata = input.metadata.unwrap_or(&empty);

        Record {
            id: extracted.id,
            link: prefer(&metadata.link, &extracted.link),
            title: prefer(&metadata.title, &extracted.title),
            location: extracted.location.clone(),
            sponsorship: extracted.sponsorship.clone(),
            skillset: extracted.skillset.clone(),
            work_experience: extracted.work_experience.clone(),
            company: metadata.company.clone(),
            company_link: metadata.company_link.clone(),
            date: metadata.date.clone(),
            insights: metadata.insights.clone(),
            description_length: metadata.description_length,
            source: input.source,
            tokens: input.tokens.to_vec(),
            vector: input.vector.map(|v| v.to_vec()),
            embedding_model: input.embedding_model.map(|name| name.to_string()),
            ingested_at: input.ingested_at,
        }
    }
}

fn prefer<T: Clone>(metadata: &Option<T>, extracted: &Option<T>) -> Option<T> {
    metadata.as_ref().or(extracted.as_ref()).cloned()
}

impl Record {
    /// Stable display identifier: the numeric id when known, else the link.
    pub fn display_id(&self) -> Option<String> {
        self.id
            .map(|id| id.to_string())
            .or_else(|| self.link.clone())
    }
}
