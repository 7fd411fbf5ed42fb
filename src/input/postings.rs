//! Scraped job posting events, one JSON object per line

use crate::error::{JobVecError, Result};
use crate::processing::record::SourceMetadata;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One event as delivered by the scraper. `description` is the free text;
/// the other fields are structured metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPosting {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub company_link: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub insights: Option<Vec<String>>,
    pub description: String,
}

impl ScrapedPosting {
    pub fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            title: non_blank(&self.title),
            company: non_blank(&self.company),
            company_link: non_blank(&self.company_link),
            date: non_blank(&self.date),
            link: non_blank(&self.link),
            insights: self.insights.clone(),
            description_length: Some(self.description.chars().count() as i64),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// One decoded (or rejected) feed line. A bad line does not stop the rest.
#[derive(Debug)]
pub struct FeedLine {
    pub line_number: usize,
    pub posting: Result<ScrapedPosting>,
}

pub fn parse_posting(line: &str) -> Result<ScrapedPosting> {
    let posting: ScrapedPosting = serde_json::from_str(line)?;
    if posting.description.trim().is_empty() {
        return Err(JobVecError::InvalidInput("posting has an empty description".to_string()));
    }
    Ok(posting)
}

/// Read every non-blank line of a JSON Lines feed.
pub async fn read_feed(path: &Path) -> Result<Vec<FeedLine>> {
    let file = File::open(path).await.map_err(|e| {
        JobVecError::InvalidInput(format!("Cannot open feed {}: {}", path.display(), e))
    })?;
    let mut lines = BufReader::new(file).lines();
    let mut feed = Vec::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        feed.push(FeedLine {
            line_number,
            posting: parse_posting(&line),
        });
    }

    Ok(feed)
}
