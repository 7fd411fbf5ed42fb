//! Line-anchored field extraction for job postings and resumes
//!
//! A label only counts when it starts a line (leading spaces or tabs are
//! allowed). The value is the rest of that line, trimmed. When a label
//! appears more than once, the first occurrence wins.

use crate::error::JobVecError;
use log::warn;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Where a text blob came from; decides label case sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Labels match case-sensitively (`Title:` but not `TITLE:`).
    JobPosting,
    /// Labels match case-insensitively.
    Resume,
}

impl SourceKind {
    /// Value stored in the `source` field of a persisted record.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::JobPosting => "job_posting",
            SourceKind::Resume => "resume",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::JobPosting => write!(f, "job posting"),
            SourceKind::Resume => write!(f, "resume"),
        }
    }
}

/// Fields found in a text blob. `None` means the label was absent;
/// `Some("")` means it was present with an empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub id: Option<i64>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub sponsorship: Option<String>,
    pub skillset: Option<Vec<String>>,
    pub work_experience: Option<String>,
}

struct LabelPatterns {
    id: Regex,
    title: Regex,
    location: Regex,
    sponsorship: Regex,
    skillset: Regex,
    work_experience: Regex,
}

impl LabelPatterns {
    fn new(case_insensitive: bool) -> Self {
        let build = |label: &str| {
            // `[^\S\n]` is horizontal whitespace; the value may not cross a newline
            let pattern = format!(r"(?m)^[^\S\n]*{}[^\S\n]*([^\n]*)$", regex::escape(label));
            RegexBuilder::new(&pattern)
                .case_insensitive(case_insensitive)
                .build()
                .expect("Invalid label regex")
        };

        Self {
            id: build("ID:"),
            title: build("Title:"),
            location: build("Location:"),
            sponsorship: build("Sponsorship:"),
            skillset: build("Skillset:"),
            work_experience: build("Work Experience:"),
        }
    }
}

pub struct FieldExtractor {
    posting: LabelPatterns,
    resume: LabelPatterns,
    url_regex: Regex,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self {
            posting: LabelPatterns::new(false),
            resume: LabelPatterns::new(true),
            url_regex: Regex::new(r"https?://[^\s]+").expect("Invalid URL regex"),
        }
    }

    /// Extract every recognized field. Never fails: a value that does not
    /// convert is logged and left as `None`.
    pub fn extract(&self, text: &str, kind: SourceKind) -> ExtractedFields {
        let patterns = match kind {
            SourceKind::JobPosting => &self.posting,
            SourceKind::Resume => &self.resume,
        };

        let id = first_value(&patterns.id, text).and_then(|raw| match parse_id(&raw) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("{}; leaving id empty", e);
                None
            }
        });

        ExtractedFields {
            id,
            link: self.url_regex.find(text).map(|m| m.as_str().to_string()),
            title: first_value(&patterns.title, text),
            location: first_value(&patterns.location, text),
            sponsorship: first_value(&patterns.sponsorship, text),
            skillset: first_value(&patterns.skillset, text).map(|raw| split_skillset(&raw)),
            work_experience: first_value(&patterns.work_experience, text),
        }
    }
}

fn first_value(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim().to_string())
}

/// Parse an `ID:` value as a signed 64-bit integer.
pub fn parse_id(raw: &str) -> std::result::Result<i64, JobVecError> {
    raw.trim().parse::<i64>().map_err(|e| JobVecError::Extraction {
        field: "id",
        message: format!("'{}' is not a valid integer ({})", raw, e),
    })
}

/// Split a comma separated skill list, trimming each entry and dropping empties.
pub fn split_skillset(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|skill| skill.trim())
        .filter(|skill| !skill.is_empty())
        .map(|skill| skill.to_string())
        .collect()
}
