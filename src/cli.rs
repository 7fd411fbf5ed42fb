//! CLI interface for the job vectorizer

use crate::config::{OutputFormat, MAX_NUM_CANDIDATES};
use crate::processing::extractor::SourceKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jobvec")]
#[command(about = "Vectorize job postings and resumes and search them by similarity")]
#[command(long_about = "Extract structured fields from job postings and resumes, embed them with a local Model2Vec model, store them in MongoDB Atlas and run vector similarity searches")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest posting or resume documents (PDF, TXT, MD) into the store
    Ingest {
        /// What the documents are
        #[arg(short, long, value_enum, default_value = "job")]
        kind: DocumentKind,

        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format: console, json
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Ingest scraped postings from a JSON Lines feed
    IngestPostings {
        /// Feed file, one posting object per line
        file: PathBuf,

        /// Output format: console, json
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Find stored documents similar to a resume or free text
    Search {
        /// Path to the query document (PDF, TXT, MD)
        #[arg(short, long, conflicts_with = "text", required_unless_present = "text")]
        resume: Option<PathBuf>,

        /// Query text given inline
        #[arg(short, long)]
        text: Option<String>,

        /// How to read labels in the query
        #[arg(short, long, value_enum, default_value = "resume")]
        kind: DocumentKind,

        /// Kind of stored record to search (defaults to search.target)
        #[arg(long, value_enum)]
        target: Option<DocumentKind>,

        /// Keep only scores strictly above this value
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Maximum number of results
        #[arg(short, long, value_parser = parse_limit)]
        limit: Option<usize>,

        /// Show the extracted query fields
        #[arg(short, long)]
        detailed: bool,

        /// Output format: console, json
        #[arg(short, long)]
        output: Option<String>,

        /// Save output to file
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Verify the store connection, vector index and embedding model
    Check,

    /// Model management commands
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentKind {
    Job,
    Resume,
}

impl From<DocumentKind> for SourceKind {
    fn from(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Job => SourceKind::JobPosting,
            DocumentKind::Resume => SourceKind::Resume,
        }
    }
}

#[derive(Subcommand)]
pub enum ModelAction {
    /// List available embedding models
    List,

    /// Download a model
    Download {
        /// Model name or HuggingFace repo ID
        model: String,

        /// Force re-download if model exists
        #[arg(short, long)]
        force: bool,
    },

    /// Remove a downloaded model
    Remove {
        /// Model name to remove
        model: String,
    },

    /// Show model information
    Info {
        /// Model name
        model: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file location
    Path,

    /// Reset configuration to defaults
    Reset,
}

/// Similarity threshold override; must be a finite number
pub fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|_| format!("Invalid threshold: {}", value))?;
    if !threshold.is_finite() {
        return Err(format!("Threshold must be a finite number, got {}", value));
    }
    Ok(threshold)
}

/// Result limit override; same bounds as `search.limit`
pub fn parse_limit(value: &str) -> Result<usize, String> {
    let limit: usize = value
        .parse()
        .map_err(|_| format!("Invalid limit: {}", value))?;
    if limit == 0 || limit > MAX_NUM_CANDIDATES {
        return Err(format!(
            "Limit must be between 1 and {}, got {}",
            MAX_NUM_CANDIDATES, limit
        ));
    }
    Ok(limit)
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json",
            format
        )),
    }
}
