//! Integration tests for the input adapters

use jobvec::error::JobVecError;
use jobvec::input::manager::InputManager;
use jobvec::input::postings::read_feed;
use jobvec::processing::extractor::{FieldExtractor, SourceKind};
use std::path::{Path, PathBuf};

#[tokio::test]
async fn test_text_extraction_from_txt() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/sample_resume.txt");

    let result = manager.extract_text(path).await;
    assert!(result.is_ok());

    let text = result.unwrap();
    assert!(text.contains("John Doe"));
    assert!(text.contains("Software Engineer"));
    assert!(text.contains("React"));
    assert!(text.contains("Node.js"));
}

#[tokio::test]
async fn test_text_extraction_from_markdown() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/sample_resume.md");

    let result = manager.extract_text(path).await;
    assert!(result.is_ok());

    let text = result.unwrap();
    assert!(text.contains("John Doe"));
    assert!(text.contains("Software Engineer"));
    assert!(text.contains("React"));
    assert!(text.contains("Node.js"));
    // Should not contain markdown formatting
    assert!(!text.contains("**"));
    assert!(!text.contains("##"));
}

#[tokio::test]
async fn test_markdown_resume_labels_survive_flattening() {
    let mut manager = InputManager::new();
    let text = manager
        .extract_text(Path::new("tests/fixtures/sample_resume.md"))
        .await
        .unwrap();

    let fields = FieldExtractor::new().extract(&text, SourceKind::Resume);
    assert_eq!(fields.title.as_deref(), Some("Senior Software Engineer"));
    assert_eq!(fields.location.as_deref(), Some("Austin, TX"));
    assert_eq!(fields.work_experience.as_deref(), Some("8 years"));
    assert_eq!(
        fields.skillset,
        Some(vec![
            "Rust".to_string(),
            "React".to_string(),
            "Node.js".to_string(),
            "PostgreSQL".to_string()
        ])
    );
}

#[tokio::test]
async fn test_posting_fixture_fields() {
    let mut manager = InputManager::new();
    let text = manager
        .extract_text(Path::new("tests/fixtures/sample_posting.txt"))
        .await
        .unwrap();

    let fields = FieldExtractor::new().extract(&text, SourceKind::JobPosting);
    assert_eq!(fields.id, Some(4821));
    assert_eq!(fields.title.as_deref(), Some("Backend Engineer"));
    assert_eq!(fields.sponsorship.as_deref(), Some("Available"));
    assert_eq!(fields.link.as_deref(), Some("https://jobs.example.com/postings/4821"));
    assert_eq!(fields.work_experience, None);
}

#[tokio::test]
async fn test_caching_functionality() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/sample_resume.txt");

    // First extraction
    let text1 = manager.extract_text(path).await.unwrap();
    assert_eq!(manager.cache_size(), 1);

    // Second extraction should use cache
    let text2 = manager.extract_text(path).await.unwrap();
    assert_eq!(text1, text2);
    assert_eq!(manager.cache_size(), 1);

    manager.clear_cache();
    assert_eq!(manager.cache_size(), 0);
}

#[tokio::test]
async fn test_cache_can_be_disabled() {
    let mut manager = InputManager::new().with_cache(false);
    manager
        .extract_text(Path::new("tests/fixtures/sample_resume.txt"))
        .await
        .unwrap();
    assert_eq!(manager.cache_size(), 0);
}

#[tokio::test]
async fn test_unsupported_file_type() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/unsupported.xyz");

    let result = manager.extract_text(path).await;
    assert!(matches!(result, Err(JobVecError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_nonexistent_file() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/nonexistent.txt");

    let result = manager.extract_text(path).await;
    assert!(matches!(result, Err(JobVecError::InvalidInput(_))));
}

#[test]
fn test_collect_paths_expands_directories() {
    let manager = InputManager::new();
    let paths = manager
        .collect_paths(&[PathBuf::from("tests/fixtures")])
        .unwrap();

    let names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["sample_posting.txt", "sample_resume.md", "sample_resume.txt"]
    );
}

#[test]
fn test_collect_paths_keeps_explicit_files() {
    let manager = InputManager::new();
    let inputs = vec![PathBuf::from("tests/fixtures/unsupported.xyz")];
    assert_eq!(manager.collect_paths(&inputs).unwrap(), inputs);
}

#[tokio::test]
async fn test_feed_reports_bad_lines_individually() {
    let feed = read_feed(Path::new("tests/fixtures/postings.jsonl")).await.unwrap();

    let line_numbers: Vec<usize> = feed.iter().map(|line| line.line_number).collect();
    assert_eq!(line_numbers, vec![1, 3, 4, 5, 6]);

    assert!(feed[0].posting.is_ok());
    assert!(feed[1].posting.is_ok());
    assert!(matches!(feed[2].posting, Err(JobVecError::InvalidInput(_))));
    assert!(matches!(feed[3].posting, Err(JobVecError::Serialization(_))));
    assert!(feed[4].posting.is_ok());

    let first = feed[0].posting.as_ref().unwrap();
    assert_eq!(first.company.as_deref(), Some("Acme"));
    assert_eq!(
        first.insights,
        Some(vec!["Remote".to_string(), "Full-time".to_string()])
    );
}

#[tokio::test]
async fn test_missing_feed_is_invalid_input() {
    let result = read_feed(Path::new("tests/fixtures/missing.jsonl")).await;
    assert!(matches!(result, Err(JobVecError::InvalidInput(_))));
}
