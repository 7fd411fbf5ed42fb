//! Input adapters: document files and scraped posting feeds

pub mod file_detector;
pub mod manager;
pub mod postings;
pub mod text_extractor;
