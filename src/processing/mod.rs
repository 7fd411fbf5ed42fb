//! Field extraction, normalization, embedding and record assembly

pub mod embedding_manager;
pub mod embeddings;
pub mod extractor;
pub mod record;
pub mod text_processor;
