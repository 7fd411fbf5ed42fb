//! Job posting and resume vectorizer library

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod search;
pub mod store;

pub use config::Config;
pub use error::{JobVecError, Result};
pub use pipeline::Pipeline;
