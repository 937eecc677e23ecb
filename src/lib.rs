use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CinemateError>;

#[derive(Error, Debug)]
pub enum CinemateError {
    #[error("Not found: {}. {hint}", path.display())]
    NotFound { path: PathBuf, hint: String },

    #[error("Model initialization failed: {0}")]
    ModelInitialization(String),

    #[error("Dimension mismatch at row {row}: expected {expected}, found {found}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Index holds {vectors} vectors but metadata holds {records} records")]
    LengthMismatch { vectors: usize, records: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Narration error: {0}")]
    Narration(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl CinemateError {
    #[inline]
    pub fn not_found(path: impl Into<PathBuf>, hint: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            hint: hint.into(),
        }
    }
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod index;
pub mod retriever;
