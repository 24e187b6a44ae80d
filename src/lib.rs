use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatcherError>;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("Unsupported file format: {0} (expected a .csv or .xlsx file)")]
    UnsupportedFormat(String),

    #[error("The dataset must contain a '{0}' column")]
    MissingColumn(String),

    #[error("The dataset is empty")]
    EmptyDataset,

    #[error("The query does not contain any skills")]
    EmptyQuery,

    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid top-k value: {0} (must be at least 1)")]
    InvalidTopK(usize),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod matching;
