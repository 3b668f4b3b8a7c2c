use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TocError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Current selection is empty after {depth} search(es); backtrack before filtering again")]
    EmptyState { depth: usize },

    #[error("Cannot backtrack {requested} step(s): only {depth} search(es) recorded")]
    HistoryRange { requested: usize, depth: usize },

    #[error("Malformed catalog: {0}")]
    MalformedCatalog(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("An unexpected error occurred: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TocError>;
