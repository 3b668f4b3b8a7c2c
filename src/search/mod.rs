//! Incremental fuzzy filtering with a persistent result cache
pub mod cache;
pub mod engine;
pub mod key;
pub mod store;

use crate::catalog::Catalog;
use crate::error::{Result, TocError};
use crate::similarity::DEFAULT_LITERAL_MATCH_BONUS;
use serde::{Deserialize, Serialize};

pub use cache::{CacheStats, SearchCache};
pub use engine::FilterEngine;
pub use key::CacheKey;
pub use store::{FileStore, Stored, StoredKind};

/// Parameters that shape a filter step. All of them are part of the cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Substring selecting the searchable columns by name
    pub column_marker: String,
    pub literal_match_bonus: f64,
    /// Minimum score a row needs in at least one column to be kept
    pub retention_threshold: f64,
    /// Score every row but keep all of them
    pub raw: bool,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            column_marker: "title".to_string(),
            literal_match_bonus: DEFAULT_LITERAL_MATCH_BONUS,
            retention_threshold: 0.3,
            raw: false,
        }
    }
}

impl FilterParams {
    pub fn validate(&self) -> Result<()> {
        if self.column_marker.is_empty() {
            return Err(TocError::Configuration(
                "column marker must not be empty".to_string(),
            ));
        }
        if !self.literal_match_bonus.is_finite() {
            return Err(TocError::Configuration(format!(
                "literal match bonus must be finite, got {}",
                self.literal_match_bonus
            )));
        }
        if !self.retention_threshold.is_finite() {
            return Err(TocError::Configuration(format!(
                "retention threshold must be finite, got {}",
                self.retention_threshold
            )));
        }
        Ok(())
    }
}

/// Reject terms that carry no characters to match
pub fn validate_term(term: &str) -> Result<()> {
    if term.trim().is_empty() {
        return Err(TocError::Configuration(
            "search term must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Rows retained by one filter step, with their scores and reason attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub catalog: Catalog,
    /// Columns that were scored, in declaration order
    pub relevant_columns: Vec<String>,
}
