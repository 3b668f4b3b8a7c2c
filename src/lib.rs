pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod interactive;
pub mod metrics;
pub mod output_formats;
pub mod search;
pub mod session;
pub mod similarity;
pub mod text;

pub use crate::catalog::{Catalog, Record, Value};
pub use crate::cli::{CacheAction, Cli, Commands, FilterArgs};
pub use crate::config::Config;
pub use crate::error::{Result, TocError};
pub use crate::search::{CacheKey, FilterParams, SearchCache, SearchResult};
pub use crate::session::{FilterOutcome, Phase, Session, new_session};
pub use clap::Parser;
use std::path::Path;
use std::sync::Arc;

/// Fold command-line overrides into the loaded configuration
pub fn apply_overrides(config: &mut Config, args: &FilterArgs) {
    if let Some(marker) = &args.marker {
        config.filter.column_marker = marker.clone();
    }
    if let Some(bonus) = args.bonus {
        config.filter.literal_match_bonus = bonus;
    }
    if let Some(threshold) = args.threshold {
        config.filter.retention_threshold = threshold;
    }
    if args.raw {
        config.filter.raw = true;
    }
    if args.no_cache {
        config.cache.enabled = false;
    }
    if let Some(dir) = &args.cache_dir {
        config.cache.root = Some(dir.clone());
    }
    if args.auto_backtrack {
        config.session.auto_backtrack = true;
    }
}

/// Load a catalog file and open a session over it
pub fn open_session(catalog_path: &Path, config: &Config) -> Result<Session> {
    let catalog = catalog::load(catalog_path)?;
    let cache = Arc::new(config.cache.build());
    Ok(Session::new(catalog, config.filter.clone(), cache)?
        .with_auto_backtrack(config.session.auto_backtrack))
}
