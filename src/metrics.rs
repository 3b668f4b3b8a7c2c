use crate::error::Result;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub filters_applied: IntCounter,
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub cache_write_failures: IntCounter,
    pub rows_scored: IntCounter,
    pub backtracks: IntCounter,
    registry: Arc<Registry>,
}

fn counter(name: &str, help: &str, registry: &Registry) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        Ok(Metrics {
            filters_applied: counter(
                "filters_applied",
                "Number of filter steps that changed the session state",
                &registry,
            )?,
            cache_hits: counter("cache_hits", "Number of search results served from cache", &registry)?,
            cache_misses: counter(
                "cache_misses",
                "Number of search results computed by the filter engine",
                &registry,
            )?,
            cache_write_failures: counter(
                "cache_write_failures",
                "Number of search results that could not be persisted",
                &registry,
            )?,
            rows_scored: counter("rows_scored", "Number of rows scored against a term", &registry)?,
            backtracks: counter("backtracks", "Number of backtrack operations", &registry)?,
            registry: Arc::new(registry),
        })
    }

    pub fn gather(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
