//! Filter sessions: the current selection, the applied terms and undo
use crate::catalog::{Catalog, Value};
use crate::error::{Result, TocError};
use crate::metrics::Metrics;
use crate::search::engine::relevant_columns;
use crate::search::{CacheKey, FilterEngine, FilterParams, SearchCache, validate_term};
use crate::text::keyword_counts;
use log::{debug, info, warn};
use std::sync::Arc;

/// Where a session stands with respect to further filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No term applied yet
    Fresh,
    Filtered,
    /// A single record is left; filtering is a no-op
    Exhausted,
    /// Nothing is left; filtering requires a backtrack first
    Empty,
}

/// What a call to [`Session::filter`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The term was applied and `rows` records remain
    Narrowed { rows: usize },
    /// The selection already held a single record and was left unchanged
    Exhausted,
    /// The selection was empty and the session stepped back instead
    Backtracked,
}

#[derive(Debug, Clone)]
struct Snapshot {
    state: Catalog,
    searches: Vec<String>,
    step_params: Vec<FilterParams>,
    relevant_columns: Vec<String>,
}

/// Narrows a catalog one search term at a time.
///
/// Keeps a single undo slot for the most recent step; deeper backtracking replays
/// the remaining terms from the initial catalog, served by the cache where possible.
pub struct Session {
    initial: Arc<Catalog>,
    namespace: String,
    state: Catalog,
    searches: Vec<String>,
    /// Parameters each entry of `searches` was applied with
    step_params: Vec<FilterParams>,
    previous: Option<Snapshot>,
    relevant_columns: Vec<String>,
    params: FilterParams,
    auto_backtrack: bool,
    cache: Arc<SearchCache>,
    engine: FilterEngine,
    metrics: Metrics,
}

/// Start a session with default parameters and no persistent cache
pub fn new_session(catalog: Catalog) -> Result<Session> {
    Session::new(catalog, FilterParams::default(), Arc::new(SearchCache::disabled()))
}

impl Session {
    pub fn new(catalog: Catalog, params: FilterParams, cache: Arc<SearchCache>) -> Result<Self> {
        params.validate()?;
        let namespace = catalog.fingerprint()?;
        let metrics = Metrics::new()?;
        let relevant = relevant_columns(&catalog, &params.column_marker);
        debug!(
            "New session over {} records (catalog {namespace}, searchable columns {relevant:?})",
            catalog.len()
        );

        Ok(Self {
            state: catalog.clone(),
            initial: Arc::new(catalog),
            namespace,
            searches: Vec::new(),
            step_params: Vec::new(),
            previous: None,
            relevant_columns: relevant,
            params,
            auto_backtrack: false,
            cache,
            engine: FilterEngine::new(metrics.clone()),
            metrics,
        })
    }

    /// Step back automatically when filtering an empty selection
    pub fn with_auto_backtrack(mut self, enabled: bool) -> Self {
        self.auto_backtrack = enabled;
        self
    }

    /// Report into an existing set of counters
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.engine = FilterEngine::new(metrics.clone());
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> &Catalog {
        &self.state
    }

    pub fn searches(&self) -> &[String] {
        &self.searches
    }

    /// Parameters of each applied search, parallel to [`Session::searches`]
    pub fn step_params(&self) -> &[FilterParams] {
        &self.step_params
    }

    pub fn relevant_columns(&self) -> &[String] {
        &self.relevant_columns
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Replace the parameters used by later `filter` and `traverse` calls
    pub fn set_params(&mut self, params: FilterParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Cache namespace of this session's catalog
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    /// Whether `backtrack(1)` can restore the previous step without replaying
    pub fn can_undo(&self) -> bool {
        self.previous.is_some()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.state.shape()
    }

    pub fn phase(&self) -> Phase {
        match self.state.len() {
            0 => Phase::Empty,
            1 => Phase::Exhausted,
            _ if self.searches.is_empty() => Phase::Fresh,
            _ => Phase::Filtered,
        }
    }

    /// Apply `term` with the session parameters
    pub fn filter(&mut self, term: &str) -> Result<FilterOutcome> {
        let params = self.params.clone();
        self.filter_with(term, &params)
    }

    /// Apply `term` with parameters for this step only
    pub fn filter_with(&mut self, term: &str, params: &FilterParams) -> Result<FilterOutcome> {
        if self.state.len() == 1 {
            warn!("No more filtering possible: a single record is left, ignoring '{term}'");
            return Ok(FilterOutcome::Exhausted);
        }
        if self.state.is_empty() {
            if self.auto_backtrack && !self.searches.is_empty() {
                warn!("No content found, backtracking one step instead of applying '{term}'");
                self.backtrack(1)?;
                return Ok(FilterOutcome::Backtracked);
            }
            return Err(TocError::EmptyState {
                depth: self.searches.len(),
            });
        }
        params.validate()?;
        validate_term(term)?;

        let term = term.trim();
        let steps = self
            .searches
            .iter()
            .map(String::as_str)
            .zip(&self.step_params)
            .chain(std::iter::once((term, params)));
        let key = CacheKey::from_steps(&self.namespace, steps);

        let result = match self.cache.lookup(&key) {
            Some(hit) => {
                self.metrics.cache_hits.inc();
                hit
            }
            None => {
                self.metrics.cache_misses.inc();
                let result = self.engine.apply(&self.state, term, params)?;
                if let Err(e) = self.cache.store(&key, &result) {
                    self.metrics.cache_write_failures.inc();
                    warn!("Could not cache search '{}': {e}", key.text);
                }
                result
            }
        };

        let previous = Snapshot {
            state: std::mem::replace(&mut self.state, result.catalog),
            searches: self.searches.clone(),
            step_params: self.step_params.clone(),
            relevant_columns: std::mem::replace(&mut self.relevant_columns, result.relevant_columns),
        };
        self.previous = Some(previous);
        self.searches.push(term.to_string());
        self.step_params.push(params.clone());
        self.metrics.filters_applied.inc();

        let rows = self.state.len();
        match rows {
            0 => warn!("No content found for '{term}'; backtrack before filtering again"),
            1 => info!("Narrowed down to a single record with '{term}'"),
            _ => debug!("'{term}' left {rows} records"),
        }
        Ok(FilterOutcome::Narrowed { rows })
    }

    /// Undo the last `n` search terms.
    ///
    /// One step is restored from the undo slot when it is filled; anything else
    /// replays the remaining terms, each with the parameters it was first applied
    /// with, from the initial catalog.
    pub fn backtrack(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        let depth = self.searches.len();
        if n > depth {
            return Err(TocError::HistoryRange {
                requested: n,
                depth,
            });
        }
        self.metrics.backtracks.inc();

        if n == 1
            && let Some(previous) = self.previous.take()
        {
            self.state = previous.state;
            self.searches = previous.searches;
            self.step_params = previous.step_params;
            self.relevant_columns = previous.relevant_columns;
            info!("Backtracked to {} records", self.state.len());
            return Ok(());
        }

        let keep = depth - n;
        let terms = self.searches[..keep].to_vec();
        let params = self.step_params[..keep].to_vec();
        debug!("Replaying {keep} search(es) to backtrack {n} step(s)");
        self.replay(terms, params)
    }

    fn replay(&mut self, terms: Vec<String>, params: Vec<FilterParams>) -> Result<()> {
        self.reset();
        for (term, params) in terms.iter().zip(&params) {
            self.filter_with(term, params)?;
        }
        Ok(())
    }

    /// Reset to the initial catalog and apply each term in order with the session parameters
    pub fn traverse<S: AsRef<str>>(&mut self, terms: &[S]) -> Result<()> {
        self.reset();
        for term in terms {
            self.filter(term.as_ref())?;
        }
        Ok(())
    }

    /// Return to the initial catalog with an empty history
    pub fn reset(&mut self) {
        self.state = Catalog::clone(&self.initial);
        self.searches.clear();
        self.step_params.clear();
        self.previous = None;
        self.relevant_columns = relevant_columns(&self.initial, &self.params.column_marker);
    }

    fn searchable_texts(&self) -> impl Iterator<Item = &str> {
        let indices: Vec<usize> = self
            .relevant_columns
            .iter()
            .filter_map(|c| self.state.column_index(c))
            .collect();
        self.state.rows().iter().flat_map(move |row| {
            indices
                .iter()
                .filter_map(|&i| row[i].as_text())
                .collect::<Vec<_>>()
        })
    }

    /// Most frequent keywords in the searchable columns of the current selection
    pub fn relevant(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts = keyword_counts(self.searchable_texts());
        counts.truncate(n);
        counts
    }

    /// Number of records whose searchable columns contain `keyword`, ignoring case
    pub fn contains(&self, keyword: &str) -> usize {
        let keyword = keyword.to_lowercase();
        let indices: Vec<usize> = self
            .relevant_columns
            .iter()
            .filter_map(|c| self.state.column_index(c))
            .collect();
        self.state
            .rows()
            .iter()
            .filter(|row| {
                indices.iter().any(|&i| match &row[i] {
                    Value::Text(t) => t.to_lowercase().contains(&keyword),
                    _ => false,
                })
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let titles = [
            "Rail passenger and freight traffic",
            "Rail infrastructure: length of network",
            "Rail network density",
            "Wages",
            "Poverty lines",
        ];
        Catalog::new(
            vec!["title".into(), "code".into()],
            titles
                .iter()
                .enumerate()
                .map(|(i, t)| vec![Value::from(*t), Value::from(format!("C{i}"))])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_phases() {
        let mut session = new_session(catalog()).unwrap();
        assert_eq!(session.phase(), Phase::Fresh);
        assert!(!session.can_undo());

        session.filter("rail").unwrap();
        assert_eq!(session.phase(), Phase::Filtered);

        session.filter("density").unwrap();
        assert_eq!(session.phase(), Phase::Exhausted);
        assert_eq!(session.filter("network").unwrap(), FilterOutcome::Exhausted);
        assert_eq!(session.searches(), &["rail", "density"]);
    }

    #[test]
    fn test_second_single_backtrack_replays() {
        let mut session = new_session(catalog()).unwrap();
        session.filter("rail").unwrap();
        session.filter("network").unwrap();
        let after_rail = {
            let mut s = new_session(catalog()).unwrap();
            s.filter("rail").unwrap();
            s.state().clone()
        };

        session.backtrack(1).unwrap();
        assert!(!session.can_undo());
        assert_eq!(session.state(), &after_rail);

        session.backtrack(1).unwrap();
        assert_eq!(session.phase(), Phase::Fresh);
        assert_eq!(session.state(), &catalog());
    }

    #[test]
    fn test_auto_backtrack_on_empty() {
        let mut session = new_session(catalog()).unwrap().with_auto_backtrack(true);
        session.filter("rail").unwrap();
        let after_rail = session.state().clone();
        session.filter("zzzzzzzz").unwrap();
        assert_eq!(session.phase(), Phase::Empty);

        assert_eq!(session.filter("network").unwrap(), FilterOutcome::Backtracked);
        assert_eq!(session.state(), &after_rail);
        assert_eq!(session.searches(), &["rail"]);
    }

    #[test]
    fn test_replay_uses_recorded_params() {
        let raw = FilterParams {
            raw: true,
            ..FilterParams::default()
        };
        let mut session = new_session(catalog()).unwrap();
        session.filter_with("rail", &raw).unwrap();
        let after_raw = session.state().clone();
        assert_eq!(after_raw.len(), 5);

        session.filter("network").unwrap();
        session.filter("density").unwrap();
        assert_eq!(session.len(), 1);

        session.backtrack(2).unwrap();
        assert_eq!(session.state(), &after_raw);
        assert_eq!(session.searches(), &["rail"]);
        assert!(session.step_params()[0].raw);
        assert!(!session.params().raw);
    }

    #[test]
    fn test_backtrack_zero_is_noop() {
        let mut session = new_session(catalog()).unwrap();
        session.filter("rail").unwrap();
        session.backtrack(0).unwrap();
        assert_eq!(session.searches(), &["rail"]);
        assert!(session.can_undo());
    }

    #[test]
    fn test_relevant_keywords() {
        let session = new_session(catalog()).unwrap();
        let top = session.relevant(2);
        assert_eq!(top, vec![("rail".to_string(), 3), ("network".to_string(), 2)]);
    }

    #[test]
    fn test_contains_counts_records() {
        let session = new_session(catalog()).unwrap();
        assert_eq!(session.contains("RAIL"), 3);
        assert_eq!(session.contains("wages"), 1);
        assert_eq!(session.contains("gdp"), 0);
    }

    #[test]
    fn test_metrics_follow_session() {
        let mut session = new_session(catalog()).unwrap();
        session.filter("rail").unwrap();
        session.backtrack(1).unwrap();
        assert_eq!(session.metrics().filters_applied.get(), 1);
        assert_eq!(session.metrics().cache_misses.get(), 1);
        assert_eq!(session.metrics().backtracks.get(), 1);
        assert_eq!(session.metrics().rows_scored.get(), 5);
    }
}
