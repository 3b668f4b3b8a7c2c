//! Filter engine: scores the searchable columns and keeps the rows that clear the threshold
use super::{FilterParams, SearchResult, validate_term};
use crate::catalog::{Catalog, REASON_COLUMN, REASON_VALUE, SEARCH_PREFIX, Value, is_derived_column};
use crate::error::{Result, TocError};
use crate::metrics::Metrics;
use crate::similarity::score;
use log::debug;
use rayon::prelude::*;

/// Reason recorded for rows kept by a raw (non-filtering) step
pub const RAW_REASON: &str = "raw";

/// Searchable columns of `catalog`: names containing `marker`, excluding score and reason columns
pub fn relevant_columns(catalog: &Catalog, marker: &str) -> Vec<String> {
    catalog
        .columns()
        .iter()
        .filter(|c| !is_derived_column(c) && c.contains(marker))
        .cloned()
        .collect()
}

/// Index and value of the first maximum
fn argmax(scores: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, &s) in scores.iter().enumerate() {
        if s > best.1 {
            best = (i, s);
        }
    }
    best
}

/// Applies one search term to a catalog
pub struct FilterEngine {
    metrics: Metrics,
}

impl FilterEngine {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Score every row of `current` against `term` and keep the ones matching any column.
    ///
    /// The result carries one `search.<column>` score per relevant column plus the
    /// column and score that explain each row. Scores from an earlier step are replaced.
    pub fn apply(&self, current: &Catalog, term: &str, params: &FilterParams) -> Result<SearchResult> {
        params.validate()?;
        validate_term(term)?;

        let base = current.without_derived();
        let relevant = relevant_columns(&base, &params.column_marker);
        if relevant.is_empty() {
            return Err(TocError::Configuration(format!(
                "no column name contains '{}' (columns: {})",
                params.column_marker,
                base.columns().join(", ")
            )));
        }
        let indices: Vec<usize> = relevant
            .iter()
            .filter_map(|c| base.column_index(c))
            .collect();

        let scores: Vec<Vec<f64>> = base
            .rows()
            .par_iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|&i| score(term, &row[i], params.literal_match_bonus))
                    .collect()
            })
            .collect();
        self.metrics.rows_scored.inc_by(base.len() as u64);

        let mut columns = base.columns().to_vec();
        columns.extend(relevant.iter().map(|c| format!("{SEARCH_PREFIX}{c}")));
        columns.push(REASON_COLUMN.to_string());
        columns.push(REASON_VALUE.to_string());

        let rows: Vec<Vec<Value>> = base
            .rows()
            .iter()
            .zip(scores)
            .filter_map(|(row, row_scores)| {
                let (best_idx, best) = argmax(&row_scores);
                if !params.raw && best < params.retention_threshold {
                    return None;
                }
                let reason = if params.raw {
                    RAW_REASON.to_string()
                } else {
                    relevant[best_idx].clone()
                };

                let mut values = row.clone();
                values.extend(row_scores.into_iter().map(Value::Number));
                values.push(Value::Text(reason));
                values.push(Value::Number(best));
                Some(values)
            })
            .collect();

        debug!(
            "Filter '{term}' kept {} of {} rows over columns {:?}",
            rows.len(),
            base.len(),
            relevant
        );

        Ok(SearchResult {
            catalog: Catalog::new(columns, rows)?,
            relevant_columns: relevant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> FilterEngine {
        FilterEngine::new(Metrics::new().unwrap())
    }

    fn titles(values: &[&str]) -> Catalog {
        Catalog::new(
            vec!["title".into(), "code".into()],
            values
                .iter()
                .enumerate()
                .map(|(i, t)| vec![Value::from(*t), Value::from(format!("C{i}"))])
                .collect(),
        )
        .unwrap()
    }

    fn texts(catalog: &Catalog, column: &str) -> Vec<String> {
        let idx = catalog.column_index(column).unwrap();
        catalog.rows().iter().map(|r| r[idx].to_string()).collect()
    }

    #[test]
    fn test_keeps_literal_matches() {
        let catalog = titles(&[
            "Rail passenger and freight traffic",
            "Wages",
            "Rail infrastructure: length of network",
            "Poverty lines",
        ]);
        let result = engine()
            .apply(&catalog, "rail", &FilterParams::default())
            .unwrap();

        assert_eq!(texts(&result.catalog, "code"), vec!["C0", "C2"]);
        assert_eq!(result.relevant_columns, vec!["title"]);
        assert_eq!(
            result.catalog.columns(),
            &["title", "code", "search.title", "reason_column", "reason_value"]
        );
        assert_eq!(texts(&result.catalog, REASON_COLUMN), vec!["title", "title"]);
    }

    #[test]
    fn test_any_column_retains_row() {
        let catalog = Catalog::new(
            vec!["title".into(), "subtitle".into()],
            vec![
                vec!["Wages".into(), "Rail network".into()],
                vec!["Rail transport".into(), Value::Null],
                vec!["Housing".into(), "Employment".into()],
            ],
        )
        .unwrap();
        let result = engine()
            .apply(&catalog, "rail", &FilterParams::default())
            .unwrap();

        assert_eq!(result.catalog.len(), 2);
        assert_eq!(texts(&result.catalog, REASON_COLUMN), vec!["subtitle", "title"]);
        let first = result.catalog.record(0).unwrap();
        let title_score = first.get("search.title").and_then(Value::as_number).unwrap();
        let subtitle_score = first.get("search.subtitle").and_then(Value::as_number).unwrap();
        assert!(title_score < params_threshold());
        assert_eq!(first.get(REASON_VALUE), Some(&Value::Number(subtitle_score)));
    }

    fn params_threshold() -> f64 {
        FilterParams::default().retention_threshold
    }

    #[test]
    fn test_ties_resolve_to_first_column() {
        let catalog = Catalog::new(
            vec!["title".into(), "subtitle".into()],
            vec![vec!["Wages".into(), "Wages".into()]],
        )
        .unwrap();
        let result = engine()
            .apply(&catalog, "wages", &FilterParams::default())
            .unwrap();
        assert_eq!(texts(&result.catalog, REASON_COLUMN), vec!["title"]);
    }

    #[test]
    fn test_raw_keeps_everything() {
        let catalog = titles(&["Wages", "Poverty lines", "Communication"]);
        let params = FilterParams {
            raw: true,
            ..FilterParams::default()
        };
        let result = engine().apply(&catalog, "rail", &params).unwrap();
        assert_eq!(result.catalog.len(), 3);
        assert_eq!(texts(&result.catalog, REASON_COLUMN), vec!["raw"; 3]);
    }

    #[test]
    fn test_refilter_replaces_scores() {
        let catalog = titles(&["Rail passenger traffic", "Rail network", "Wages"]);
        let params = FilterParams::default();
        let first = engine().apply(&catalog, "rail", &params).unwrap();
        let second = engine().apply(&first.catalog, "network", &params).unwrap();

        assert_eq!(second.catalog.columns(), first.catalog.columns());
        assert_eq!(texts(&second.catalog, "code"), vec!["C1"]);
        assert_eq!(second.relevant_columns, vec!["title"]);
    }

    #[test]
    fn test_unknown_marker_is_configuration_error() {
        let catalog = titles(&["Wages"]);
        let params = FilterParams {
            column_marker: "label".into(),
            ..FilterParams::default()
        };
        let err = engine().apply(&catalog, "wages", &params).unwrap_err();
        assert!(matches!(err, TocError::Configuration(_)));
    }

    #[test]
    fn test_blank_term_rejected() {
        let catalog = titles(&["Wages"]);
        let err = engine()
            .apply(&catalog, "  ", &FilterParams::default())
            .unwrap_err();
        assert!(matches!(err, TocError::Configuration(_)));
    }

    #[test]
    fn test_rows_scored_metric() {
        let engine = engine();
        let catalog = titles(&["Wages", "Rail network"]);
        engine.apply(&catalog, "rail", &FilterParams::default()).unwrap();
        assert_eq!(engine.metrics.rows_scored.get(), 2);
    }
}
