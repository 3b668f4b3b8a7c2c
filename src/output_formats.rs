use crate::catalog::{REASON_COLUMN, REASON_VALUE, Value, is_derived_column};
use crate::session::Session;
use clap::ValueEnum;
use colored::*;
use serde_json::{Value as JsonValue, json};
use std::fmt;

/// Output format types
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Renders the current selection of a session
pub struct OutputFormatter {
    format: OutputFormat,
    limit: Option<usize>,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            limit: None,
        }
    }

    /// Show at most `limit` records
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn format_session(&self, session: &Session) -> String {
        match self.format {
            OutputFormat::Text => self.format_text(session),
            OutputFormat::Json => self.format_json(session),
        }
    }

    pub fn format_keywords(&self, keywords: &[(String, usize)]) -> String {
        match self.format {
            OutputFormat::Text => keywords
                .iter()
                .map(|(token, count)| format!("{:>6}  {}", count, token.cyan()))
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Json => {
                let items: Vec<JsonValue> = keywords
                    .iter()
                    .map(|(token, count)| json!({ "keyword": token, "count": count }))
                    .collect();
                serde_json::to_string_pretty(&items).unwrap_or_default()
            }
        }
    }

    fn shown(&self, total: usize) -> usize {
        self.limit.map_or(total, |limit| limit.min(total))
    }

    fn format_text(&self, session: &Session) -> String {
        let state = session.state();
        let mut out = String::new();

        let path = if session.searches().is_empty() {
            "(no search)".dimmed().to_string()
        } else {
            session.searches().join(" > ").yellow().to_string()
        };
        out.push_str(&format!(
            "{} {} {} {}\n",
            "Found".green(),
            state.len(),
            "records for".green(),
            path
        ));

        let data_columns: Vec<usize> = state
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| !is_derived_column(c))
            .map(|(i, _)| i)
            .collect();
        let reason_column = state.column_index(REASON_COLUMN);
        let reason_value = state.column_index(REASON_VALUE);

        let shown = self.shown(state.len());
        for (i, row) in state.rows().iter().take(shown).enumerate() {
            let fields: Vec<String> = data_columns
                .iter()
                .map(|&c| row[c].to_string())
                .filter(|s| !s.is_empty())
                .collect();
            out.push_str(&format!("{} {}", format!("[{}]", i + 1).cyan(), fields.join(" | ")));

            if let (Some(rc), Some(rv)) = (reason_column, reason_value)
                && let (Value::Text(column), Value::Number(score)) = (&row[rc], &row[rv])
            {
                out.push_str(&format!(" {}", format!("({score:.3} via {column})").dimmed()));
            }
            out.push('\n');
        }

        if state.len() > shown {
            out.push_str(&format!(
                "{}\n",
                format!("... and {} more records", state.len() - shown).dimmed()
            ));
        }
        out
    }

    fn format_json(&self, session: &Session) -> String {
        let state = session.state();
        let records: Vec<JsonValue> = state
            .records()
            .take(self.shown(state.len()))
            .map(|record| {
                let object: serde_json::Map<String, JsonValue> = record
                    .iter()
                    .map(|(column, value)| {
                        let value = match value {
                            Value::Null => JsonValue::Null,
                            Value::Number(n) => json!(n),
                            Value::Text(s) => json!(s),
                        };
                        (column.to_string(), value)
                    })
                    .collect();
                JsonValue::Object(object)
            })
            .collect();

        let result = json!({
            "searches": session.searches(),
            "total_records": state.len(),
            "relevant_columns": session.relevant_columns(),
            "records": records,
        });
        serde_json::to_string_pretty(&result).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::session::new_session;

    fn session() -> Session {
        let catalog = Catalog::new(
            vec!["title".into(), "code".into()],
            vec![
                vec!["Rail network density".into(), "RA1".into()],
                vec!["Rail passenger traffic".into(), "RA2".into()],
                vec!["Wages".into(), "PS43".into()],
            ],
        )
        .unwrap();
        let mut session = new_session(catalog).unwrap();
        session.filter("rail").unwrap();
        session
    }

    #[test]
    fn test_json_output() {
        let output = OutputFormatter::new(OutputFormat::Json).format_session(&session());
        let parsed: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["searches"], json!(["rail"]));
        assert_eq!(parsed["total_records"], json!(2));
        assert_eq!(parsed["records"][0]["code"], json!("RA1"));
        assert_eq!(parsed["records"][0]["reason_column"], json!("title"));
    }

    #[test]
    fn test_text_output_limit() {
        let output = OutputFormatter::new(OutputFormat::Text)
            .with_limit(Some(1))
            .format_session(&session());
        assert!(output.contains("Rail network density | RA1"));
        assert!(!output.contains("RA2"));
        assert!(output.contains("1 more records"));
    }

    #[test]
    fn test_keywords_json() {
        let keywords = vec![("rail".to_string(), 2)];
        let output = OutputFormatter::new(OutputFormat::Json).format_keywords(&keywords);
        let parsed: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["keyword"], json!("rail"));
    }
}
