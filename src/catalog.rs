//! Tabular catalog model: the table of contents being narrowed down.
use crate::error::{Result, TocError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Prefix of the per-column score fields written by a filter step
pub const SEARCH_PREFIX: &str = "search.";
pub const REASON_COLUMN: &str = "reason_column";
pub const REASON_VALUE: &str = "reason_value";

/// Whether a column was produced by a previous filter step
pub fn is_derived_column(name: &str) -> bool {
    name.starts_with(SEARCH_PREFIX) || name == REASON_COLUMN || name == REASON_VALUE
}

/// A single cell of a catalog
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interpret a raw delimited-text cell
    fn parse_cell(cell: &str) -> Value {
        let cell = cell.trim();
        if cell.is_empty() {
            return Value::Null;
        }
        match cell.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(cell.to_string()),
        }
    }

    fn from_json(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => Value::Number(f),
                _ => Value::Text(n.to_string()),
            },
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            other => Value::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

#[derive(Deserialize)]
struct RawCatalog {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawCatalog> for Catalog {
    type Error = TocError;

    fn try_from(raw: RawCatalog) -> Result<Self> {
        Catalog::new(raw.columns, raw.rows)
    }
}

/// Ordered rows sharing one column set. Every row holds exactly one value per column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct Catalog {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Borrowed view of one catalog row
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn iter(self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Catalog {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TocError::MalformedCatalog(format!(
                    "row {i} has {} values but the catalog has {} columns",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a catalog from JSON objects, taking columns in first-seen key order
    pub fn from_objects(objects: Vec<serde_json::Map<String, serde_json::Value>>) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = objects
            .into_iter()
            .map(|mut object| {
                columns
                    .iter()
                    .map(|c| object.remove(c).map(Value::from_json).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self::new(columns, rows)
    }

    /// Parse tab-separated text whose first non-empty line is the header
    pub fn from_tsv(content: &str) -> Result<Self> {
        let mut lines = content
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| TocError::MalformedCatalog("missing header line".to_string()))?;
        let columns: Vec<String> = header.split('\t').map(|c| c.trim().to_string()).collect();

        let rows = lines
            .map(|line| line.split('\t').map(Value::parse_cell).collect())
            .collect();

        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Copy of the catalog without score and reason columns from earlier steps
    pub fn without_derived(&self) -> Catalog {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !is_derived_column(c))
            .map(|(i, _)| i)
            .collect();

        if keep.len() == self.columns.len() {
            return self.clone();
        }

        Catalog {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Stable content hash, identical for equal catalogs in any process
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        let hash = blake3::hash(&bytes).to_hex().to_string();
        Ok(hash[..16].to_string())
    }
}

/// Read a catalog from a `.json` or tab-separated file
pub fn load(path: &Path) -> Result<Catalog> {
    let content = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Array(items) => {
                let objects = items
                    .into_iter()
                    .map(|item| match item {
                        serde_json::Value::Object(map) => Ok(map),
                        other => Err(TocError::MalformedCatalog(format!(
                            "expected an object per record, found {other}"
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Catalog::from_objects(objects)
            }
            value @ serde_json::Value::Object(_) => Ok(serde_json::from_value(value)?),
            _ => Err(TocError::MalformedCatalog(
                "expected a table object or an array of records".to_string(),
            )),
        },
        "tsv" | "tab" | "txt" => Catalog::from_tsv(&content),
        other => Err(TocError::MalformedCatalog(format!(
            "unsupported catalog format '{other}' for {}",
            path.display()
        ))),
    }
}
