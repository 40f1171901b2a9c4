// In-memory tables — the spreadsheet-shaped input of every analysis.
//
// A table is a header row plus string cells. Typing happens later, in the
// normalizer, so loaders never reject a row for its content: a rank of
// "n/a" is the normalizer's business, not the loader's.

pub mod delimited;
pub mod json;

use std::path::Path;

use thiserror::Error;

use crate::error::ConfigurationError;

/// Failures while reading an input table from disk.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited input: {0}")]
    Delimited(#[from] ::csv::Error),

    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported JSON shape: {0}")]
    JsonShape(String),

    #[error("cannot infer input format from '{0}' (use --input-format)")]
    UnknownFormat(String),
}

/// On-disk formats a table can be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    Csv,
    Tsv,
    Json,
    Jsonl,
}

impl InputFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "tsv" | "tab" => Some(InputFormat::Tsv),
            "json" => Some(InputFormat::Json),
            "jsonl" | "ndjson" => Some(InputFormat::Jsonl),
            _ => None,
        }
    }
}

/// A rectangular table of string cells with named columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given header. Header names are trimmed.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().trim().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with empty cells and long rows
    /// are cut to the header width, the way spreadsheet exports behave.
    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = cells
            .into_iter()
            .map(Into::into)
            .take(self.columns.len())
            .collect();
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact (trimmed) name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|c| c == name)
    }

    /// Like `column_index`, but a missing column is a configuration error
    /// that names what the table does have.
    pub fn require_column(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.column_index(name)
            .ok_or_else(|| ConfigurationError::UnknownColumn {
                column: name.trim().to_string(),
                available: self.columns.clone(),
            })
    }

    /// Load a table from disk, inferring the format from the extension
    /// unless one is given.
    pub fn load(path: &Path, format: Option<InputFormat>) -> Result<Self, TableError> {
        let format = match format.or_else(|| InputFormat::from_path(path)) {
            Some(f) => f,
            None => return Err(TableError::UnknownFormat(path.display().to_string())),
        };

        let content = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let table = match format {
            InputFormat::Csv => delimited::parse(&content, b',')?,
            InputFormat::Tsv => delimited::parse(&content, b'\t')?,
            InputFormat::Json => json::parse_array(&content)?,
            InputFormat::Jsonl => json::parse_lines(&content)?,
        };

        tracing::info!(
            path = %path.display(),
            columns = table.columns.len(),
            rows = table.len(),
            "Loaded input table"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_row_pads_and_truncates() {
        let mut t = Table::new(&["a", "b", "c"]);
        t.push_row(["1"]);
        t.push_row(["1", "2", "3", "4"]);
        assert_eq!(t.rows()[0], vec!["1", "", ""]);
        assert_eq!(t.rows()[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn headers_are_trimmed_for_lookup() {
        let t = Table::new(&[" Keyword ", "URL"]);
        assert_eq!(t.column_index("Keyword"), Some(0));
        assert_eq!(t.column_index(" URL "), Some(1));
    }

    #[test]
    fn require_column_reports_missing() {
        let t = Table::new(&["Keyword"]);
        let err = t.require_column("Position").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownColumn { ref column, .. } if column == "Position"));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("x.CSV")), Some(InputFormat::Csv));
        assert_eq!(InputFormat::from_path(Path::new("x.ndjson")), Some(InputFormat::Jsonl));
        assert_eq!(InputFormat::from_path(Path::new("x.xlsx")), None);
    }
}
