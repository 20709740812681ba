//! CSV loader: parses delimited text into a [`Dataset`] with inferred
//! measurement levels.
//!
//! The engine trusts any `Dataset` handed to it; this loader is the
//! convenience path from raw CSV. Inference per column: if every non-null
//! field parses as a number the column is scale; otherwise it is nominal,
//! and an all-unique text column is additionally tagged with the id role
//! so automatic suggestion skips it.
//!
//! - RFC 4180 quoting (quoted fields, escaped quotes, embedded commas and
//!   newlines)
//! - Standard null markers recognized: empty, `NA`, `N/A`, `null`,
//!   `NULL`, `None`, `.`, `NaN`
//! - Configurable delimiter, header handling, and null markers
//!
//! # Example
//!
//! ```
//! use autostat::loader::CsvLoader;
//! use autostat::dataset::MeasurementLevel;
//!
//! let csv = "age,gender\n25,M\n30,F\n28,M\n";
//! let ds = CsvLoader::new().load_str(csv).unwrap();
//! assert_eq!(ds.row_count(), 3);
//! assert_eq!(ds.variable("age").unwrap().level, MeasurementLevel::Scale);
//! assert_eq!(ds.variable("gender").unwrap().level, MeasurementLevel::Nominal);
//! ```

use std::collections::BTreeSet;

use crate::dataset::{Dataset, MeasurementLevel, Row, Value, Variable, VariableRole};
use crate::error::EngineError;

/// Standard null markers recognized during parsing.
const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "null", "NULL", "None", "none", ".", "NaN", "nan",
];

/// Minimum unique-value ratio (and row count) for a text column to be
/// treated as an identifier.
const ID_UNIQUE_RATIO: f64 = 0.9;
const ID_MIN_ROWS: usize = 10;

/// CSV loader configuration and entry point.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    delimiter: char,
    has_header: bool,
    null_markers: Vec<String>,
}

impl CsvLoader {
    /// Creates a loader with default settings (comma delimiter, header
    /// row, standard null markers).
    pub fn new() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Sets the field delimiter (default: comma).
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether the first row is a header (default: true).
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Replaces the null markers.
    pub fn null_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Parses a CSV string into a dataset.
    pub fn load_str(&self, input: &str) -> Result<Dataset, EngineError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let raw_rows = self.split_fields(input);
        if raw_rows.is_empty() {
            return Dataset::new(Vec::new(), Vec::new());
        }

        let (headers, data_rows) = if self.has_header {
            (raw_rows[0].clone(), &raw_rows[1..])
        } else {
            let n = raw_rows[0].len();
            (
                (0..n).map(|i| format!("col_{i}")).collect(),
                &raw_rows[..],
            )
        };
        let n_cols = headers.len();

        for (idx, row) in data_rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(EngineError::CsvParse {
                    line: idx + if self.has_header { 2 } else { 1 },
                    message: format!("expected {n_cols} fields, got {}", row.len()),
                });
            }
        }

        // Per-column inference over non-null trimmed fields
        let mut variables = Vec::with_capacity(n_cols);
        for (col, name) in headers.iter().enumerate() {
            let fields: Vec<&str> = data_rows
                .iter()
                .map(|row| row[col].trim())
                .filter(|f| !self.is_null(f))
                .collect();
            variables.push(self.infer_variable(name, &fields));
        }

        let rows: Vec<Row> = data_rows
            .iter()
            .map(|raw| {
                headers
                    .iter()
                    .zip(raw.iter())
                    .zip(variables.iter())
                    .map(|((name, field), var)| {
                        (name.clone(), self.parse_value(field, var.level))
                    })
                    .collect()
            })
            .collect();

        Dataset::new(variables, rows)
    }

    /// Reads and parses a CSV file.
    pub fn load_file(&self, path: &str) -> Result<Dataset, EngineError> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content)
    }

    // ── Internals ────────────────────────────────────────────────

    fn is_null(&self, field: &str) -> bool {
        self.null_markers.iter().any(|m| m == field)
    }

    fn infer_variable(&self, name: &str, non_null: &[&str]) -> Variable {
        if !non_null.is_empty() && non_null.iter().all(|f| f.parse::<f64>().is_ok()) {
            return Variable::new(name, MeasurementLevel::Scale);
        }
        let unique: BTreeSet<&str> = non_null.iter().copied().collect();
        let looks_like_id = non_null.len() >= ID_MIN_ROWS
            && unique.len() as f64 / non_null.len() as f64 >= ID_UNIQUE_RATIO;
        let var = Variable::new(name, MeasurementLevel::Nominal);
        if looks_like_id {
            var.role(VariableRole::Id)
        } else {
            var
        }
    }

    fn parse_value(&self, field: &str, level: MeasurementLevel) -> Value {
        let trimmed = field.trim();
        if self.is_null(trimmed) {
            return Value::Null;
        }
        if level == MeasurementLevel::Scale {
            if let Ok(n) = trimmed.parse::<f64>() {
                return Value::Number(n);
            }
        }
        Value::Text(trimmed.to_string())
    }

    /// Splits raw text into rows of fields, honoring RFC 4180 quoting.
    fn split_fields(&self, input: &str) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut row: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = input.chars().peekable();

        let mut end_row =
            |row: &mut Vec<String>, field: &mut String, rows: &mut Vec<Vec<String>>| {
                if field.ends_with('\r') {
                    field.truncate(field.len() - 1);
                }
                row.push(std::mem::take(field));
                if row.iter().any(|f| !f.is_empty()) || !rows.is_empty() {
                    rows.push(std::mem::take(row));
                } else {
                    row.clear();
                }
            };

        while let Some(c) = chars.next() {
            if in_quotes {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    field.push(c);
                }
            } else if c == '"' && field.is_empty() {
                in_quotes = true;
            } else if c == self.delimiter {
                row.push(std::mem::take(&mut field));
            } else if c == '\n' {
                end_row(&mut row, &mut field, &mut rows);
            } else if c == '\r' && chars.peek() != Some(&'\n') {
                end_row(&mut row, &mut field, &mut rows);
            } else if c != '\r' {
                field.push(c);
            }
        }
        if !field.is_empty() || !row.is_empty() {
            row.push(field);
            rows.push(row);
        }
        while rows.last().is_some_and(|r| r.iter().all(String::is_empty)) {
            rows.pop();
        }
        rows
    }
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_simple_csv() {
        let csv = "a,b\n1,x\n2,y\n";
        let ds = CsvLoader::new().load_str(csv).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.variables().len(), 2);
        assert_eq!(ds.variable("a").unwrap().level, MeasurementLevel::Scale);
        assert_eq!(ds.variable("b").unwrap().level, MeasurementLevel::Nominal);
    }

    #[test]
    fn numeric_column_yields_number_values() {
        let csv = "x\n1.5\n-2\n3e2\n";
        let ds = CsvLoader::new().load_str(csv).unwrap();
        let x = ds.variable("x").unwrap();
        assert_eq!(ds.numeric_observations(x), vec![1.5, -2.0, 300.0]);
    }

    #[test]
    fn null_markers_become_null() {
        let csv = "x\n1\nNA\n3\nnull\n";
        let ds = CsvLoader::new().load_str(csv).unwrap();
        let x = ds.variable("x").unwrap();
        assert_eq!(x.level, MeasurementLevel::Scale);
        assert_eq!(ds.missing_count(x), 2);
    }

    #[test]
    fn custom_null_markers() {
        let csv = "x\n1\n-999\n3\n";
        let ds = CsvLoader::new()
            .null_markers(["-999"])
            .load_str(csv)
            .unwrap();
        let x = ds.variable("x").unwrap();
        assert_eq!(ds.missing_count(x), 1);
    }

    #[test]
    fn quoted_fields_with_commas_and_escapes() {
        let csv = "name,desc\nAlice,\"hello, world\"\nBob,\"she said \"\"hi\"\"\"\n";
        let ds = CsvLoader::new().load_str(csv).unwrap();
        let desc = ds.variable("desc").unwrap();
        let obs = ds.category_observations(desc);
        assert_eq!(obs[0], "hello, world");
        assert_eq!(obs[1], "she said \"hi\"");
    }

    #[test]
    fn quoted_embedded_newline() {
        let csv = "name,note\nAlice,\"line1\nline2\"\nBob,simple\n";
        let ds = CsvLoader::new().load_str(csv).unwrap();
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn crlf_and_missing_trailing_newline() {
        let csv = "a,b\r\n1,2\r\n3,4";
        let ds = CsvLoader::new().load_str(csv).unwrap();
        assert_eq!(ds.row_count(), 2);
        let a = ds.variable("a").unwrap();
        assert_eq!(ds.numeric_observations(a), vec![1.0, 3.0]);
    }

    #[test]
    fn bom_stripped() {
        let csv = "\u{feff}x,y\n1,2\n";
        let ds = CsvLoader::new().load_str(csv).unwrap();
        assert!(ds.variable("x").is_some());
    }

    #[test]
    fn field_count_mismatch_is_parse_error() {
        let csv = "a,b\n1,2\n3\n";
        let err = CsvLoader::new().load_str(csv).unwrap_err();
        assert!(matches!(err, EngineError::CsvParse { line: 3, .. }));
    }

    #[test]
    fn no_header_generates_names() {
        let csv = "1,2\n3,4\n";
        let ds = CsvLoader::new().has_header(false).load_str(csv).unwrap();
        assert!(ds.variable("col_0").is_some());
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn semicolon_delimiter() {
        let csv = "a;b\n1;2\n";
        let ds = CsvLoader::new().delimiter(';').load_str(csv).unwrap();
        assert_eq!(ds.variables().len(), 2);
    }

    #[test]
    fn all_unique_text_column_tagged_as_id() {
        let mut csv = String::from("code,group\n");
        for i in 0..12 {
            csv.push_str(&format!("u{i:03},{}\n", if i % 2 == 0 { "a" } else { "b" }));
        }
        let ds = CsvLoader::new().load_str(&csv).unwrap();
        assert_eq!(ds.variable("code").unwrap().role, VariableRole::Id);
        assert_eq!(ds.variable("group").unwrap().role, VariableRole::None);
    }

    #[test]
    fn mixed_numeric_text_column_is_nominal() {
        let csv = "x\n1\n2\nthree\n4\n";
        let ds = CsvLoader::new().load_str(csv).unwrap();
        assert_eq!(
            ds.variable("x").unwrap().level,
            MeasurementLevel::Nominal
        );
    }

    #[test]
    fn empty_input_empty_dataset() {
        let ds = CsvLoader::new().load_str("").unwrap();
        assert_eq!(ds.row_count(), 0);
        assert!(ds.variables().is_empty());
    }
}
