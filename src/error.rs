//! Error types for autostat.

use std::fmt;

/// Contract errors produced by the engine.
///
/// These indicate programmer error (a malformed dataset or a reference to a
/// variable that does not exist) and are allowed to propagate. Expected
/// infeasibility — wrong variable types, too few complete cases — is never
/// an error; it becomes a not-applicable [`TestResult`](crate::output::TestResult).
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A selected variable name does not exist in the dataset.
    UnknownVariable { name: String },
    /// Two variables in the dataset share the same name.
    DuplicateVariable { name: String },
    /// CSV parsing failed.
    CsvParse { line: usize, message: String },
    /// I/O error during file reading.
    Io(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVariable { name } => {
                write!(f, "variable '{name}' not found in dataset")
            }
            Self::DuplicateVariable { name } => {
                write!(f, "duplicate variable name '{name}'")
            }
            Self::CsvParse { line, message } => {
                write!(f, "CSV parse error at line {line}: {message}")
            }
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_variable() {
        let e = EngineError::UnknownVariable {
            name: "age".into(),
        };
        assert_eq!(e.to_string(), "variable 'age' not found in dataset");
    }

    #[test]
    fn display_csv_parse() {
        let e = EngineError::CsvParse {
            line: 3,
            message: "expected 4 fields, got 2".into(),
        };
        assert!(e.to_string().contains("line 3"));
    }

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: EngineError = io.into();
        assert!(matches!(e, EngineError::Io(_)));
    }
}
