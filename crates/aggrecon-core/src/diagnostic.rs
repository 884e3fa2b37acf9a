//! Diagnostic codes and run notifications
//!
//! Codes are written into report.json as `SCREAMING_SNAKE_CASE` strings and
//! consumers match on them, so existing names stay fixed.

use serde::{Deserialize, Serialize};

use crate::table::Side;

/// Notification codes (report v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Type inference
    /// A column's unknown type was taken from the other side
    TypeInferred,

    // Query generation
    /// Table has no numeric (declared or inferred) columns
    NoNumericColumns,

    /// Schema, table or database identifier is missing
    MissingTableIdentifiers,

    /// Generated SQL failed to parse in the backend dialect
    InvalidQuery,

    /// Catalog backend differs from the configured warehouse
    BackendMismatch,

    // Execution
    /// Aggregate query for a column failed or returned no row
    AggregateFetchFailed,

    // Comparison
    /// One side produced no aggregate results at all
    ResultsMissing,

    /// Both sides have results but share no column
    NoCommonColumns,

    /// Column metrics differ between origin and target
    ColumnMismatch,

    /// Column could not be compared because a query failed
    ColumnError,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeInferred => "TYPE_INFERRED",
            Self::NoNumericColumns => "NO_NUMERIC_COLUMNS",
            Self::MissingTableIdentifiers => "MISSING_TABLE_IDENTIFIERS",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::BackendMismatch => "BACKEND_MISMATCH",
            Self::AggregateFetchFailed => "AGGREGATE_FETCH_FAILED",
            Self::ResultsMissing => "RESULTS_MISSING",
            Self::NoCommonColumns => "NO_COMMON_COLUMNS",
            Self::ColumnMismatch => "COLUMN_MISMATCH",
            Self::ColumnError => "COLUMN_ERROR",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but does not stop the run
    Warn,

    /// Error - a column could not be reconciled
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A notification with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Side the notification concerns, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,

    /// Column the notification concerns, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Expected value (for comparison diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Actual value (for comparison diagnostics, or the inferred type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            side: None,
            column: None,
            expected: None,
            actual: None,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        assert_eq!(DiagnosticCode::TypeInferred.as_str(), "TYPE_INFERRED");
        assert_eq!(DiagnosticCode::AggregateFetchFailed.as_str(), "AGGREGATE_FETCH_FAILED");

        let json = serde_json::to_string(&DiagnosticCode::NoCommonColumns).unwrap();
        assert_eq!(json, "\"NO_COMMON_COLUMNS\"");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::TypeInferred,
            Severity::Info,
            "Column 'QTY' type inferred from other side",
        )
        .with_side(Side::Origin)
        .with_column("QTY")
        .with_comparison("UNKNOWN", "INTEGER");

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "TYPE_INFERRED");
        assert_eq!(json["severity"], "info");
        assert_eq!(json["side"], "origin");
        assert_eq!(json["column"], "QTY");
        assert_eq!(json["expected"], "UNKNOWN");
        assert_eq!(json["actual"], "INTEGER");
    }

    #[test]
    fn display_includes_code() {
        let diag = Diagnostic::new(DiagnosticCode::NoCommonColumns, Severity::Warn, "careful");
        assert_eq!(diag.to_string(), "[NO_COMMON_COLUMNS] careful");
    }
}
