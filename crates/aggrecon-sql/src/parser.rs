//! SQL parsing using datafusion-sqlparser-rs
//!
//! Used to check generated statements before they are sent to a warehouse.

use sqlparser::ast::Statement;
use sqlparser::dialect::{BigQueryDialect, Dialect, SnowflakeDialect};
use sqlparser::parser::{Parser, ParserError};
use aggrecon_core::{BackendKind, Diagnostic, DiagnosticCode, Severity};

/// SQL parser for one backend dialect
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
}

impl SqlParser {
    /// Create a SQL parser for BigQuery
    pub fn bigquery() -> Self {
        Self {
            dialect: Box::new(BigQueryDialect {}),
        }
    }

    /// Create a SQL parser for Snowflake
    pub fn snowflake() -> Self {
        Self {
            dialect: Box::new(SnowflakeDialect {}),
        }
    }

    pub fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Snowflake => Self::snowflake(),
            BackendKind::BigQuery => Self::bigquery(),
        }
    }

    /// Parse SQL string into AST
    pub fn parse(&self, sql: &str) -> Result<ParsedSql, ParseError> {
        match Parser::parse_sql(&*self.dialect, sql) {
            Ok(statements) => Ok(ParsedSql {
                sql: sql.to_string(),
                statements,
            }),
            Err(e) => Err(ParseError {
                sql: sql.to_string(),
                error: e,
            }),
        }
    }
}

/// Successfully parsed SQL with AST
#[derive(Debug, Clone)]
pub struct ParsedSql {
    /// Original SQL string
    pub sql: String,

    /// Parsed statements
    pub statements: Vec<Statement>,
}

impl ParsedSql {
    /// Check if this is a single SELECT statement
    pub fn is_single_select(&self) -> bool {
        matches!(self.statements.as_slice(), [Statement::Query(_)])
    }

    /// Count the number of statements
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// SQL parsing error with diagnostic information
#[derive(Debug, thiserror::Error)]
#[error("SQL parse error: {error}")]
pub struct ParseError {
    /// Original SQL string
    pub sql: String,

    /// Parser error from sqlparser
    #[source]
    pub error: ParserError,
}

impl ParseError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            DiagnosticCode::InvalidQuery,
            Severity::Error,
            format!("Generated SQL failed to parse: {}", self.error),
        )
    }
}
