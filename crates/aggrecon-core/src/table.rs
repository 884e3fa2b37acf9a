//! Backend table metadata
//!
//! A `BackendTableInfo` is produced once per side by the metadata catalog and
//! is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared type recorded when the catalog carries no base type for a column
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

/// Declared types eligible for aggregate generation (upper-case)
pub const NUMERIC_TYPES: &[&str] = &[
    "INTEGER",
    "NUMERIC",
    "DECIMAL",
    "FLOAT",
    "REAL",
    "DOUBLE PRECISION",
    "BIGINT",
    "SMALLINT",
    "INT",
    "NUMBER",
];

/// Check whether a declared type is numeric. Comparison is case-insensitive.
pub fn is_numeric_type(declared: &str) -> bool {
    let upper = declared.trim().to_uppercase();
    NUMERIC_TYPES.contains(&upper.as_str())
}

/// Check whether a declared type is the `UNKNOWN` placeholder
pub fn is_unknown_type(declared: &str) -> bool {
    declared.trim().eq_ignore_ascii_case(UNKNOWN_TYPE)
}

/// Relational engine hosting a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Snowflake,
    BigQuery,
}

impl BackendKind {
    /// Lower-case name as used in configuration files and catalog payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snowflake => "snowflake",
            Self::BigQuery => "bigquery",
        }
    }

    /// Parse a backend name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "snowflake" => Some(Self::Snowflake),
            "bigquery" => Some(Self::BigQuery),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snowflake => write!(f, "Snowflake"),
            Self::BigQuery => write!(f, "BigQuery"),
        }
    }
}

/// Which of the two compared tables something belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Origin,
    Target,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Origin, Side::Target];
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Origin => write!(f, "origin"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Resolved physical location and column metadata of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTableInfo {
    /// Schema (Snowflake) or dataset (BigQuery) holding the table
    pub schema: String,

    /// Physical table name
    pub table: String,

    /// Column names in catalog order, unique
    pub columns: Vec<String>,

    /// Declared type per column. Columns without an entry are `UNKNOWN`.
    pub column_declared_type: BTreeMap<String, String>,

    /// Backend hosting the table
    pub backend_kind: BackendKind,
}

impl BackendTableInfo {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, backend_kind: BackendKind) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns: Vec::new(),
            column_declared_type: BTreeMap::new(),
            backend_kind,
        }
    }

    /// Add a column with its declared type. Re-adding a column only updates its type.
    pub fn with_column(mut self, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let name = name.into();
        if !self.columns.contains(&name) {
            self.columns.push(name.clone());
        }
        self.column_declared_type.insert(name, declared_type.into());
        self
    }

    /// Declared type of a column, `UNKNOWN` when the catalog had none
    pub fn declared_type(&self, column: &str) -> &str {
        self.column_declared_type
            .get(column)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TYPE)
    }

    /// `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Check structural validity of resolved metadata
    pub fn validate(&self) -> Result<(), TableInfoError> {
        if self.schema.trim().is_empty() {
            return Err(TableInfoError::EmptySchema);
        }
        if self.table.trim().is_empty() {
            return Err(TableInfoError::EmptyTable);
        }

        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if column.is_empty() {
                return Err(TableInfoError::EmptyColumnName);
            }
            if !seen.insert(column.as_str()) {
                return Err(TableInfoError::DuplicateColumn(column.clone()));
            }
        }

        Ok(())
    }
}

/// Structural problems in resolved table metadata
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableInfoError {
    #[error("schema name is empty")]
    EmptySchema,

    #[error("table name is empty")]
    EmptyTable,

    #[error("column name is empty")]
    EmptyColumnName,

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
}
