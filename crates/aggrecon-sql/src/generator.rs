//! Aggregate query generation
//!
//! One statement per numeric column computing MIN, MAX, AVG, SUM and COUNT.
//! Columns whose declared type was unknown are always wrapped in a safe cast,
//! since their stored representation is not guaranteed to be numeric.

use std::collections::BTreeMap;

use aggrecon_core::{BackendKind, BackendTableInfo, Diagnostic, DiagnosticCode, Metric, Severity, Side};

use crate::dialect::BackendDialect;
use crate::inference::{DeclaredTypeSnapshot, TypeInferenceEngine};
use crate::parser::SqlParser;

/// Generated statement for one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    pub column: String,
    pub sql: String,
    pub original_type: String,
    pub effective_type: String,
    /// The column expression is wrapped in a safe cast
    pub cast_applied: bool,
}

/// Column → statement, for one side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuerySet {
    backend_kind: BackendKind,
    queries: Vec<AggregateQuery>,
}

impl AggregateQuerySet {
    pub fn new(backend_kind: BackendKind) -> Self {
        Self {
            backend_kind,
            queries: Vec::new(),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    pub fn push(&mut self, query: AggregateQuery) {
        self.queries.push(query);
    }

    pub fn get(&self, column: &str) -> Option<&AggregateQuery> {
        self.queries.iter().find(|q| q.column == column)
    }

    pub fn sql(&self, column: &str) -> Option<&str> {
        self.get(column).map(|q| q.sql.as_str())
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Queries in table column order
    pub fn iter(&self) -> impl Iterator<Item = &AggregateQuery> {
        self.queries.iter()
    }

    pub fn columns(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.column.as_str()).collect()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.queries
            .iter()
            .map(|q| (q.column.clone(), q.sql.clone()))
            .collect()
    }

    /// Parse every statement in the backend's dialect
    ///
    /// Returns one `INVALID_QUERY` diagnostic per statement that fails to parse.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let parser = SqlParser::for_backend(self.backend_kind);

        self.queries
            .iter()
            .filter_map(|query| {
                parser
                    .parse(&query.sql)
                    .err()
                    .map(|e| e.to_diagnostic().with_column(query.column.clone()))
            })
            .collect()
    }
}

/// Output of generation for one side
#[derive(Debug, Clone, PartialEq)]
pub struct QueryGeneration {
    pub queries: AggregateQuerySet,

    /// Type inference notes, one per inferred column
    pub notifications: Vec<Diagnostic>,

    /// Generation-level warnings (missing identifiers, nothing to query)
    pub advisories: Vec<Diagnostic>,
}

/// Builds aggregate statements for one backend
#[derive(Debug, Clone)]
pub struct AggregateQueryGenerator {
    dialect: BackendDialect,
    database_identifier: String,
    attempt_cast: bool,
}

impl AggregateQueryGenerator {
    pub fn new(backend_kind: BackendKind, database_identifier: impl Into<String>) -> Self {
        Self {
            dialect: BackendDialect::for_backend(backend_kind),
            database_identifier: database_identifier.into(),
            attempt_cast: false,
        }
    }

    /// Cast every column, not only those with unknown declared type
    pub fn with_attempt_cast(mut self, attempt_cast: bool) -> Self {
        self.attempt_cast = attempt_cast;
        self
    }

    /// Generate statements for every numeric column of `info`
    pub fn generate(
        &self,
        side: Side,
        info: &BackendTableInfo,
        counterpart: Option<&DeclaredTypeSnapshot>,
    ) -> QueryGeneration {
        let backend_kind = self.dialect.kind();
        let mut queries = AggregateQuerySet::new(backend_kind);
        let mut advisories = Vec::new();

        if self.database_identifier.trim().is_empty()
            || info.schema.trim().is_empty()
            || info.table.trim().is_empty()
        {
            tracing::warn!(%side, "missing table identifiers, no queries generated");
            advisories.push(
                Diagnostic::new(
                    DiagnosticCode::MissingTableIdentifiers,
                    Severity::Warn,
                    format!(
                        "Missing required table identifiers for {} table (database '{}', schema '{}', table '{}')",
                        side, self.database_identifier, info.schema, info.table
                    ),
                )
                .with_side(side),
            );
            return QueryGeneration {
                queries,
                notifications: Vec::new(),
                advisories,
            };
        }

        let table_ref = self
            .dialect
            .qualified_table(&self.database_identifier, &info.schema, &info.table);
        let mut inference = TypeInferenceEngine::new(side, counterpart);

        for resolution in inference.resolve_table(info) {
            if !resolution.is_numeric() {
                continue;
            }

            let cast_applied = self.attempt_cast || resolution.was_unknown();
            let sql = self.build_statement(&resolution.column, &table_ref, cast_applied);
            tracing::debug!(%side, backend = %backend_kind, column = %resolution.column, cast_applied, "generated aggregate query");

            queries.push(AggregateQuery {
                column: resolution.column,
                sql,
                original_type: resolution.original_type,
                effective_type: resolution.effective_type,
                cast_applied,
            });
        }

        if queries.is_empty() {
            advisories.push(
                Diagnostic::new(
                    DiagnosticCode::NoNumericColumns,
                    Severity::Warn,
                    format!("No numeric columns found in {} table {}", side, info.qualified_name()),
                )
                .with_side(side),
            );
        }

        QueryGeneration {
            queries,
            notifications: inference.into_notes(),
            advisories,
        }
    }

    fn build_statement(&self, column: &str, table_ref: &str, cast: bool) -> String {
        let quoted = self.dialect.quote_identifier(column);
        let expr = if cast { self.dialect.safe_cast(&quoted) } else { quoted };

        let projections: Vec<String> = Metric::ALL
            .iter()
            .map(|metric| {
                format!(
                    "{}({}) AS {}",
                    metric.sql_function(),
                    expr,
                    self.dialect.quote_identifier(&metric.alias(column))
                )
            })
            .collect();

        format!("SELECT {} FROM {};", projections.join(", "), table_ref)
    }
}

/// Generate the aggregate statements for one side
pub fn generate_queries(
    side: Side,
    backend_kind: BackendKind,
    database_identifier: &str,
    info: &BackendTableInfo,
    attempt_cast: bool,
    counterpart: Option<&DeclaredTypeSnapshot>,
) -> QueryGeneration {
    AggregateQueryGenerator::new(backend_kind, database_identifier)
        .with_attempt_cast(attempt_cast)
        .generate(side, info, counterpart)
}
