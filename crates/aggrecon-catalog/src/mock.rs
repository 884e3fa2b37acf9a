//! In-memory resolver and executor for testing
//!
//! Neither mock talks to a network. They are useful for:
//! - Unit testing the comparison pipeline
//! - Simulating per-column query failures and empty results
//! - Demos without real credentials
//!
//! ## Usage
//!
//! ```rust,ignore
//! let resolver = MockResolver::new()
//!     .with_table("in.c-sales.orders", info);
//!
//! let executor = MockExecutor::new(BackendKind::Snowflake)
//!     .with_metrics("AMOUNT", [("min", MetricValue::Int(1)), ("max", MetricValue::Int(9))])
//!     .with_failure("QTY", ExecutionError::QueryError("timeout".into()));
//! ```
//!
//! `MockExecutor` recognises which column a statement aggregates by its
//! `min_<column>` result alias, quoted the way the generator quotes it.

use aggrecon_core::{BackendKind, BackendTableInfo, MetricRow, MetricValue};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::executor::{ExecutionError, QueryExecutor};
use crate::resolver::{BackendInfoResolver, ResolutionError, TableIdentifier};

/// Mock metadata catalog
///
/// Stores table metadata by table id. Clones share state.
#[derive(Clone, Default)]
pub struct MockResolver {
    /// Predefined tables by table id
    tables: Arc<RwLock<HashMap<String, BackendTableInfo>>>,

    /// Errors to return for specific tables
    errors: Arc<RwLock<HashMap<String, ResolutionError>>>,

    /// Simulate connection failure
    fail_connection: bool,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table (builder form of `add_table`)
    pub fn with_table(self, table_id: &str, info: BackendTableInfo) -> Self {
        if let Ok(mut tables) = self.tables.try_write() {
            tables.insert(table_id.to_string(), info);
        }
        self
    }

    /// Return `error` when `table_id` is resolved
    pub fn with_error(self, table_id: &str, error: ResolutionError) -> Self {
        if let Ok(mut errors) = self.errors.try_write() {
            errors.insert(table_id.to_string(), error);
        }
        self
    }

    /// Configure to fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub async fn add_table(&self, table_id: &str, info: BackendTableInfo) {
        self.tables.write().await.insert(table_id.to_string(), info);
    }

    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }
}

#[async_trait::async_trait]
impl BackendInfoResolver for MockResolver {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn resolve(&self, table: &TableIdentifier) -> Result<BackendTableInfo, ResolutionError> {
        let id = table.id();

        if let Some(error) = self.errors.read().await.get(&id) {
            return Err(error.clone());
        }

        self.tables
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ResolutionError::TableNotFound(id))
    }

    async fn test_connection(&self) -> Result<(), ResolutionError> {
        if self.fail_connection {
            return Err(ResolutionError::NetworkError(
                "Mock connection failure (simulated)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Canned outcome of one column's statement
#[derive(Debug, Clone)]
pub enum MockResponse {
    Row(MetricRow),
    NoRows,
    Fail(ExecutionError),
}

/// Mock warehouse
///
/// Responses are keyed by column; every executed statement is recorded.
#[derive(Clone)]
pub struct MockExecutor {
    backend_kind: BackendKind,

    responses: Arc<RwLock<HashMap<String, MockResponse>>>,

    /// Statements in execution order
    executed: Arc<RwLock<Vec<String>>>,

    fail_connection: bool,
}

impl MockExecutor {
    pub fn new(backend_kind: BackendKind) -> Self {
        Self {
            backend_kind,
            responses: Arc::new(RwLock::new(HashMap::new())),
            executed: Arc::new(RwLock::new(Vec::new())),
            fail_connection: false,
        }
    }

    fn respond(self, column: &str, response: MockResponse) -> Self {
        if let Ok(mut responses) = self.responses.try_write() {
            responses.insert(column.to_string(), response);
        }
        self
    }

    /// Return `row` verbatim for the column's statement
    pub fn with_row(self, column: &str, row: MetricRow) -> Self {
        self.respond(column, MockResponse::Row(row))
    }

    /// Return a row keyed `<metric>_<column>`, the way warehouses label aliases
    pub fn with_metrics<I, V>(self, column: &str, metrics: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Into<MetricValue>,
    {
        let row = metrics
            .into_iter()
            .map(|(metric, value)| (format!("{}_{}", metric, column), value.into()))
            .collect();
        self.with_row(column, row)
    }

    /// The column's statement succeeds but produces no rows
    pub fn with_no_rows(self, column: &str) -> Self {
        self.respond(column, MockResponse::NoRows)
    }

    /// The column's statement fails with `error`
    pub fn with_failure(self, column: &str, error: ExecutionError) -> Self {
        self.respond(column, MockResponse::Fail(error))
    }

    /// Configure to fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Statements executed so far, in order
    pub async fn executed(&self) -> Vec<String> {
        self.executed.read().await.clone()
    }

    fn column_of(&self, sql: &str, column: &str) -> bool {
        let alias = format!("min_{}", column);
        let quoted = match self.backend_kind {
            BackendKind::Snowflake => format!("\"{}\"", alias),
            BackendKind::BigQuery => format!("`{}`", alias),
        };
        sql.contains(&quoted)
    }
}

#[async_trait::async_trait]
impl QueryExecutor for MockExecutor {
    fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    async fn execute(&self, sql: &str) -> Result<Option<MetricRow>, ExecutionError> {
        self.executed.write().await.push(sql.to_string());

        let responses = self.responses.read().await;
        let response = responses
            .iter()
            .find(|(column, _)| self.column_of(sql, column))
            .map(|(_, response)| response.clone());

        match response {
            Some(MockResponse::Row(row)) => Ok(Some(row)),
            Some(MockResponse::NoRows) => Ok(None),
            Some(MockResponse::Fail(error)) => Err(error),
            None => Err(ExecutionError::QueryError(format!(
                "No mock response for statement: {}",
                sql
            ))),
        }
    }

    async fn test_connection(&self) -> Result<(), ExecutionError> {
        if self.fail_connection {
            return Err(ExecutionError::QueryError(
                "Mock connection failure (simulated)".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> BackendTableInfo {
        BackendTableInfo::new("in.c-sales", "orders", BackendKind::Snowflake)
            .with_column("AMOUNT", "NUMERIC")
    }

    #[tokio::test]
    async fn test_mock_resolver_basic() {
        let resolver = MockResolver::new().with_table("in.c-sales.orders", orders());

        let table = TableIdentifier::parse("in.c-sales.orders").unwrap();
        let info = resolver.resolve(&table).await.unwrap();
        assert_eq!(info, orders());
        assert_eq!(resolver.table_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_resolver_table_not_found() {
        let resolver = MockResolver::new();
        let table = TableIdentifier::parse("in.c-sales.missing").unwrap();

        let result = resolver.resolve(&table).await;
        assert_eq!(result, Err(ResolutionError::TableNotFound("in.c-sales.missing".to_string())));
    }

    #[tokio::test]
    async fn test_mock_resolver_custom_error() {
        let resolver = MockResolver::new()
            .with_table("in.c-sales.orders", orders())
            .with_error("in.c-sales.orders", ResolutionError::PermissionDenied("nope".to_string()));

        let table = TableIdentifier::parse("in.c-sales.orders").unwrap();
        assert!(matches!(
            resolver.resolve(&table).await,
            Err(ResolutionError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_resolver_clone_shares_state() {
        let resolver = MockResolver::new();
        let clone = resolver.clone();
        clone.add_table("in.c-sales.orders", orders()).await;
        assert_eq!(resolver.table_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_connection_failures() {
        assert!(MockResolver::new().test_connection().await.is_ok());
        assert!(MockResolver::new().with_connection_failure().test_connection().await.is_err());

        let executor = MockExecutor::new(BackendKind::BigQuery);
        assert!(executor.test_connection().await.is_ok());
        assert!(executor.with_connection_failure().test_connection().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_executor_matches_column_alias() {
        let executor = MockExecutor::new(BackendKind::Snowflake)
            .with_metrics("A", [("min", 1i64), ("max", 2i64)])
            .with_metrics("AB", [("min", 10i64)]);

        let row = executor
            .execute("SELECT MIN(\"AB\") AS \"min_AB\" FROM t;")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get("min_AB"), Some(&MetricValue::Int(10)));

        let row = executor
            .execute("SELECT MIN(\"A\") AS \"min_A\", MAX(\"A\") AS \"max_A\" FROM t;")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.len(), 2);

        assert_eq!(executor.executed().await.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_executor_failures_and_empty() {
        let executor = MockExecutor::new(BackendKind::BigQuery)
            .with_no_rows("a")
            .with_failure("b", ExecutionError::QueryError("boom".to_string()));

        assert_eq!(executor.execute("SELECT 1 AS `min_a`").await, Ok(None));
        assert_eq!(
            executor.execute("SELECT 1 AS `min_b`").await,
            Err(ExecutionError::QueryError("boom".to_string()))
        );
        assert!(executor.execute("SELECT 1 AS `min_c`").await.is_err());
    }
}
