//! Query executor trait

use aggrecon_core::{BackendKind, MetricRow};

/// Errors that can occur when running an aggregate statement
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Query returned no rows")]
    EmptyResult,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Runs SQL against one warehouse connection
///
/// Implementations open a connection per call and release it before
/// returning, whether the statement succeeded or not.
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Backend the statements are sent to
    fn backend_kind(&self) -> BackendKind;

    /// Run one statement and return its first row, or `None` if it produced no rows
    async fn execute(&self, sql: &str) -> Result<Option<MetricRow>, ExecutionError>;

    /// Run `SELECT 1`
    async fn test_connection(&self) -> Result<(), ExecutionError>;
}
