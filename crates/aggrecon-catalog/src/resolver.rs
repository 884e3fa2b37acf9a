//! Backend info resolver trait

use aggrecon_core::BackendTableInfo;
use std::fmt;

/// Logical table id in the metadata catalog, e.g. `in.c-sales.orders`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentifier {
    /// Stage (`in` / `out`)
    pub stage: String,

    /// Bucket name within the stage, e.g. `c-sales`
    pub bucket: String,

    /// Table name within the bucket
    pub table: String,
}

impl TableIdentifier {
    pub fn new(stage: impl Into<String>, bucket: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            bucket: bucket.into(),
            table: table.into(),
        }
    }

    /// Parse a `stage.bucket.table` id
    pub fn parse(id: &str) -> Result<Self, ResolutionError> {
        let mut parts = id.trim().splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(stage), Some(bucket), Some(table))
                if !stage.is_empty() && !bucket.is_empty() && !table.is_empty() =>
            {
                Ok(Self::new(stage, bucket, table))
            }
            _ => Err(ResolutionError::ConfigError(format!(
                "Invalid table id '{}': expected stage.bucket.table",
                id
            ))),
        }
    }

    /// Parse a picker display string such as `in.c-sales.orders (orders)`
    pub fn from_display(display: &str) -> Result<Self, ResolutionError> {
        let id = display.split(" (").next().unwrap_or(display);
        Self::parse(id)
    }

    /// Bucket id, e.g. `in.c-sales`
    pub fn bucket_id(&self) -> String {
        format!("{}.{}", self.stage, self.bucket)
    }

    /// Full table id
    pub fn id(&self) -> String {
        format!("{}.{}.{}", self.stage, self.bucket, self.table)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Errors that can occur when resolving table metadata
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Maps logical table ids to physical location and declared column types
#[async_trait::async_trait]
pub trait BackendInfoResolver: Send + Sync {
    /// Resolver name (e.g., "Storage API")
    fn name(&self) -> &'static str;

    /// Resolve one table. The result has passed `BackendTableInfo::validate`.
    async fn resolve(&self, table: &TableIdentifier) -> Result<BackendTableInfo, ResolutionError>;

    /// Check that the catalog is reachable and the credentials are accepted
    async fn test_connection(&self) -> Result<(), ResolutionError>;
}
