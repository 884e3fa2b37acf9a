//! Collaborators from configuration

use aggrecon_core::{BackendKind, CatalogConfig, WarehouseConfig};

use crate::bigquery::BigQueryExecutor;
use crate::executor::{ExecutionError, QueryExecutor};
use crate::resolver::{BackendInfoResolver, ResolutionError};
use crate::snowflake::SnowflakeExecutor;
use crate::storage_api::StorageApiResolver;

/// Executor for a `[*.warehouse]` section
pub fn executor_from_config(config: &WarehouseConfig) -> Result<Box<dyn QueryExecutor>, ExecutionError> {
    let kind = config
        .backend_kind()
        .map_err(|e| ExecutionError::ConfigError(e.to_string()))?;

    let executor: Box<dyn QueryExecutor> = match kind {
        BackendKind::Snowflake => Box::new(SnowflakeExecutor::from_config(config)?),
        BackendKind::BigQuery => Box::new(BigQueryExecutor::from_config(config)?),
    };

    tracing::debug!(backend = %kind, "warehouse executor configured");
    Ok(executor)
}

/// Resolver for a `[*.catalog]` section
pub fn resolver_from_config(config: &CatalogConfig) -> Result<Box<dyn BackendInfoResolver>, ResolutionError> {
    Ok(Box::new(StorageApiResolver::from_config(config)?))
}
