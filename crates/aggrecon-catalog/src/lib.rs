//! Metadata catalog and warehouse access
//!
//! Two collaborators feed a comparison run:
//! - a [`BackendInfoResolver`] maps a logical table id to its physical location
//!   and declared column types (the Keboola Storage API in production)
//! - a [`QueryExecutor`] runs one aggregate statement against a warehouse and
//!   returns its single result row
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `bigquery` - Google BigQuery support
//! - `snowflake` - Snowflake support
//! - `all-warehouses` - All warehouse executors
//!
//! ## Example
//!
//! ```rust,ignore
//! use aggrecon_catalog::{StorageApiResolver, BackendInfoResolver, TableIdentifier};
//!
//! let resolver = StorageApiResolver::new("https://connection.keboola.com", token)?;
//! let info = resolver.resolve(&TableIdentifier::parse("in.c-sales.orders")?).await?;
//! ```

pub mod resolver;
pub mod executor;
pub mod storage_api;
pub mod bigquery;
pub mod snowflake;
pub mod mock;
pub mod connect;

pub use resolver::{BackendInfoResolver, ResolutionError, TableIdentifier};
pub use executor::{ExecutionError, QueryExecutor};
pub use storage_api::{parse_table_detail, StorageApiResolver};
pub use bigquery::{BigQueryCredentials, BigQueryExecutor};
pub use snowflake::{SnowflakeExecutor, SnowflakeExecutorBuilder};
pub use mock::{MockExecutor, MockResolver};
pub use connect::{executor_from_config, resolver_from_config};
