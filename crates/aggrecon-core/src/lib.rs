//! aggrecon core
//!
//! Core domain model shared by every stage of a comparison run.
//! Never rename diagnostic codes or serialized field names - they are part of
//! the report format.

pub mod table;
pub mod value;
pub mod comparison;
pub mod diagnostic;
pub mod report;
pub mod config;

pub use table::{BackendKind, BackendTableInfo, Side, TableInfoError, NUMERIC_TYPES, UNKNOWN_TYPE, is_numeric_type, is_unknown_type};
pub use value::MetricValue;
pub use comparison::{AggregateResults, ColumnAggregates, ColumnComparisonResult, ColumnStatus, Metric, MetricRow};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use report::{Report, ReportSummary, ReportVersion, SideReport};
pub use config::{CatalogConfig, ComparisonOptions, Config, ConfigError, SideConfig, WarehouseConfig};
