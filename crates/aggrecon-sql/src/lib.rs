//! SQL generation and validation
//!
//! This crate handles:
//! - Resolving effective column types, borrowing from the other side when unknown
//! - Generating per-column MIN/MAX/AVG/SUM/COUNT statements for each backend
//! - Quoting and safe casts per backend dialect
//! - Validating generated SQL with datafusion-sqlparser-rs

pub mod dialect;
pub mod inference;
pub mod generator;
pub mod parser;

pub use dialect::BackendDialect;
pub use inference::{infer_effective_type, DeclaredTypeSnapshot, TypeInferenceEngine, TypeResolution};
pub use generator::{generate_queries, AggregateQuery, AggregateQueryGenerator, AggregateQuerySet, QueryGeneration};
pub use parser::{SqlParser, ParsedSql, ParseError};
