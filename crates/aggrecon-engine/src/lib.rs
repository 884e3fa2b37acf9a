//! aggrecon engine - comparison logic
//!
//! This crate implements:
//! - Result normalization (metric key parsing, rounding, whole-number collapse)
//! - Per-column comparison with numeric tolerance
//! - The `ComparisonRun` pipeline: resolve, generate, execute, compare

pub mod normalize;
pub mod compare;
pub mod run;

pub use normalize::{canonical_metric_key, collapse_whole, normalize, normalize_column, ResultNormalizer};
pub use compare::{compare, values_match, ComparisonOutcome, NUMERIC_TOLERANCE};
pub use run::{ComparisonRun, RunError, RunSide, SideState};
