//! Aggregate metrics and per-column comparison verdicts

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::value::MetricValue;

/// Aggregate statistics computed per column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Min,
    Max,
    Avg,
    Sum,
    Count,
}

impl Metric {
    /// All metrics in query order
    pub const ALL: [Metric; 5] = [Metric::Min, Metric::Max, Metric::Avg, Metric::Sum, Metric::Count];

    /// Canonical (lower-case) metric name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Count => "count",
        }
    }

    /// SQL aggregate function name
    pub fn sql_function(&self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
            Self::Sum => "SUM",
            Self::Count => "COUNT",
        }
    }

    /// Result alias for this metric over `column`, e.g. `min_AMOUNT`
    pub fn alias(&self, column: &str) -> String {
        format!("{}_{}", self.as_str(), column)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metric name → value. Raw rows are keyed by result alias, normalized rows
/// by canonical metric name.
pub type MetricRow = BTreeMap<String, MetricValue>;

/// Per-column outcome of an aggregate query
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnAggregates {
    Metrics(MetricRow),
    /// The query failed or returned nothing; serialized as `{"error": ...}`
    Error(String),
}

impl ColumnAggregates {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn metrics(&self) -> Option<&MetricRow> {
        match self {
            Self::Metrics(row) => Some(row),
            Self::Error(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            Self::Metrics(_) => None,
        }
    }

    /// Value of one metric; `None` if absent or an error marker
    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.metrics().and_then(|row| row.get(key))
    }
}

impl Serialize for ColumnAggregates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Metrics(row) => row.serialize(serializer),
            Self::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}

/// Column name → aggregates, for one side of a run
pub type AggregateResults = BTreeMap<String, ColumnAggregates>;

/// Verdict for one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnStatus {
    Match,
    Mismatch,
    Error,
}

impl std::fmt::Display for ColumnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "MATCH"),
            Self::Mismatch => write!(f, "MISMATCH"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Comparison of one column present on both sides
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnComparisonResult {
    pub column_name: String,

    pub origin_declared_type: String,

    pub target_declared_type: String,

    /// Normalized origin metrics; absent for `ERROR` verdicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_metrics: Option<MetricRow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_metrics: Option<MetricRow>,

    /// Whether each metric matched; empty for `ERROR` verdicts
    pub per_metric_match: BTreeMap<Metric, bool>,

    pub overall_status: ColumnStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ColumnComparisonResult {
    /// An `ERROR` verdict: no metrics, no per-metric matches
    pub fn errored(
        column_name: impl Into<String>,
        origin_declared_type: impl Into<String>,
        target_declared_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            origin_declared_type: origin_declared_type.into(),
            target_declared_type: target_declared_type.into(),
            origin_metrics: None,
            target_metrics: None,
            per_metric_match: BTreeMap::new(),
            overall_status: ColumnStatus::Error,
            error: Some(error.into()),
        }
    }

    pub fn is_match(&self) -> bool {
        self.overall_status == ColumnStatus::Match
    }

    pub fn metric_matches(&self, metric: Metric) -> Option<bool> {
        self.per_metric_match.get(&metric).copied()
    }

    /// Metrics that did not match, in query order
    pub fn mismatched_metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.metric_matches(*m) == Some(false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_aliases() {
        assert_eq!(Metric::Min.alias("AMOUNT"), "min_AMOUNT");
        assert_eq!(Metric::Count.sql_function(), "COUNT");
        assert_eq!(Metric::ALL.len(), 5);
    }

    #[test]
    fn error_marker_serializes_as_object() {
        let agg = ColumnAggregates::error("Failed to fetch aggregates for QTY");
        let json = serde_json::to_string(&agg).unwrap();
        assert_eq!(json, r#"{"error":"Failed to fetch aggregates for QTY"}"#);
    }

    #[test]
    fn metrics_serialize_as_flat_map() {
        let mut row = MetricRow::new();
        row.insert("min_QTY".to_string(), MetricValue::Int(1));
        row.insert("avg_QTY".to_string(), MetricValue::Null);
        let json = serde_json::to_string(&ColumnAggregates::Metrics(row)).unwrap();
        assert_eq!(json, r#"{"avg_QTY":null,"min_QTY":1}"#);
    }

    #[test]
    fn errored_result_has_no_metric_fields() {
        let result = ColumnComparisonResult::errored("QTY", "INTEGER", "INTEGER", "boom");
        assert_eq!(result.overall_status, ColumnStatus::Error);
        assert!(result.per_metric_match.is_empty());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("origin_metrics").is_none());
        assert!(json.get("target_metrics").is_none());
        assert_eq!(json["overall_status"], "ERROR");
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn mismatched_metrics_in_query_order() {
        let mut result = ColumnComparisonResult::errored("A", "INT", "INT", "");
        result.error = None;
        result.overall_status = ColumnStatus::Mismatch;
        for metric in Metric::ALL {
            result.per_metric_match.insert(metric, true);
        }
        result.per_metric_match.insert(Metric::Sum, false);
        result.per_metric_match.insert(Metric::Max, false);

        assert_eq!(result.mismatched_metrics(), vec![Metric::Max, Metric::Sum]);
        assert!(!result.is_match());
    }
}
