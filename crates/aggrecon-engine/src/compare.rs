//! Column comparison
//!
//! Only columns with results on both sides are compared. A column whose query
//! failed on either side is reported as `ERROR` without metric comparison.
//! Otherwise each of the five metrics is compared:
//! - both null → match
//! - one null → mismatch
//! - both numeric → match when `|origin - target| < NUMERIC_TOLERANCE`
//! - otherwise → textual equality
//!
//! The tolerance is absolute, whatever the magnitude of the values. When
//! either side is an exact decimal the difference is computed exactly.

use std::collections::BTreeMap;

use aggrecon_core::{
    AggregateResults, BackendTableInfo, ColumnAggregates, ColumnComparisonResult, ColumnStatus,
    Diagnostic, DiagnosticCode, Metric, MetricRow, MetricValue, Severity,
};
use rust_decimal::Decimal;

/// Largest absolute difference still considered equal
pub const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Compare one metric; a missing value counts as null
pub fn values_match(origin: Option<&MetricValue>, target: Option<&MetricValue>) -> bool {
    let origin = origin.filter(|v| !v.is_null());
    let target = target.filter(|v| !v.is_null());

    match (origin, target) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(o), Some(t)) => {
            if let Some(matched) = exact_match(o, t) {
                return matched;
            }
            match (o.as_f64(), t.as_f64()) {
                (Some(a), Some(b)) => (a - b).abs() < NUMERIC_TOLERANCE,
                _ => o.to_string() == t.to_string(),
            }
        }
    }
}

/// Exact verdict when a decimal is involved and both sides have an exact view
fn exact_match(origin: &MetricValue, target: &MetricValue) -> Option<bool> {
    if !origin.is_decimal() && !target.is_decimal() {
        return None;
    }
    let diff = origin.as_decimal()?.checked_sub(target.as_decimal()?)?;
    Some(diff.abs() < Decimal::new(1, 9))
}

/// Verdicts plus comparison-level notifications
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcome {
    pub results: Vec<ColumnComparisonResult>,
    pub advisories: Vec<Diagnostic>,
}

impl ComparisonOutcome {
    pub fn all_match(&self) -> bool {
        self.results.iter().all(ColumnComparisonResult::is_match)
    }

    pub fn count(&self, status: ColumnStatus) -> usize {
        self.results.iter().filter(|r| r.overall_status == status).count()
    }

    /// One diagnostic per column that did not match
    pub fn verdict_diagnostics(&self) -> Vec<Diagnostic> {
        self.results
            .iter()
            .filter_map(|result| match result.overall_status {
                ColumnStatus::Match => None,
                ColumnStatus::Error => Some(
                    Diagnostic::new(
                        DiagnosticCode::ColumnError,
                        Severity::Error,
                        format!(
                            "Column '{}' could not be compared: {}",
                            result.column_name,
                            result.error.as_deref().unwrap_or("unknown error")
                        ),
                    )
                    .with_column(result.column_name.clone()),
                ),
                ColumnStatus::Mismatch => {
                    let metrics: Vec<&str> = result.mismatched_metrics().iter().map(Metric::as_str).collect();
                    let (expected, actual) = mismatch_values(result);
                    Some(
                        Diagnostic::new(
                            DiagnosticCode::ColumnMismatch,
                            Severity::Error,
                            format!(
                                "Column '{}' differs in {}",
                                result.column_name,
                                metrics.join(", ")
                            ),
                        )
                        .with_column(result.column_name.clone())
                        .with_comparison(expected, actual),
                    )
                }
            })
            .collect()
    }
}

fn mismatch_values(result: &ColumnComparisonResult) -> (String, String) {
    let render = |row: Option<&MetricRow>| {
        result
            .mismatched_metrics()
            .iter()
            .map(|metric| {
                let value = row
                    .and_then(|r| r.get(metric.as_str()))
                    .map(MetricValue::to_string)
                    .unwrap_or_else(|| "null".to_string());
                format!("{}={}", metric, value)
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    (render(result.origin_metrics.as_ref()), render(result.target_metrics.as_ref()))
}

/// Compare normalized metrics of both sides
pub fn compare(
    origin: &AggregateResults,
    target: &AggregateResults,
    origin_info: &BackendTableInfo,
    target_info: &BackendTableInfo,
) -> ComparisonOutcome {
    let mut advisories = Vec::new();

    let common: Vec<&String> = origin.keys().filter(|c| target.contains_key(*c)).collect();
    if common.is_empty() && !origin.is_empty() && !target.is_empty() {
        advisories.push(Diagnostic::new(
            DiagnosticCode::NoCommonColumns,
            Severity::Warn,
            "No common columns with aggregate results on both sides",
        ));
    }

    let results = common
        .into_iter()
        .filter_map(|column| {
            let o = origin.get(column)?;
            let t = target.get(column)?;
            Some(compare_column(
                column,
                o,
                t,
                origin_info.declared_type(column),
                target_info.declared_type(column),
            ))
        })
        .collect();

    ComparisonOutcome { results, advisories }
}

fn compare_column(
    column: &str,
    origin: &ColumnAggregates,
    target: &ColumnAggregates,
    origin_type: &str,
    target_type: &str,
) -> ColumnComparisonResult {
    let (origin_row, target_row) = match (origin, target) {
        (ColumnAggregates::Metrics(o), ColumnAggregates::Metrics(t)) => (o, t),
        _ => {
            let message = match (origin.error_message(), target.error_message()) {
                (Some(o), Some(t)) => format!("origin: {}; target: {}", o, t),
                (Some(o), None) => o.to_string(),
                (None, Some(t)) => t.to_string(),
                (None, None) => String::new(),
            };
            return ColumnComparisonResult::errored(column, origin_type, target_type, message);
        }
    };

    let per_metric_match: BTreeMap<Metric, bool> = Metric::ALL
        .iter()
        .map(|metric| {
            let matched = values_match(origin_row.get(metric.as_str()), target_row.get(metric.as_str()));
            (*metric, matched)
        })
        .collect();

    let overall_status = if per_metric_match.values().all(|m| *m) {
        ColumnStatus::Match
    } else {
        ColumnStatus::Mismatch
    };

    ColumnComparisonResult {
        column_name: column.to_string(),
        origin_declared_type: origin_type.to_string(),
        target_declared_type: target_type.to_string(),
        origin_metrics: Some(origin_row.clone()),
        target_metrics: Some(target_row.clone()),
        per_metric_match,
        overall_status,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggrecon_core::BackendKind;
    use pretty_assertions::assert_eq;

    fn row(values: [(&str, MetricValue); 5]) -> ColumnAggregates {
        ColumnAggregates::Metrics(values.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn amount(max: f64) -> ColumnAggregates {
        row([
            ("min", MetricValue::Int(1)),
            ("max", MetricValue::Float(max)),
            ("avg", MetricValue::Float(50.5)),
            ("sum", MetricValue::Int(5050)),
            ("count", MetricValue::Int(100)),
        ])
    }

    fn info(kind: BackendKind) -> BackendTableInfo {
        BackendTableInfo::new("s", "t", kind)
            .with_column("AMOUNT", "NUMERIC")
            .with_column("QTY", "INTEGER")
    }

    fn results(columns: Vec<(&str, ColumnAggregates)>) -> AggregateResults {
        columns.into_iter().map(|(c, a)| (c.to_string(), a)).collect()
    }

    #[test]
    fn tolerance() {
        let a = MetricValue::Float(1.0);
        assert!(values_match(Some(&a), Some(&MetricValue::Float(1.0 + 5e-10))));
        assert!(!values_match(Some(&a), Some(&MetricValue::Float(1.0 + 1e-6))));
        assert!(values_match(Some(&MetricValue::Int(5)), Some(&MetricValue::Decimal("5.000".into()))));
    }

    #[test]
    fn large_decimals_compare_exactly() {
        let a = MetricValue::Decimal("12345678901234567.89".into());
        let b = MetricValue::Decimal("12345678901234567.80".into());
        assert!(!values_match(Some(&a), Some(&b)));
        assert!(values_match(Some(&a), Some(&MetricValue::Decimal("12345678901234567.8900".into()))));
        assert!(!values_match(Some(&a), Some(&MetricValue::Int(12345678901234568))));
        assert!(values_match(
            Some(&MetricValue::Decimal("0.1000000000".into())),
            Some(&MetricValue::Decimal("0.1000000005".into()))
        ));
        assert!(!values_match(
            Some(&MetricValue::Decimal("0.100000000".into())),
            Some(&MetricValue::Decimal("0.100000001".into()))
        ));
        assert!(values_match(Some(&MetricValue::Float(50.5)), Some(&MetricValue::Decimal("50.500".into()))));

        let normalized_a = crate::normalize::normalize_value(&a, None);
        let normalized_b = crate::normalize::normalize_value(&b, None);
        assert!(!values_match(Some(&normalized_a), Some(&normalized_b)));
    }

    #[test]
    fn null_handling() {
        assert!(values_match(None, Some(&MetricValue::Null)));
        assert!(values_match(Some(&MetricValue::Null), Some(&MetricValue::Null)));
        assert!(!values_match(Some(&MetricValue::Null), Some(&MetricValue::Int(0))));
        assert!(!values_match(Some(&MetricValue::Int(0)), None));
    }

    #[test]
    fn non_numeric_compares_as_text() {
        assert!(values_match(Some(&MetricValue::Text("a".into())), Some(&MetricValue::Text("a".into()))));
        assert!(values_match(Some(&MetricValue::Text("5".into())), Some(&MetricValue::Int(5))));
        assert!(!values_match(Some(&MetricValue::Text("a".into())), Some(&MetricValue::Int(5))));
    }

    #[test]
    fn single_metric_mismatch() {
        let origin = results(vec![("AMOUNT", amount(99.999999999))]);
        let target = results(vec![("AMOUNT", amount(100.0))]);

        let outcome = compare(&origin, &target, &info(BackendKind::Snowflake), &info(BackendKind::BigQuery));
        assert_eq!(outcome.results.len(), 1);

        let result = &outcome.results[0];
        assert_eq!(result.overall_status, ColumnStatus::Mismatch);
        assert_eq!(result.mismatched_metrics(), vec![Metric::Max]);
        assert_eq!(result.metric_matches(Metric::Min), Some(true));
        assert_eq!(result.origin_declared_type, "NUMERIC");

        let diagnostics = outcome.verdict_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ColumnMismatch);
        assert_eq!(diagnostics[0].expected.as_deref(), Some("max=99.999999999"));
        assert_eq!(diagnostics[0].actual.as_deref(), Some("max=100"));
    }

    #[test]
    fn identical_metrics_match() {
        let origin = results(vec![("AMOUNT", amount(99.0))]);
        let outcome = compare(&origin, &origin.clone(), &info(BackendKind::Snowflake), &info(BackendKind::Snowflake));

        assert!(outcome.all_match());
        assert_eq!(outcome.count(ColumnStatus::Match), 1);
        assert!(outcome.verdict_diagnostics().is_empty());
    }

    #[test]
    fn error_marker_yields_error_without_metrics() {
        let origin = results(vec![("QTY", ColumnAggregates::error("Failed to fetch aggregates for QTY"))]);
        let target = results(vec![("QTY", amount(1.0))]);

        let outcome = compare(&origin, &target, &info(BackendKind::Snowflake), &info(BackendKind::Snowflake));
        let result = &outcome.results[0];

        assert_eq!(result.overall_status, ColumnStatus::Error);
        assert_eq!(result.error.as_deref(), Some("Failed to fetch aggregates for QTY"));
        assert!(result.origin_metrics.is_none());
        assert!(result.target_metrics.is_none());
        assert!(result.per_metric_match.is_empty());
        assert_eq!(outcome.verdict_diagnostics()[0].code, DiagnosticCode::ColumnError);
    }

    #[test]
    fn one_sided_columns_are_omitted() {
        let origin = results(vec![("AMOUNT", amount(1.0)), ("QTY", amount(1.0))]);
        let target = results(vec![("AMOUNT", amount(1.0)), ("EXTRA", amount(1.0))]);

        let outcome = compare(&origin, &target, &info(BackendKind::Snowflake), &info(BackendKind::Snowflake));
        let columns: Vec<&str> = outcome.results.iter().map(|r| r.column_name.as_str()).collect();
        assert_eq!(columns, vec!["AMOUNT"]);
        assert!(outcome.advisories.is_empty());
    }

    #[test]
    fn disjoint_sides_raise_advisory() {
        let origin = results(vec![("A", amount(1.0))]);
        let target = results(vec![("B", amount(1.0))]);

        let outcome = compare(&origin, &target, &info(BackendKind::Snowflake), &info(BackendKind::Snowflake));
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.advisories.len(), 1);
        assert_eq!(outcome.advisories[0].code, DiagnosticCode::NoCommonColumns);

        let outcome = compare(&origin, &AggregateResults::new(), &info(BackendKind::Snowflake), &info(BackendKind::Snowflake));
        assert!(outcome.advisories.is_empty());
    }
}
