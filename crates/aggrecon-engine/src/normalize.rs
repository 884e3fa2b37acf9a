//! Result normalization
//!
//! Raw rows are keyed by result alias (`min_AMOUNT`, or `MIN_AMOUNT` when the
//! warehouse folds case). Normalization maps each key to its canonical metric
//! name and coerces values so both sides compare on equal terms:
//!
//! 1. With rounding on, numeric values are rounded to `round_digits`, then
//!    collapsed to an integer when whole.
//! 2. Otherwise reals that are whole become integers.
//! 3. Exact decimals stay exact: whole values that fit in `i64` become
//!    integers, the rest keep their decimal form with trailing zeros dropped.
//! 4. Anything else is left unchanged.
//!
//! Error markers pass through untouched. Normalizing twice with the same
//! options gives the same result as normalizing once.

use aggrecon_core::{AggregateResults, ColumnAggregates, ComparisonOptions, MetricRow, MetricValue};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Integer when `value` is whole and fits in `i64`, otherwise the real itself
pub fn collapse_whole(value: f64) -> MetricValue {
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value < i64::MAX as f64
    {
        MetricValue::Int(value as i64)
    } else {
        MetricValue::Float(value)
    }
}

/// Integer when `value` has no fractional digits and fits in `i64`
fn collapse_exact(value: Decimal) -> MetricValue {
    match value.fract().is_zero().then(|| value.to_i64()).flatten() {
        Some(i) => MetricValue::Int(i),
        None => MetricValue::Decimal(value.normalize().to_string()),
    }
}

/// Round through the correctly rounded decimal text, so 2.675 (stored as
/// 2.67499...) rounds to 2.67
fn round_to(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", digits as usize, value)
        .parse::<f64>()
        .unwrap_or(value)
}

/// Canonical metric name for a raw result key
///
/// Everything from the first `_<column>` on is dropped (case-insensitive) and
/// the rest lower-cased. Keys without the suffix are only lower-cased.
pub fn canonical_metric_key(key: &str, column: &str) -> String {
    let needle = format!("_{}", column).to_lowercase();
    let haystack = key.to_lowercase();

    match haystack.find(&needle) {
        Some(idx) => haystack[..idx].to_string(),
        None => haystack,
    }
}

/// Apply the value policy to one scalar
pub fn normalize_value(value: &MetricValue, rounding: Option<u32>) -> MetricValue {
    match (value, rounding) {
        (MetricValue::Null | MetricValue::Text(_), _) => value.clone(),
        (MetricValue::Decimal(_), rounding) => match value.as_decimal() {
            Some(d) => collapse_exact(rounding.map_or(d, |digits| d.round_dp(digits))),
            None => value.clone(),
        },
        (_, Some(digits)) => match value.as_f64() {
            Some(f) => collapse_whole(round_to(f, digits)),
            None => value.clone(),
        },
        (MetricValue::Int(_), None) => value.clone(),
        (MetricValue::Float(f), None) => collapse_whole(*f),
    }
}

/// Normalize one column's raw aggregates
pub fn normalize_column(column: &str, raw: &ColumnAggregates, rounding: Option<u32>) -> ColumnAggregates {
    match raw {
        ColumnAggregates::Error(_) => raw.clone(),
        ColumnAggregates::Metrics(row) => {
            let normalized: MetricRow = row
                .iter()
                .map(|(key, value)| (canonical_metric_key(key, column), normalize_value(value, rounding)))
                .collect();
            ColumnAggregates::Metrics(normalized)
        }
    }
}

/// Normalize every column of one side
pub fn normalize(raw: &AggregateResults, should_round: bool, round_digits: u32) -> AggregateResults {
    ResultNormalizer::new(should_round, round_digits).normalize(raw)
}

/// Normalization options applied identically to both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultNormalizer {
    rounding: Option<u32>,
}

impl ResultNormalizer {
    pub fn new(should_round: bool, round_digits: u32) -> Self {
        Self {
            rounding: should_round.then_some(round_digits),
        }
    }

    pub fn from_options(options: &ComparisonOptions) -> Self {
        Self {
            rounding: options.rounding(),
        }
    }

    pub fn normalize(&self, raw: &AggregateResults) -> AggregateResults {
        raw.iter()
            .map(|(column, aggregates)| (column.clone(), normalize_column(column, aggregates, self.rounding)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw_amount() -> AggregateResults {
        let row: MetricRow = [
            ("min_AMOUNT", MetricValue::Float(1.0)),
            ("max_AMOUNT", MetricValue::Float(99.999999999)),
            ("avg_AMOUNT", MetricValue::Decimal("50.500000".into())),
            ("sum_AMOUNT", MetricValue::Decimal("5050.000000".into())),
            ("count_AMOUNT", MetricValue::Int(100)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let mut raw = AggregateResults::new();
        raw.insert("AMOUNT".to_string(), ColumnAggregates::Metrics(row));
        raw.insert("QTY".to_string(), ColumnAggregates::error("Failed to fetch aggregates for QTY"));
        raw
    }

    #[test]
    fn collapse_whole_numbers() {
        assert_eq!(collapse_whole(5050.0), MetricValue::Int(5050));
        assert_eq!(collapse_whole(-3.0), MetricValue::Int(-3));
        assert_eq!(collapse_whole(50.5), MetricValue::Float(50.5));
        assert_eq!(collapse_whole(1e20), MetricValue::Float(1e20));
        assert!(matches!(collapse_whole(f64::NAN), MetricValue::Float(_)));
    }

    #[test]
    fn metric_keys() {
        assert_eq!(canonical_metric_key("min_AMOUNT", "AMOUNT"), "min");
        assert_eq!(canonical_metric_key("MIN_AMOUNT", "AMOUNT"), "min");
        assert_eq!(canonical_metric_key("count_amount", "AMOUNT"), "count");
        assert_eq!(canonical_metric_key("avg_total_total", "total"), "avg");
        assert_eq!(canonical_metric_key("SUM", "AMOUNT"), "sum");
        assert_eq!(canonical_metric_key("MAX_ÄRGER", "ärger"), "max");
        assert_eq!(canonical_metric_key("ÄVG", "AMOUNT"), "ävg");
    }

    #[test]
    fn normalize_without_rounding() {
        let normalized = normalize(&raw_amount(), false, 0);
        let amount = normalized["AMOUNT"].metrics().unwrap();

        assert_eq!(amount["min"], MetricValue::Int(1));
        assert_eq!(amount["max"], MetricValue::Float(99.999999999));
        assert_eq!(amount["avg"], MetricValue::Decimal("50.5".into()));
        assert_eq!(amount["sum"], MetricValue::Int(5050));
        assert_eq!(amount["count"], MetricValue::Int(100));

        assert_eq!(normalized["QTY"], ColumnAggregates::error("Failed to fetch aggregates for QTY"));
    }

    #[test]
    fn normalize_with_rounding() {
        let normalized = normalize(&raw_amount(), true, 2);
        let amount = normalized["AMOUNT"].metrics().unwrap();

        assert_eq!(amount["max"], MetricValue::Int(100));
        assert_eq!(amount["avg"], MetricValue::Decimal("50.5".into()));
    }

    #[test]
    fn rounding_policy() {
        assert_eq!(normalize_value(&MetricValue::Float(2.675), Some(2)), MetricValue::Float(2.67));
        assert_eq!(normalize_value(&MetricValue::Float(2.6751), Some(2)), MetricValue::Float(2.68));
        assert_eq!(normalize_value(&MetricValue::Float(1.004), Some(2)), MetricValue::Int(1));
        assert_eq!(normalize_value(&MetricValue::Int(7), Some(0)), MetricValue::Int(7));
        assert_eq!(normalize_value(&MetricValue::Float(0.6), Some(0)), MetricValue::Int(1));
        assert_eq!(
            normalize_value(&MetricValue::Decimal("12.3456".into()), Some(1)),
            MetricValue::Decimal("12.3".into())
        );
        assert_eq!(
            normalize_value(&MetricValue::Decimal("12345678901234567.894".into()), Some(2)),
            MetricValue::Decimal("12345678901234567.89".into())
        );
        assert_eq!(normalize_value(&MetricValue::Decimal("0.25".into()), Some(1)), MetricValue::Decimal("0.2".into()));
        assert_eq!(normalize_value(&MetricValue::Null, Some(2)), MetricValue::Null);
        assert_eq!(
            normalize_value(&MetricValue::Text("n/a".into()), Some(2)),
            MetricValue::Text("n/a".into())
        );
    }

    #[test]
    fn exact_decimals_keep_their_fraction() {
        let a = normalize_value(&MetricValue::Decimal("12345678901234567.89".into()), None);
        let b = normalize_value(&MetricValue::Decimal("12345678901234567.80".into()), None);

        assert_eq!(a, MetricValue::Decimal("12345678901234567.89".into()));
        assert_eq!(b, MetricValue::Decimal("12345678901234567.8".into()));
        assert_ne!(a, b);

        assert_eq!(
            normalize_value(&MetricValue::Decimal("12345678901234567.00".into()), None),
            MetricValue::Int(12345678901234567)
        );
        assert_eq!(
            normalize_value(&MetricValue::Decimal("99999999999999999999.000".into()), None),
            MetricValue::Decimal("99999999999999999999".into())
        );
        assert_eq!(normalize_value(&MetricValue::Decimal("1.0E3".into()), None), MetricValue::Int(1000));
    }

    #[test]
    fn normalization_is_idempotent() {
        for (should_round, digits) in [(false, 0), (true, 2), (true, 0)] {
            let once = normalize(&raw_amount(), should_round, digits);
            let twice = normalize(&once, should_round, digits);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalizer_from_options() {
        let options = ComparisonOptions {
            attempt_cast: false,
            round: true,
            round_digits: 3,
        };
        assert_eq!(ResultNormalizer::from_options(&options), ResultNormalizer::new(true, 3));
        assert_eq!(
            ResultNormalizer::from_options(&ComparisonOptions::default()),
            ResultNormalizer::new(false, 7)
        );
    }
}
