//! Scalar values returned by aggregate queries

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// One scalar cell of an aggregate result row
///
/// Warehouses return exact decimals for `SUM`/`AVG` over fixed-point columns;
/// those are kept as text in `Decimal` until normalization decides what to do
/// with them.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Null,
    Int(i64),
    Float(f64),
    /// Exact decimal in its textual form, e.g. `"5050.000000"`
    Decimal(String),
    Text(String),
}

impl MetricValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integers, reals and parseable decimals
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Numeric view of the value. `Text` is never numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Decimal(text) => text.trim().parse::<f64>().ok(),
            Self::Null | Self::Text(_) => None,
        }
    }

    /// Exact view of the value
    ///
    /// Reals go through their shortest round-trip text. `None` for non-numeric
    /// values and for decimals outside the 96-bit mantissa range.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Int(i) => Some(Decimal::from(*i)),
            Self::Float(f) if f.is_finite() => Decimal::from_str(&f.to_string()).ok(),
            Self::Decimal(text) => parse_decimal(text),
            Self::Float(_) | Self::Null | Self::Text(_) => None,
        }
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self, Self::Decimal(_))
    }

    /// Convert a JSON scalar as returned by REST-style warehouse APIs
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
                    Self::Float(f)
                } else {
                    Self::Decimal(n.to_string())
                }
            }
            Value::String(s) => Self::Text(s.clone()),
            Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Plain (`5050.00`) or scientific (`1.0E3`) decimal text
fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(text) | Self::Text(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Decimal(text) | Self::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
