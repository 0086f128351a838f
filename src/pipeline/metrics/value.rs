//! Raw capture to typed value.
//!
//! Accepts `10,570`, ` 10.5 g/dL`, `150/95 mmHg`, `45%`. Anything whose residue
//! after the leading number is not unit-like (`1.2.3`, `12-15`, `abc`) is
//! rejected, and the caller treats that occurrence as not captured.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::MetricValue;

/// Typed value parsed from one raw capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedValue {
    Integer(i64),
    Float(f64),
    /// Ordered pair, never reduced or divided.
    Pair(i64, i64),
}

impl ParsedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Pair(..) => None,
        }
    }

    /// Convert to the record-level value. Pairs that do not fit `u32` become `Missing`.
    pub fn to_metric_value(self) -> MetricValue {
        match self {
            Self::Integer(v) => MetricValue::Scalar(v as f64),
            Self::Float(v) => MetricValue::Scalar(v),
            Self::Pair(a, b) => match (u32::try_from(a), u32::try_from(b)) {
                (Ok(a), Ok(b)) => MetricValue::Pair(a, b),
                _ => MetricValue::Missing,
            },
        }
    }
}

static LEADING_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(\d+(?:\.\d+)?|\.\d+)(?:\s*/\s*(\d+(?:\.\d+)?))?(.*)$").unwrap()
});

/// Parse a raw capture into a typed value, or `None` when unparseable.
pub fn parse_value(raw: &str) -> Option<ParsedValue> {
    split_value_and_unit(raw).map(|(value, _)| value)
}

/// Parse a raw capture and return any trailing unit text alongside the value.
pub fn split_value_and_unit(raw: &str) -> Option<(ParsedValue, Option<String>)> {
    let cleaned = raw.trim().replace(',', "");
    let caps = LEADING_VALUE.captures(&cleaned)?;

    let first = caps.get(1)?.as_str();
    let second = caps.get(2).map(|m| m.as_str());
    let residue = caps.get(3).map_or("", |m| m.as_str());

    if !is_unit_like(residue) {
        return None;
    }

    let value = match second {
        Some(denominator) => {
            // A slash only means a dual reading when both sides are integers.
            if first.contains('.') || denominator.contains('.') {
                return None;
            }
            ParsedValue::Pair(first.parse().ok()?, denominator.parse().ok()?)
        }
        None if first.contains('.') => ParsedValue::Float(first.parse().ok()?),
        None => ParsedValue::Integer(first.parse().ok()?),
    };

    let unit = residue.trim();
    let unit = (!unit.is_empty()).then(|| unit.to_string());
    Some((value, unit))
}

/// Residue after the number must be empty or start like a unit.
fn is_unit_like(residue: &str) -> bool {
    let mut chars = residue.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_whitespace() || c == '%' || c == 'µ' || c.is_alphabetic() => true,
        Some('/') => chars.next().is_some_and(|c| c.is_alphabetic() || c == 'µ'),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(parse_value("10,570"), Some(ParsedValue::Integer(10570)));
        assert_eq!(parse_value("2,50,000"), Some(ParsedValue::Integer(250000)));
    }

    #[test]
    fn decimal_becomes_float() {
        assert_eq!(parse_value(" 10.5 "), Some(ParsedValue::Float(10.5)));
        assert_eq!(parse_value("0.45"), Some(ParsedValue::Float(0.45)));
        assert_eq!(parse_value(".8"), Some(ParsedValue::Float(0.8)));
    }

    #[test]
    fn slash_pair_kept_as_pair() {
        assert_eq!(parse_value("150/95"), Some(ParsedValue::Pair(150, 95)));
        assert_eq!(parse_value("120 / 80 mmHg"), Some(ParsedValue::Pair(120, 80)));
    }

    #[test]
    fn decimal_pair_rejected() {
        assert_eq!(parse_value("12.5/3"), None);
    }

    #[test]
    fn trailing_unit_tolerated() {
        assert_eq!(
            split_value_and_unit("10.5 g/dL"),
            Some((ParsedValue::Float(10.5), Some("g/dL".into())))
        );
        assert_eq!(
            split_value_and_unit("45%"),
            Some((ParsedValue::Integer(45), Some("%".into())))
        );
        assert_eq!(
            split_value_and_unit("10570/cumm"),
            Some((ParsedValue::Integer(10570), Some("/cumm".into())))
        );
        assert_eq!(split_value_and_unit("98"), Some((ParsedValue::Integer(98), None)));
    }

    #[test]
    fn non_numeric_residue_rejected() {
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("1.2.3"), None);
        assert_eq!(parse_value("12-15"), None);
        assert_eq!(parse_value("Nil"), None);
    }

    #[test]
    fn converts_to_metric_value() {
        assert_eq!(ParsedValue::Integer(7).to_metric_value(), MetricValue::Scalar(7.0));
        assert_eq!(ParsedValue::Pair(150, 95).to_metric_value(), MetricValue::Pair(150, 95));
        assert_eq!(ParsedValue::Pair(-1, 95).to_metric_value(), MetricValue::Missing);
        assert_eq!(ParsedValue::Pair(150, 95).as_f64(), None);
    }
}
