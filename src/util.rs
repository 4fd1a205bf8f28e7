// Utility helpers for parsing and number formatting.
//
// This module centralizes all the "dirty" attribute handling so the rest of
// the code can assume clean, typed, non-negative values.
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// Parse a string-like value into `f64`.
///
/// - Trims whitespace.
/// - Anything else must be a plain float literal; `"1,000"` is rejected.
/// - Returns `None` for anything that cannot be safely parsed, including
///   `NaN` and infinities.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce an attribute value into a cleaned measurement.
///
/// Returns the value and whether it had to be replaced. Absent, null,
/// unparseable, non-finite and negative values all become `0.0`.
pub fn coerce_measure(value: Option<&Value>) -> (f64, bool) {
    let parsed = match value {
        None | Some(Value::Null) => return (0.0, false),
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(s)) => parse_f64_safe(Some(s)),
        Some(Value::Bool(_)) | Some(Value::Array(_)) | Some(Value::Object(_)) => None,
    };
    match parsed {
        Some(v) if v >= 0.0 => (v, false),
        _ => (0.0, true),
    }
}

/// Render a scalar attribute as a label. `None` for null and containers.
pub fn value_as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_trims_and_rejects_garbage() {
        assert_eq!(parse_f64_safe(Some(" 1234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("1,234.5")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn coerce_measure_never_goes_negative() {
        assert_eq!(coerce_measure(Some(&json!(12.5))), (12.5, false));
        assert_eq!(coerce_measure(Some(&json!("40"))), (40.0, false));
        assert_eq!(coerce_measure(Some(&json!("abc"))), (0.0, true));
        assert_eq!(coerce_measure(Some(&json!("1,000"))), (0.0, true));
        assert_eq!(coerce_measure(Some(&json!(-3))), (0.0, true));
        assert_eq!(coerce_measure(Some(&json!([1]))), (0.0, true));
        assert_eq!(coerce_measure(Some(&Value::Null)), (0.0, false));
        assert_eq!(coerce_measure(None), (0.0, false));
    }

    #[test]
    fn labels_from_scalars() {
        assert_eq!(value_as_label(&json!("Cotton")), Some("Cotton".to_string()));
        assert_eq!(value_as_label(&json!(17)), Some("17".to_string()));
        assert_eq!(value_as_label(&Value::Null), None);
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-2.5, 1), "-2.5");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(999.6, 0), "1,000");
        assert_eq!(format_int(9855usize), "9,855");
        assert_eq!(round_to(12.3456, 2), 12.35);
    }
}
