use std::cmp::Ordering;

use serde_json::{Number, Value};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::AnomalyRecord;

/// Display form of a JSON value. Whole floats print without a fraction.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number_text(number),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Field value as text; absent and null fields read as the empty string.
pub fn field_text(record: &AnomalyRecord, key: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(value) => stringify(value),
    }
}

/// Collation-style ordering: letters compare case- and accent-insensitively
/// first, then accents, then case with uppercase ahead.
pub fn locale_compare(left: &str, right: &str) -> Ordering {
    primary_key(left)
        .cmp(&primary_key(right))
        .then_with(|| secondary_key(left).cmp(&secondary_key(right)))
        .then_with(|| left.cmp(right))
}

fn primary_key(text: &str) -> String {
    text.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

fn secondary_key(text: &str) -> String {
    text.nfd().flat_map(char::to_lowercase).collect()
}

fn number_text(number: &Number) -> String {
    if let Some(value) = number.as_i64() {
        return value.to_string();
    }
    if let Some(value) = number.as_u64() {
        return value.to_string();
    }
    match number.as_f64() {
        Some(value) => float_text(value),
        None => number.to_string(),
    }
}

/// Shortest round-trip text; exponent form outside `[1e-6, 1e21)`.
fn float_text(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 {
        "0".to_owned()
    } else if !(1e-6..1e21).contains(&magnitude) {
        let text = format!("{value:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        }
    } else {
        format!("{value}")
    }
}
