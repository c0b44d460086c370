use serde_json::Value;

use crate::text::stringify;

/// Rendered in place of absent or null values.
pub const PLACEHOLDER: &str = "-";

const MAX_FRACTION_DIGITS: usize = 2;
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Finite numeric value of a field, or `None` when it does not coerce.
///
/// Numbers pass through, numeric strings are parsed after trimming, booleans
/// count as 1 and 0. Blank strings, null, containers and anything that parses
/// to NaN or an infinity yield `None`.
pub fn to_number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_numeric_text(text),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|number| number.is_finite())
}

/// Human-readable form of a value: grouped digits with at most two fraction
/// digits for numbers, the raw text for anything that is not numeric.
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => PLACEHOLDER.to_owned(),
        Some(inner) => match to_number(Some(inner)) {
            Some(number) => format_number(number),
            None => stringify(inner),
        },
    }
}

/// Table cell text: raw display form, placeholder when missing.
pub fn display_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => PLACEHOLDER.to_owned(),
        Some(inner) => stringify(inner),
    }
}

/// Grouped digits, at most two fraction digits, halves rounded away from zero.
pub fn format_number(number: f64) -> String {
    if number.is_nan() {
        return "NaN".to_owned();
    }
    if number.is_infinite() {
        return if number > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }

    let fixed = fixed_hundredths(number.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + integer.len() / 3 + 1);
    let negative = number < 0.0 && (integer != "0" || !fraction.is_empty());
    if negative {
        out.push('-');
    }
    out.push_str(&group_digits(integer));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Two-decimal text of a non-negative finite number. `{:.2}` rounds exact
/// ties to even; the only exact ties at two decimals are odd multiples of
/// 1/8, which are rounded up here instead.
fn fixed_hundredths(abs: f64) -> String {
    let eighths = abs * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 == 1.0 && eighths < MAX_EXACT_INTEGER {
        let thousandths = eighths as u128 * 125;
        let hundredths = (thousandths + 5) / 10;
        return format!("{}.{:02}", hundredths / 100, hundredths % 100);
    }
    format!("{:.*}", MAX_FRACTION_DIGITS, abs)
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn to_number_accepts_finite_numbers_and_numeric_text() {
        assert_eq!(to_number(Some(&json!("12.5"))), Some(12.5));
        assert_eq!(to_number(Some(&json!(" 7 "))), Some(7.0));
        assert_eq!(to_number(Some(&json!(42))), Some(42.0));
        assert_eq!(to_number(Some(&json!(false))), Some(0.0));
    }

    #[test]
    fn to_number_rejects_everything_else() {
        assert_eq!(to_number(Some(&json!("abc"))), None);
        assert_eq!(to_number(Some(&Value::Null)), None);
        assert_eq!(to_number(None), None);
        assert_eq!(to_number(Some(&json!("NaN"))), None);
        assert_eq!(to_number(Some(&json!("Infinity"))), None);
        assert_eq!(to_number(Some(&json!("-inf"))), None);
        assert_eq!(to_number(Some(&json!(""))), None);
        assert_eq!(to_number(Some(&json!([1]))), None);
    }

    #[test]
    fn format_value_uses_placeholder_for_missing() {
        assert_eq!(format_value(None), "-");
        assert_eq!(format_value(Some(&Value::Null)), "-");
    }

    #[test]
    fn format_value_groups_digits_and_caps_fraction() {
        assert_eq!(format_value(Some(&json!(1234.5))), "1,234.5");
        assert_eq!(format_value(Some(&json!(1234567.891))), "1,234,567.89");
        assert_eq!(format_value(Some(&json!(999.999))), "1,000");
        assert_eq!(format_value(Some(&json!(12))), "12");
        assert_eq!(format_value(Some(&json!(-98765.4))), "-98,765.4");
        assert_eq!(format_value(Some(&json!("2500"))), "2,500");
        assert_eq!(format_number(0.125), "0.13");
        assert_eq!(format_number(1.375), "1.38");
        assert_eq!(format_number(12_345.625), "12,345.63");
        assert_eq!(format_number(-0.125), "-0.13");
        assert_eq!(format_number(2.675), "2.67");
        assert_eq!(format_number(0.25), "0.25");
    }

    #[test]
    fn format_number_spells_out_non_finite_values() {
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn format_value_keeps_non_numeric_text() {
        assert_eq!(format_value(Some(&json!("n/a"))), "n/a");
    }

    #[test]
    fn format_number_never_renders_negative_zero() {
        assert_eq!(format_number(-0.001), "0");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn display_cell_keeps_raw_text() {
        assert_eq!(display_cell(Some(&json!(1234.5))), "1234.5");
        assert_eq!(display_cell(Some(&json!("99213"))), "99213");
        assert_eq!(display_cell(None), "-");
    }
}
