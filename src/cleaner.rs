use crate::record::{FieldValue, RawRecord};
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("numeric pattern is valid"))
}

/// True for an optional leading minus, digits, and an optional fractional
/// part. Exponents, thousands separators and surrounding whitespace are
/// rejected.
pub fn is_strict_numeric(text: &str) -> bool {
    numeric_pattern().is_match(text)
}

/// The value of a strict numeric string, if it fits in a finite `f64`.
pub fn parse_strict_numeric(text: &str) -> Option<f64> {
    if !is_strict_numeric(text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Drops null and blank fields, trims text, and turns numeric-looking text
/// into numbers. Pure and idempotent.
pub fn clean(record: &RawRecord) -> RawRecord {
    record
        .iter()
        .filter_map(|(field, value)| clean_value(field, value).map(|v| (field, v)))
        .collect()
}

fn clean_value(field: &str, value: &FieldValue) -> Option<FieldValue> {
    match value {
        FieldValue::Null => None,
        FieldValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Some(number) = parse_strict_numeric(trimmed) {
                debug!("Coerced field '{}' from text to number", field);
                return Some(FieldValue::Number(number));
            }
            Some(FieldValue::Text(trimmed.to_string()))
        }
        other => Some(other.clone()),
    }
}
