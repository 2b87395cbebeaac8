//! Small helpers over `serde_json::Value` shared by the rule engine,
//! payload assembler and DTO projector.

use serde_json::{Number, Value};

/// JSON type name used in diagnostics
#[must_use]
pub const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse a numeric string into a JSON number
///
/// Integral values stay integers so `"42"` becomes `42`, not `42.0`.
#[must_use]
pub fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(Number::from(int));
    }
    text.parse::<f64>()
        .ok()
        .filter(|float| float.is_finite())
        .and_then(Number::from_f64)
}

/// Integral view of a number, accepting floats with no fractional part
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub fn as_integer(number: &Number) -> Option<i64> {
    if let Some(int) = number.as_i64() {
        return Some(int);
    }
    let float = number.as_f64()?;
    (float.fract() == 0.0 && float.abs() < 9.0e15).then_some(float as i64)
}

/// Render a scalar for a URL slot, query string or header
///
/// Returns `None` for arrays and objects.
#[must_use]
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
