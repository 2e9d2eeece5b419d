//! Utility functions for working with serde_json::Value

use serde_json::{Number, Value};

/// Get the type name of a Value for error messages
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[inline]
pub fn number_as_f64(num: &Number) -> Option<f64> {
    num.as_f64().or_else(|| num.as_i64().map(|i| i as f64))
}

/// Truthiness used by `!`, `&&`, `||` and `?:`.
///
/// Null, false, zero, and empty strings/collections are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => number_as_f64(n).is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}

/// Equality with numeric coercion, so `1 == 1.0`.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => number_as_f64(l) == number_as_f64(r),
        _ => left == right,
    }
}

/// Renders a value the way it is concatenated into strings.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
