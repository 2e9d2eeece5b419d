//! Conversions between expression results and mapped values.

use crate::error::TranslationError;
use crate::result::Confirmation;
use kestrel_expr::value_utils::to_display_string;
use kestrel_expr::{Expression, Vars};
use serde_json::Value;

const CONFIRMED_SUFFIX: &str = "[CONFIRMED]";
const UNCONFIRMED_SUFFIX: &str = "[UNCONFIRMED]";

/// Evaluates `expression` into a list of values.
///
/// Arrays yield one value per non-null element, null yields nothing, any
/// other value yields itself.
pub(crate) fn evaluate_values(
    action: &str,
    expression: &Expression,
    vars: &Vars,
) -> Result<Vec<String>, TranslationError> {
    let value = expression
        .evaluate(vars)
        .map_err(|source| TranslationError::ActionExpression {
            action: action.to_string(),
            source,
        })?;
    Ok(to_strings(value))
}

pub(crate) fn to_strings(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(to_display_string)
            .collect(),
        other => vec![to_display_string(&other)],
    }
}

/// Strips a `[CONFIRMED]` / `[UNCONFIRMED]` suffix.
pub(crate) fn split_confirmation(value: &str) -> (&str, Confirmation) {
    if let Some(stripped) = value.strip_suffix(CONFIRMED_SUFFIX) {
        (stripped, Confirmation::Confirmed)
    } else if let Some(stripped) = value.strip_suffix(UNCONFIRMED_SUFFIX) {
        (stripped, Confirmation::Unconfirmed)
    } else {
        (value, Confirmation::Default)
    }
}

/// Renders `text` as a single-quoted expression string literal.
pub(crate) fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_strings() {
        assert!(to_strings(Value::Null).is_empty());
        assert_eq!(to_strings(json!("a")), vec!["a"]);
        assert_eq!(to_strings(json!(5)), vec!["5"]);
        assert_eq!(to_strings(json!(["a", null, 2])), vec!["a", "2"]);
        assert_eq!(to_strings(json!({"k": 1})), vec![r#"{"k":1}"#]);
    }

    #[test]
    fn test_split_confirmation() {
        assert_eq!(split_confirmation("a@b.com[CONFIRMED]"), ("a@b.com", Confirmation::Confirmed));
        assert_eq!(split_confirmation("a@b.com[UNCONFIRMED]"), ("a@b.com", Confirmation::Unconfirmed));
        assert_eq!(split_confirmation("a@b.com"), ("a@b.com", Confirmation::Default));
    }

    #[test]
    fn test_quote_round_trips_through_compiler() {
        let literal = quote("it's a \\ test");
        let value = kestrel_expr::compile(&literal).unwrap().evaluate(&Vars::new()).unwrap();
        assert_eq!(value, json!("it's a \\ test"));
    }
}
