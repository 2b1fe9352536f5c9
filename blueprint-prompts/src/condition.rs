//! Dotted-path resolution and condition evaluation over JSON contexts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a [`Condition`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Resolved value equals `value`.
    Equals,
    /// Resolved value differs from `value`.
    NotEquals,
    /// Resolved value is a member of the `value` array.
    In,
    /// Resolved value is not a member of the `value` array.
    NotIn,
    /// Resolved value is present, non-null, and not the empty string.
    Exists,
    /// Resolved value coerces to `true`.
    #[default]
    Truthy,
    /// Resolved value coerces to `false`.
    Falsey,
}

/// Predicate gating a render step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-separated path into the context. `None` makes the condition pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Comparison to apply; defaults to [`Operator::Truthy`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// Operand for comparisons that take one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Condition {
    /// Condition on `field` with the given operator and no operand.
    #[must_use]
    pub fn new(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: Some(field.into()),
            operator: Some(operator),
            value: None,
        }
    }

    /// Sets the operand.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Shorthand for a `truthy` check.
    #[must_use]
    pub fn truthy(field: impl Into<String>) -> Self {
        Self::new(field, Operator::Truthy)
    }

    /// Shorthand for an `equals` check.
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Equals).with_value(value)
    }
}

/// Resolves a dot-separated path. Any missing segment yields `None`.
///
/// Numeric segments index into arrays.
#[must_use]
pub fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(context, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// JavaScript-style boolean coercion of an optional JSON value.
#[must_use]
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Evaluates one condition against `context`.
#[must_use]
pub fn evaluate(condition: &Condition, context: &Value) -> bool {
    let Some(field) = condition.field.as_deref() else {
        return true;
    };
    let resolved = resolve_path(context, field);
    let expected = condition.value.as_ref();

    match condition.operator.unwrap_or_default() {
        Operator::Equals => resolved == expected,
        Operator::NotEquals => resolved != expected,
        Operator::In => is_member(resolved, expected),
        Operator::NotIn => !is_member(resolved, expected),
        Operator::Exists => {
            !matches!(resolved, None | Some(Value::Null)) && resolved != Some(&Value::from(""))
        }
        Operator::Truthy => is_truthy(resolved),
        Operator::Falsey => !is_truthy(resolved),
    }
}

/// Returns `true` when every condition holds. An empty slice always holds.
#[must_use]
pub fn conditions_hold(conditions: &[Condition], context: &Value) -> bool {
    conditions.iter().all(|condition| evaluate(condition, context))
}

fn is_member(resolved: Option<&Value>, expected: Option<&Value>) -> bool {
    match (resolved, expected) {
        (Some(value), Some(Value::Array(candidates))) => candidates.contains(value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn exists_is_false_for_missing_leaf() {
        let cond = Condition::new("a.b", Operator::Exists);
        assert!(!evaluate(&cond, &json!({ "a": {} })));
        assert!(!evaluate(&cond, &json!({ "a": { "b": "" } })));
        assert!(!evaluate(&cond, &json!({ "a": { "b": null } })));
        assert!(evaluate(&cond, &json!({ "a": { "b": 0 } })));
    }

    #[test]
    fn truthy_coerces_zero_to_false() {
        let cond = Condition::truthy("a.b");
        assert!(!evaluate(&cond, &json!({ "a": { "b": 0 } })));
        assert!(evaluate(&cond, &json!({ "a": { "b": [] } })));
        assert!(!evaluate(&Condition::new("a.b", Operator::Falsey), &json!({ "a": { "b": 1 } })));
    }

    #[test]
    fn equals_compares_strictly() {
        let cond = Condition::equals("a.b", "x");
        assert!(evaluate(&cond, &json!({ "a": { "b": "x" } })));
        assert!(!evaluate(&cond, &json!({ "a": { "b": "y" } })));
        assert!(!evaluate(&Condition::equals("n", "1"), &json!({ "n": 1 })));
        assert!(evaluate(
            &Condition::new("a.b", Operator::NotEquals).with_value("x"),
            &json!({ "a": {} })
        ));
    }

    #[test]
    fn membership_requires_array_operand() {
        let cond = Condition::new("tone", Operator::In).with_value(json!(["casual", "playful"]));
        assert!(evaluate(&cond, &json!({ "tone": "casual" })));
        assert!(!evaluate(&cond, &json!({ "tone": "formal" })));

        let scalar = Condition::new("tone", Operator::In).with_value("casual");
        assert!(!evaluate(&scalar, &json!({ "tone": "casual" })));
        let not_in = Condition::new("tone", Operator::NotIn).with_value("casual");
        assert!(evaluate(&not_in, &json!({ "tone": "casual" })));
    }

    #[test]
    fn missing_field_and_operator_defaults() {
        assert!(evaluate(&Condition::default(), &json!({})));
        let implicit = Condition {
            field: Some("flag".into()),
            ..Condition::default()
        };
        assert!(evaluate(&implicit, &json!({ "flag": true })));
        assert!(!evaluate(&implicit, &json!({ "flag": false })));
    }

    #[test]
    fn all_conditions_must_hold() {
        let ctx = json!({ "a": true, "b": false });
        assert!(conditions_hold(&[], &ctx));
        assert!(conditions_hold(&[Condition::truthy("a")], &ctx));
        assert!(!conditions_hold(&[Condition::truthy("a"), Condition::truthy("b")], &ctx));
    }

    #[test]
    fn resolves_array_indices() {
        let ctx = json!({ "items": [{ "name": "first" }] });
        assert_eq!(resolve_path(&ctx, "items.0.name"), Some(&json!("first")));
        assert_eq!(resolve_path(&ctx, "items.1.name"), None);
    }

    #[test]
    fn deserializes_camel_case_operators() {
        let cond: Condition =
            serde_json::from_str(r#"{ "field": "x", "operator": "notIn", "value": [1] }"#).unwrap();
        assert_eq!(cond.operator, Some(Operator::NotIn));
    }
}
