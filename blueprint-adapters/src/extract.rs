//! "First strategy that succeeds" helpers for digging fields out of loosely
//! shaped model JSON.

use serde_json::Value;

/// A single extraction attempt over `I`.
pub type Strategy<I, T> = fn(&I) -> Option<T>;

/// Returns the output of the first strategy that yields `Some`.
#[must_use]
pub fn first_match<I: ?Sized, T>(input: &I, strategies: &[Strategy<I, T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(input))
}

/// Resolves a dot-separated path. Numeric segments index arrays.
#[must_use]
pub fn value_at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    value.pointer(&format!("/{}", path.replace('.', "/")))
}

/// Returns the first non-blank string found at any of `paths`.
#[must_use]
pub fn string_at_paths(value: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| {
        value_at_path(value, path)
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_owned)
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn first_successful_strategy_wins() {
        let strategies: [Strategy<String, usize>; 3] = [
            |s| s.find('x'),
            |s| s.find('b'),
            |_| Some(0),
        ];
        assert_eq!(first_match(&"abc".to_owned(), &strategies), Some(1));
        assert_eq!(first_match(&"zzz".to_owned(), &strategies[..2]), None);
    }

    #[test]
    fn candidate_paths_are_tried_in_order() {
        let value = json!({
            "final_output": { "expanded_prompt_text": "  " },
            "expanded_prompt": "fallback",
            "items": ["zero", "one"]
        });
        let found = string_at_paths(
            &value,
            &["final_output.expanded_prompt_text", "expanded_prompt", "prompt"],
        );
        assert_eq!(found.as_deref(), Some("fallback"));
        assert_eq!(string_at_paths(&value, &["items.1"]).as_deref(), Some("one"));
        assert_eq!(string_at_paths(&value, &["missing"]), None);
    }
}
