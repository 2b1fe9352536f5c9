//! Lenient JSON extraction from model output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("static pattern compiles")
});

/// Model output could not be parsed as JSON.
#[derive(Debug, Error)]
#[error("model response is not valid JSON: {source}")]
pub struct JsonParseError {
    /// Underlying decoder error.
    #[from]
    pub source: serde_json::Error,
}

/// Parses the first fenced code block in `text`, falling back to the whole
/// trimmed text when there is no fence or the fence does not hold JSON.
///
/// The fallback matters for raw JSON replies whose string values embed a
/// fenced snippet of their own.
///
/// # Errors
///
/// Returns [`JsonParseError`] with the whole-text decoder error when neither
/// candidate is valid JSON.
pub fn parse_json_response(text: &str) -> Result<Value, JsonParseError> {
    let fenced = FENCED_BLOCK
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|body| serde_json::from_str(body.as_str().trim()).ok());
    match fenced {
        Some(value) => Ok(value),
        None => Ok(serde_json::from_str(text.trim())?),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_fenced_json_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(parse_json_response(text).unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn parses_bare_fence() {
        let text = "```\n[1, 2]\n```";
        assert_eq!(parse_json_response(text).unwrap(), json!([1, 2]));
    }

    #[test]
    fn parses_whole_string_without_fence() {
        assert_eq!(parse_json_response("  {\"ok\": true}\n").unwrap(), json!({ "ok": true }));
    }

    #[test]
    fn raw_json_with_embedded_fence_parses_whole_text() {
        let text = json!({ "snippet": "Example:\n```rust\nfn main() {}\n```\nDone." }).to_string();
        assert_eq!(
            parse_json_response(&text).unwrap()["snippet"],
            "Example:\n```rust\nfn main() {}\n```\nDone."
        );
    }

    #[test]
    fn non_json_fence_in_prose_is_an_error() {
        assert!(parse_json_response("Try this:\n```\nnot json\n```").is_err());
    }

    #[test]
    fn rejects_prose() {
        assert!(parse_json_response("I cannot help with that").is_err());
    }
}
