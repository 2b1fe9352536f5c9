//! Architect phase helpers: the JSON contract and blueprint extraction.

use blueprint_adapters::extract::{Strategy, first_match, string_at_paths};
use blueprint_adapters::parse_json_response;
use serde_json::Value;
use tracing::debug;

/// Footer appended to the architect system prompt.
pub const ARCHITECT_CONTRACT: &str = "Return your answer as a single JSON object with exactly \
these keys and no surrounding prose:\n\
{\n\
  \"analysis\": {\"detected_domain\": string, \"input_quality_score\": number 1-10, \"is_vague_or_short\": boolean},\n\
  \"reverse_prompting\": {\"was_triggered\": boolean, \"refined_task_text\": string, \"reasoning\": string},\n\
  \"final_output\": {\"expanded_prompt_text\": string (required, non-empty), \"enrichment_attributes_used\": [string]}\n\
}";

/// Where the blueprint text may live, most specific first.
pub const BLUEPRINT_PATHS: &[&str] = &[
    "final_output.expanded_prompt_text",
    "finalOutput.expandedPromptText",
    "final_output.expanded_prompt",
    "final_output.prompt",
    "expanded_prompt_text",
    "expanded_prompt",
    "prompt",
];

/// Appends [`ARCHITECT_CONTRACT`] to a rendered system prompt.
#[must_use]
pub fn with_contract(system_prompt: &str) -> String {
    if system_prompt.trim().is_empty() {
        ARCHITECT_CONTRACT.to_owned()
    } else {
        format!("{}\n\n{ARCHITECT_CONTRACT}", system_prompt.trim_end())
    }
}

/// Pulls the blueprint out of an architect response.
///
/// Tries the candidate paths, then the whole JSON value serialised. When the
/// response is not JSON at all the trimmed raw text is the blueprint.
#[must_use]
pub fn extract_blueprint(response: &str) -> String {
    let strategies: [Strategy<Value, String>; 2] = [
        |value| string_at_paths(value, BLUEPRINT_PATHS),
        |value| serde_json::to_string_pretty(value).ok(),
    ];

    match parse_json_response(response) {
        Ok(value) => first_match(&value, &strategies).unwrap_or_default(),
        Err(err) => {
            debug!(error = %err, "architect response is not JSON; using raw text");
            response.trim().to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_follows_system_prompt() {
        let system = with_contract("Be an architect.\n");
        assert!(system.starts_with("Be an architect.\n\nReturn your answer"));
        assert_eq!(with_contract("  "), ARCHITECT_CONTRACT);
    }

    #[test]
    fn extracts_expanded_prompt_text() {
        let response = r#"{"analysis": {}, "final_output": {"expanded_prompt_text": "Write a crisp email."}}"#;
        assert_eq!(extract_blueprint(response), "Write a crisp email.");
    }

    #[test]
    fn code_fence_inside_blueprint_text_is_kept() {
        let blueprint = "Write a function. Example:\n```rust\nfn main() {}\n```\nKeep it short.";
        let response = serde_json::json!({
            "final_output": { "expanded_prompt_text": blueprint }
        })
        .to_string();
        assert_eq!(extract_blueprint(&response), blueprint);
    }

    #[test]
    fn falls_back_through_candidate_paths() {
        let response = "```json\n{\"expanded_prompt\": \"Fallback prompt\"}\n```";
        assert_eq!(extract_blueprint(response), "Fallback prompt");
    }

    #[test]
    fn serialises_unrecognised_json() {
        let response = r#"{"something": "else"}"#;
        assert_eq!(extract_blueprint(response), "{\n  \"something\": \"else\"\n}");
    }

    #[test]
    fn raw_text_when_not_json() {
        assert_eq!(extract_blueprint("  Just write it.  "), "Just write it.");
    }
}
