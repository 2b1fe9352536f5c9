//! Placeholder substitution and conditional step assembly.
//!
//! Templates reference the context with `{{dotted.path}}`. Missing paths render
//! as the empty string; rendering never fails, so prompt text stays well formed
//! when the context is only partially populated.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::condition::{Condition, conditions_hold, resolve_path};

/// Separator placed between rendered steps.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Prompt channel a step contributes to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// System prompt.
    System,
    /// User prompt.
    User,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
        })
    }
}

/// One conditionally included template fragment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderStep {
    /// Identifier used in traces.
    pub id: String,
    /// Channel the rendered text belongs to.
    pub channel: Channel,
    /// Template text with `{{path}}` placeholders.
    pub template: String,
    /// All must hold for the step to render.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl RenderStep {
    /// Creates an unconditional step.
    #[must_use]
    pub fn new(id: impl Into<String>, channel: Channel, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channel,
            template: template.into(),
            conditions: Vec::new(),
        }
    }

    /// Adds a condition.
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Audit record for one step of a [`build_blocks`] call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StepTrace {
    /// Step identifier.
    pub id: String,
    /// Step channel.
    pub channel: Channel,
    /// Whether the step's text ended up in the block.
    pub included: bool,
}

/// Result of [`build_blocks`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedBlock {
    /// Joined text of every included step.
    pub text: String,
    /// One entry per input step, in input order.
    pub trace: Vec<StepTrace>,
}

/// Replaces every `{{path}}` in `template` with the resolved context value.
#[must_use]
pub fn render_template(template: &str, context: &Value) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            // Unterminated placeholder: keep the remainder verbatim.
            output.push_str(&rest[start..]);
            return output;
        };
        let path = after_open[..end].trim();
        output.push_str(&value_to_text(resolve_path(context, path)));
        rest = &after_open[end + 2..];
    }

    output.push_str(rest);
    output
}

/// String form of a resolved value as it appears in rendered text.
#[must_use]
pub fn value_to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(structured @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::to_string(structured).unwrap_or_default()
        }
    }
}

/// Renders every step whose conditions hold and joins the non-blank results.
#[must_use]
pub fn build_blocks(steps: &[RenderStep], context: &Value) -> RenderedBlock {
    let mut parts = Vec::new();
    let mut trace = Vec::with_capacity(steps.len());

    for step in steps {
        let mut included = false;
        if conditions_hold(&step.conditions, context) {
            let text = render_template(&step.template, context);
            if !text.trim().is_empty() {
                parts.push(text);
                included = true;
            }
        }
        trace!(step = %step.id, channel = %step.channel, included, "render step");
        trace.push(StepTrace {
            id: step.id.clone(),
            channel: step.channel,
            included,
        });
    }

    RenderedBlock {
        text: parts.join(BLOCK_SEPARATOR),
        trace,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::condition::Operator;

    #[test]
    fn renders_simple_placeholder() {
        assert_eq!(render_template("Hello {{name}}", &json!({ "name": "World" })), "Hello World");
    }

    #[test]
    fn missing_path_renders_empty() {
        assert_eq!(render_template("Hello {{name}}", &json!({})), "Hello ");
        assert_eq!(render_template("{{a.b.c}}!", &json!({ "a": 1 })), "!");
    }

    #[test]
    fn renders_nested_paths_and_structured_values() {
        let ctx = json!({
            "tone": { "label": "Casual" },
            "count": 3,
            "flags": { "x": true },
            "nothing": null
        });
        assert_eq!(
            render_template("{{ tone.label }} x{{count}} {{flags}}{{nothing}}", &ctx),
            "Casual x3 {\"x\":true}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_kept() {
        assert_eq!(render_template("a {{b", &json!({ "b": 1 })), "a {{b");
    }

    #[test]
    fn build_blocks_skips_failed_and_blank_steps() {
        let steps = vec![
            RenderStep::new("intro", Channel::System, "You are an architect."),
            RenderStep::new("notes", Channel::System, "{{notes}}"),
            RenderStep::new("casual", Channel::System, "Keep it light.")
                .when(Condition::equals("tone.id", "casual")),
            RenderStep::new("rules", Channel::System, "Follow {{rules}}.")
                .when(Condition::new("rules", Operator::Exists)),
        ];
        let ctx = json!({ "notes": "   ", "tone": { "id": "formal" }, "rules": "the brief" });

        let block = build_blocks(&steps, &ctx);
        assert_eq!(block.text, "You are an architect.\n\nFollow the brief.");
        let included: Vec<bool> = block.trace.iter().map(|t| t.included).collect();
        assert_eq!(included, vec![true, false, false, true]);
        assert_eq!(block.trace[1].id, "notes");
    }

    #[test]
    fn rendering_is_deterministic() {
        let steps = vec![RenderStep::new("a", Channel::User, "{{x}} and {{y}}")];
        let ctx = json!({ "x": 1, "y": [1, 2] });
        assert_eq!(build_blocks(&steps, &ctx), build_blocks(&steps, &ctx));
    }
}
