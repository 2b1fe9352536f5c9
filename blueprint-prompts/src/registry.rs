//! Registry of template specs (ordered render steps plus metadata).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::condition::{Condition, Operator};
use crate::error::{PromptError, PromptResult};
use crate::template::{Channel, RenderStep};

/// Identifier of the built-in architect template, used when nothing else resolves.
pub const FALLBACK_SPEC_ID: &str = "blueprint-architect";

/// A named, versioned set of render steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Registry key.
    pub id: String,
    /// Template version reported in prompt plans.
    pub version: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Arbitrary metadata exposed to templates under `spec.*`.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Steps for both channels, in render order.
    pub steps: Vec<RenderStep>,
}

impl TemplateSpec {
    /// Decodes a template spec from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::InvalidTemplateSpec`] if the JSON does not decode.
    pub fn from_json(json: &str) -> PromptResult<Self> {
        serde_json::from_str(json).map_err(|err| PromptError::InvalidTemplateSpec {
            reason: err.to_string(),
        })
    }

    /// Steps belonging to one channel, in order.
    #[must_use]
    pub fn steps_for(&self, channel: Channel) -> Vec<RenderStep> {
        self.steps
            .iter()
            .filter(|step| step.channel == channel)
            .cloned()
            .collect()
    }

    /// The built-in architect template.
    #[must_use]
    pub fn architect() -> Self {
        use Channel::{System, User};

        let mut metadata = Map::new();
        metadata.insert(
            "role".into(),
            Value::from(
                "You are a senior prompt architect. You turn short briefs into complete, \
                 unambiguous instructions for another language model.",
            ),
        );
        metadata.insert(
            "principles".into(),
            json!([
                "State the goal, audience, and success criteria explicitly.",
                "Fill gaps with reasonable, clearly labelled assumptions.",
                "Specify structure, length, and tone so the output is checkable.",
                "Never answer the brief yourself; write the instruction that will."
            ]),
        );

        let steps = vec![
            RenderStep::new("role", System, "{{spec.role}}"),
            RenderStep::new("principles", System, "Principles:\n{{spec.principlesList}}")
                .when(Condition::truthy("spec.principles")),
            RenderStep::new(
                "output-type",
                System,
                "Target output: {{outputType.label}}. {{outputType.guidance}}",
            ),
            RenderStep::new("tone", System, "Tone: {{tone.label}}. {{tone.guidance}}")
                .when(Condition::new("tone.id", Operator::Exists)),
            RenderStep::new("length", System, "Length: {{length.label}}. {{length.guidance}}")
                .when(Condition::new("length.id", Operator::Exists)),
            RenderStep::new("format", System, "Format: {{format.label}}. {{format.guidance}}")
                .when(Condition::new("format.id", Operator::Exists)),
            RenderStep::new(
                "reverse-prompting",
                System,
                "Reverse prompting: {{toggles.reversePromptingLabel}}. If the brief is vague or \
                 shorter than a full sentence, first restate it as a refined task, then expand \
                 the refined task.",
            )
            .when(Condition::truthy("toggles.reversePrompting")),
            RenderStep::new(
                "enrichment",
                System,
                "Enrichment: {{toggles.enrichmentLabel}}. Add the audience, context, constraints, \
                 and success criteria the brief implies but does not state.",
            )
            .when(Condition::truthy("toggles.enrichment")),
            RenderStep::new(
                "examples",
                System,
                "Include one short example of the expected output inside the instruction.",
            )
            .when(Condition::truthy("toggles.includeExamples")),
            RenderStep::new(
                "prompt-spec",
                System,
                "Structured requirements:\nGoal: {{promptSpec.intent.primary_goal}}\n\
                 Audience: {{promptSpec.audience.primary}}\n\
                 Success criteria:\n{{promptSpec.intent.success_criteriaList}}\n\
                 Must include:\n{{promptSpec.quality.must_includeList}}\n\
                 Forbidden:\n{{promptSpec.constraints.forbiddenList}}",
            )
            .when(Condition::new("promptSpec.intent.primary_goal", Operator::Exists)),
            RenderStep::new(
                "type-specific",
                System,
                "Type-specific requirements (JSON): {{typeSpecific}}",
            )
            .when(Condition::truthy("typeSpecific")),
            RenderStep::new(
                "strip-meta",
                System,
                "Output only the instruction itself. Do not add commentary about how it was written.",
            )
            .when(Condition::truthy("toggles.stripMetaCommentary")),
            RenderStep::new("brief", User, "Brief:\n{{userInput}}"),
            RenderStep::new("notes", User, "Additional notes:\n{{notes}}")
                .when(Condition::new("notes", Operator::Exists)),
        ];

        Self {
            id: FALLBACK_SPEC_ID.to_owned(),
            version: "1.0.0".to_owned(),
            name: "Blueprint architect".to_owned(),
            metadata,
            steps,
        }
    }
}

/// Lookup table of template specs with an optional registry-level default.
#[derive(Clone, Debug, Default)]
pub struct SpecRegistry {
    specs: HashMap<String, TemplateSpec>,
    default_id: Option<String>,
}

impl SpecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in architect template.
    #[must_use]
    pub fn standard() -> Self {
        Self::new().with_spec(TemplateSpec::architect())
    }

    /// Registers a spec, replacing any spec with the same id.
    #[must_use]
    pub fn with_spec(mut self, spec: TemplateSpec) -> Self {
        self.specs.insert(spec.id.clone(), spec);
        self
    }

    /// Sets the registry-level default id.
    #[must_use]
    pub fn with_default(mut self, id: impl Into<String>) -> Self {
        self.default_id = Some(id.into());
        self
    }

    /// Looks up a spec by exact id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TemplateSpec> {
        self.specs.get(id)
    }

    /// Resolves `requested`, then the registry default, then [`FALLBACK_SPEC_ID`].
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::SpecNotFound`] when none of the candidates exist.
    pub fn resolve(&self, requested: Option<&str>) -> PromptResult<&TemplateSpec> {
        if let Some(id) = requested {
            if let Some(spec) = self.get(id) {
                return Ok(spec);
            }
            warn!(spec_id = id, "template spec not registered; falling back");
        }

        self.default_id
            .as_deref()
            .and_then(|id| self.get(id))
            .or_else(|| self.get(FALLBACK_SPEC_ID))
            .ok_or_else(|| PromptError::SpecNotFound {
                id: requested.unwrap_or(FALLBACK_SPEC_ID).to_owned(),
            })
    }
}
