//! Binds a template spec, an optional Prompt Spec, and UI controls into a
//! concrete system/user prompt pair.

use std::sync::Arc;

use blueprint_primitives::{Catalog, Descriptor, OutputType};
use blueprint_spec::{PromptSpec, TypeSpecific};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::PromptResult;
use crate::inference::{auto_detected_note, infer_settings};
use crate::registry::SpecRegistry;
use crate::template::{Channel, StepTrace, build_blocks, value_to_text};

/// Boolean switches exposed to templates as `toggles.*`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Toggles {
    /// Restate vague briefs as a refined task before expanding them.
    pub reverse_prompting: bool,
    /// Fill in implied audience, context, and success criteria.
    pub enrichment: bool,
    /// Suppress commentary about the prompt, including auto-detection notes.
    pub strip_meta_commentary: bool,
    /// Ask for an inline example of the expected output.
    pub include_examples: bool,
}

impl Toggles {
    fn to_context(self) -> Value {
        let mut map = Map::new();
        for (name, enabled) in [
            ("reversePrompting", self.reverse_prompting),
            ("enrichment", self.enrichment),
            ("stripMetaCommentary", self.strip_meta_commentary),
            ("includeExamples", self.include_examples),
        ] {
            map.insert(name.to_owned(), Value::Bool(enabled));
            map.insert(
                format!("{name}Label"),
                Value::from(if enabled { "ENABLED" } else { "DISABLED" }),
            );
        }
        Value::Object(map)
    }
}

/// Caller inputs for one prompt plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanParams {
    /// Template spec to use; falls back to the registry default.
    pub spec_id: Option<String>,
    /// Raw user brief.
    pub user_input: String,
    /// Free-form notes appended to the brief.
    pub notes: String,
    /// Tone id.
    pub tone: Option<String>,
    /// Length id.
    pub length: Option<String>,
    /// Format id.
    pub format: Option<String>,
    /// Explicit output type.
    pub output_type: Option<OutputType>,
    /// UI switches.
    pub toggles: Toggles,
    /// Explicit type-specific attributes.
    pub type_specific: Option<TypeSpecific>,
    /// Structured spec to bind, if the caller already has one.
    pub prompt_spec: Option<PromptSpec>,
}

impl PlanParams {
    /// Params for a brief with every control left unset.
    #[must_use]
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }
}

/// Concrete prompts plus the data needed to audit how they were built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptPlan {
    /// Template spec that produced the plan.
    pub spec_id: String,
    /// Version of that template spec.
    pub spec_version: String,
    /// Rendered system prompt.
    pub system_prompt: String,
    /// Rendered user prompt.
    pub user_prompt: String,
    /// System steps followed by user steps.
    pub step_trace: Vec<StepTrace>,
    /// The flat context the templates were rendered against.
    pub context_snapshot: Value,
}

/// Builds a prompt plan for `params`.
///
/// # Errors
///
/// Returns [`crate::PromptError::SpecNotFound`] when no template spec resolves.
pub fn build_prompt_plan(
    params: &PlanParams,
    registry: &SpecRegistry,
    catalog: &Catalog,
) -> PromptResult<PromptPlan> {
    let template = registry.resolve(params.spec_id.as_deref())?;
    let user_input = params.user_input.trim();
    let bound = params.prompt_spec.as_ref();

    // Explicit controls win over values carried by a bound Prompt Spec.
    let output_type = params
        .output_type
        .or(bound.map(|spec| spec.output_type))
        .unwrap_or_default();
    let tone = params.tone.clone().or_else(|| bound.and_then(|s| s.inferred.tone.clone()));
    let length = params.length.clone().or_else(|| bound.and_then(|s| s.inferred.length.clone()));
    let format = params.format.clone().or_else(|| bound.and_then(|s| s.inferred.format.clone()));
    let type_specific = params
        .type_specific
        .clone()
        .or_else(|| bound.and_then(|s| s.type_specific.clone()));

    let mut context = Map::new();
    context.insert("userInput".into(), Value::from(user_input));
    context.insert("notes".into(), Value::from(params.notes.trim()));
    context.insert(
        "outputType".into(),
        catalog
            .output_type(output_type)
            .cloned()
            .unwrap_or_else(|| Descriptor::unknown(output_type.as_str()))
            .to_value(),
    );
    context.insert("tone".into(), axis_value(tone.as_deref(), |id| catalog.tone(id)));
    context.insert("length".into(), axis_value(length.as_deref(), |id| catalog.length(id)));
    context.insert("format".into(), axis_value(format.as_deref(), |id| catalog.format(id)));
    context.insert("toggles".into(), params.toggles.to_context());

    let mut spec_meta = template.metadata.clone();
    spec_meta.insert("id".into(), Value::from(template.id.as_str()));
    spec_meta.insert("version".into(), Value::from(template.version.as_str()));
    spec_meta.insert("name".into(), Value::from(template.name.as_str()));
    context.insert("spec".into(), with_list_keys(Value::Object(spec_meta)));

    if let Some(spec) = bound {
        let value = serde_json::to_value(spec).unwrap_or(Value::Null);
        context.insert("promptSpec".into(), with_list_keys(value));
    }
    context.insert(
        "typeSpecific".into(),
        type_specific
            .as_ref()
            .and_then(|ts| serde_json::to_value(ts).ok())
            .unwrap_or(Value::Null),
    );

    let context = Value::Object(context);
    let system = build_blocks(&template.steps_for(Channel::System), &context);
    let user = build_blocks(&template.steps_for(Channel::User), &context);

    let user_prompt = if user.text.trim().is_empty() {
        user_input.to_owned()
    } else {
        user.text
    };

    debug!(
        spec_id = %template.id,
        output_type = %output_type,
        system_steps = system.trace.iter().filter(|t| t.included).count(),
        "prompt plan assembled"
    );

    let mut step_trace = system.trace;
    step_trace.extend(user.trace);

    Ok(PromptPlan {
        spec_id: template.id.clone(),
        spec_version: template.version.clone(),
        system_prompt: system.text,
        user_prompt,
        step_trace,
        context_snapshot: context,
    })
}

/// Builds a plan after guessing unset controls from the brief.
///
/// Inferred values sit under explicit ones: an explicit output type is never
/// replaced, and explicit type-specific fields overwrite inferred ones. Unless
/// `strip_meta_commentary` is on, the system prompt gains a note listing what
/// was auto-detected.
///
/// # Errors
///
/// Returns [`crate::PromptError::SpecNotFound`] when no template spec resolves.
pub fn build_prompt_plan_with_inference(
    params: &PlanParams,
    registry: &SpecRegistry,
    catalog: &Catalog,
) -> PromptResult<PromptPlan> {
    let settings = infer_settings(&params.user_input);
    let explicit_type = params
        .output_type
        .or(params.prompt_spec.as_ref().map(|spec| spec.output_type));

    let mut rows = Vec::new();
    let output_type = match (explicit_type, &settings.output_type) {
        (Some(explicit), _) => explicit,
        (None, Some(detected)) => {
            rows.push(("output type", detected.value.to_string(), detected.reason.clone()));
            detected.value
        }
        (None, None) => OutputType::default(),
    };

    let explicit_specific = params
        .type_specific
        .clone()
        .or_else(|| params.prompt_spec.as_ref().and_then(|s| s.type_specific.clone()));
    let type_specific = match (settings.type_specific(output_type), explicit_specific) {
        (Some(inferred), Some(explicit)) => {
            let merged = inferred.merged(&explicit);
            if merged != explicit {
                rows.extend(unchosen_rows(&settings.relevant_rows(output_type), &explicit));
            }
            Some(merged)
        }
        (Some(inferred), None) => {
            rows.extend(settings.relevant_rows(output_type));
            Some(inferred)
        }
        (None, explicit) => explicit,
    };

    let effective = PlanParams {
        output_type: Some(output_type),
        type_specific,
        ..params.clone()
    };
    let mut plan = build_prompt_plan(&effective, registry, catalog)?;

    if !params.toggles.strip_meta_commentary {
        if let Some(note) = auto_detected_note(&rows) {
            if plan.system_prompt.is_empty() {
                plan.system_prompt = note;
            } else {
                plan.system_prompt.push_str("\n\n");
                plan.system_prompt.push_str(&note);
            }
        }
    }

    Ok(plan)
}

/// Keeps only the inference rows whose field the explicit attributes left unset.
fn unchosen_rows(
    rows: &[(&'static str, String, String)],
    explicit: &TypeSpecific,
) -> Vec<(&'static str, String, String)> {
    let explicit = serde_json::to_value(explicit).unwrap_or(Value::Null);
    rows.iter()
        .filter(|(field, _, _)| {
            let key = field.replace(' ', "_");
            explicit.get(&key).is_none_or(Value::is_null)
        })
        .cloned()
        .collect()
}

fn axis_value<'a>(id: Option<&str>, lookup: impl Fn(&str) -> Option<&'a Descriptor>) -> Value {
    match id {
        Some(id) => lookup(id)
            .cloned()
            .unwrap_or_else(|| Descriptor::unknown(id))
            .to_value(),
        None => Value::Null,
    }
}

/// Adds a `<key>List` bullet string next to every array inside every object.
///
/// Templates cannot iterate, so lists are pre-formatted here.
fn with_list_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                if let Value::Array(items) = &value {
                    let bullets = items
                        .iter()
                        .map(|item| format!("- {}", value_to_text(Some(item))))
                        .collect::<Vec<_>>()
                        .join("\n");
                    out.insert(format!("{key}List"), Value::from(bullets));
                }
                out.insert(key, with_list_keys(value));
            }
            Value::Object(out)
        }
        other => other,
    }
}

/// Assembler bound to an immutable catalog and template registry.
#[derive(Clone, Debug)]
pub struct PromptAssembler {
    registry: Arc<SpecRegistry>,
    catalog: Arc<Catalog>,
}

impl PromptAssembler {
    /// Creates an assembler over the supplied registry and catalog.
    #[must_use]
    pub fn new(registry: Arc<SpecRegistry>, catalog: Arc<Catalog>) -> Self {
        Self { registry, catalog }
    }

    /// Assembler using the standard registry and catalog.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(Arc::new(SpecRegistry::standard()), Arc::new(Catalog::standard()))
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// See [`build_prompt_plan`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::PromptError::SpecNotFound`] when no template spec resolves.
    pub fn plan(&self, params: &PlanParams) -> PromptResult<PromptPlan> {
        build_prompt_plan(params, &self.registry, &self.catalog)
    }

    /// See [`build_prompt_plan_with_inference`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::PromptError::SpecNotFound`] when no template spec resolves.
    pub fn plan_with_inference(&self, params: &PlanParams) -> PromptResult<PromptPlan> {
        build_prompt_plan_with_inference(params, &self.registry, &self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use blueprint_spec::{CodeAttributes, create_empty_spec};
    use serde_json::json;

    use super::*;
    use crate::error::PromptError;
    use crate::registry::TemplateSpec;
    use crate::template::RenderStep;

    fn assembler() -> PromptAssembler {
        PromptAssembler::standard()
    }

    #[test]
    fn builds_architect_plan_with_controls() {
        let params = PlanParams {
            tone: Some("casual".into()),
            length: Some("short".into()),
            format: Some("email".into()),
            output_type: Some(OutputType::Email),
            toggles: Toggles {
                reverse_prompting: true,
                ..Toggles::default()
            },
            notes: "  mention the demo  ".into(),
            ..PlanParams::new("  write an email  ")
        };

        let plan = assembler().plan(&params).expect("plan");
        assert_eq!(plan.spec_id, "blueprint-architect");
        assert!(plan.system_prompt.contains("Tone: Casual."));
        assert!(plan.system_prompt.contains("Reverse prompting: ENABLED."));
        assert!(plan.system_prompt.contains("- State the goal"));
        assert!(!plan.system_prompt.contains("Enrichment"));
        assert_eq!(
            plan.user_prompt,
            "Brief:\nwrite an email\n\nAdditional notes:\nmention the demo"
        );
        assert_eq!(plan.context_snapshot["toggles"]["enrichmentLabel"], "DISABLED");
        assert_eq!(plan.context_snapshot["format"]["id"], "email");
    }

    #[test]
    fn unset_axes_skip_their_steps() {
        let plan = assembler().plan(&PlanParams::new("hello")).expect("plan");
        assert!(!plan.system_prompt.contains("Tone:"));
        let tone = plan.step_trace.iter().find(|t| t.id == "tone").unwrap();
        assert!(!tone.included);
        assert_eq!(plan.context_snapshot["tone"], Value::Null);
    }

    #[test]
    fn user_prompt_falls_back_to_trimmed_input() {
        let registry = SpecRegistry::new().with_spec(TemplateSpec {
            id: "bare".into(),
            version: "1".into(),
            name: String::new(),
            metadata: Map::new(),
            steps: vec![
                RenderStep::new("sys", Channel::System, "System {{spec.id}}"),
                RenderStep::new("empty", Channel::User, "{{missing}}"),
            ],
        });
        let params = PlanParams {
            spec_id: Some("bare".into()),
            ..PlanParams::new("  raw brief ")
        };

        let plan = build_prompt_plan(&params, &registry, &Catalog::standard()).expect("plan");
        assert_eq!(plan.system_prompt, "System bare");
        assert_eq!(plan.user_prompt, "raw brief");
    }

    #[test]
    fn missing_spec_is_an_error() {
        let err = build_prompt_plan(&PlanParams::new("x"), &SpecRegistry::new(), &Catalog::standard())
            .expect_err("no specs");
        assert!(matches!(err, PromptError::SpecNotFound { .. }));
    }

    #[test]
    fn bound_prompt_spec_exposes_lists() {
        let mut spec = create_empty_spec(OutputType::Article);
        spec.intent.primary_goal = "Explain lifetimes".into();
        spec.quality.must_include = vec!["an example".into(), "a diagram".into()];
        spec.inferred.tone = Some("authoritative".into());

        let params = PlanParams {
            prompt_spec: Some(spec),
            ..PlanParams::new("lifetimes article")
        };
        let plan = assembler().plan(&params).expect("plan");
        assert!(plan.system_prompt.contains("Goal: Explain lifetimes"));
        assert!(plan.system_prompt.contains("- an example\n- a diagram"));
        assert!(plan.system_prompt.contains("Tone: Authoritative."));
        assert_eq!(plan.context_snapshot["outputType"]["id"], "article");
    }

    #[test]
    fn list_keys_are_added_recursively() {
        let value = with_list_keys(json!({ "a": { "items": [1, "two"] } }));
        assert_eq!(value["a"]["itemsList"], "- 1\n- two");
        assert_eq!(value["a"]["items"], json!([1, "two"]));
    }

    #[test]
    fn inference_fills_unset_controls_and_notes_them() {
        let plan = assembler()
            .plan_with_inference(&PlanParams::new("A Rust function that parses CSV"))
            .expect("plan");
        assert_eq!(plan.context_snapshot["outputType"]["id"], "code");
        assert_eq!(plan.context_snapshot["typeSpecific"]["language"], "rust");
        assert!(plan.system_prompt.contains("Auto-detected settings"));
        assert!(plan.system_prompt.contains("- language: rust"));
    }

    #[test]
    fn explicit_values_win_over_inference() {
        let params = PlanParams {
            output_type: Some(OutputType::Code),
            type_specific: Some(TypeSpecific::Code(CodeAttributes {
                language: Some("python".into()),
                ..CodeAttributes::default()
            })),
            ..PlanParams::new("A Rust function that parses CSV")
        };
        let plan = assembler().plan_with_inference(&params).expect("plan");
        assert_eq!(plan.context_snapshot["typeSpecific"]["language"], "python");
        assert!(!plan.system_prompt.contains("Auto-detected settings"));
    }

    #[test]
    fn strip_meta_suppresses_detection_note() {
        let params = PlanParams {
            toggles: Toggles {
                strip_meta_commentary: true,
                ..Toggles::default()
            },
            ..PlanParams::new("write an email to follow up")
        };
        let plan = assembler().plan_with_inference(&params).expect("plan");
        assert_eq!(plan.context_snapshot["outputType"]["id"], "email");
        assert!(!plan.system_prompt.contains("Auto-detected settings"));
        assert!(plan.system_prompt.contains("Output only the instruction itself."));
    }
}
