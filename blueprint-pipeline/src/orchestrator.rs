//! Single-prompt pipeline: analysis, overrides, validation, generation.

use std::sync::Arc;

use blueprint_adapters::extract::{Strategy, first_match, string_at_paths};
use blueprint_adapters::{Credentials, ModelCaller, ModelRequest, parse_json_response};
use blueprint_primitives::OutputType;
use blueprint_prompts::{PlanParams, PromptAssembler, infer_settings};
use blueprint_spec::{
    ConstraintsPatch, InferredPatch, PromptSpec, SpecUpdate, ValidationReport, ValidatorRegistry,
    create_empty_spec, merge_spec,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};

const OVERRIDE_REASON: &str = "caller override";

const ANALYSIS_PROMPT: &str = "You analyse a user's request for written or generated content and \
describe it as a structured Prompt Spec. Respond with one JSON object using these keys, leaving \
anything you cannot infer empty:\n\
{\n\
  \"intent\": {\"primary_goal\": string, \"success_criteria\": [string], \"action_desired\": string, \"urgency\": \"low\"|\"normal\"|\"high\"|\"critical\"},\n\
  \"audience\": {\"primary\": string, \"secondary\": string, \"expertise_level\": \"beginner\"|\"intermediate\"|\"advanced\"|\"expert\"|\"mixed\", \"relationship\": string, \"expectations\": [string]},\n\
  \"context\": {\"setting\": string, \"prior_knowledge\": [string], \"related_materials\": [string], \"cultural_notes\": string},\n\
  \"constraints\": {\"length\": \"short\"|\"medium\"|\"long\"|\"custom\", \"tone_markers\": [string], \"format_requirements\": [string], \"forbidden\": [string]},\n\
  \"quality\": {\"must_include\": [string], \"nice_to_have\": [string], \"differentiation\": string, \"anti_patterns\": [string]},\n\
  \"inferred\": {\"tone\": string, \"format\": string, \"length\": string, \"reasoning\": {string: string}}\n\
}";

const GENERATION_CONTRACT: &str = "Return one JSON object and nothing else:\n\
{\"expanded_prompt\": string, \"structure_summary\": string, \"key_elements\": [string]}";

/// Caller adjustments folded into the analysed spec.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecOverrides {
    /// Tone id.
    pub tone: Option<String>,
    /// Format id.
    pub format: Option<String>,
    /// Length id; also sets `constraints.length`.
    pub length: Option<String>,
    /// Structured patch for any other part of the spec.
    pub update: SpecUpdate,
}

impl SpecOverrides {
    /// Returns `true` when nothing would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tone.is_none() && self.format.is_none() && self.length.is_none() && self.update.is_empty()
    }

    /// Flattens the overrides into a single [`SpecUpdate`].
    #[must_use]
    pub fn to_update(&self) -> SpecUpdate {
        let mut update = self.update.clone();
        if self.tone.is_none() && self.format.is_none() && self.length.is_none() {
            return update;
        }

        let inferred = update.inferred.get_or_insert_with(InferredPatch::default);
        for (key, value, slot) in [
            ("tone", &self.tone, &mut inferred.tone),
            ("format", &self.format, &mut inferred.format),
            ("length", &self.length, &mut inferred.length),
        ] {
            if let Some(value) = value {
                *slot = Some(value.clone());
                inferred.reasoning.insert(key.to_owned(), OVERRIDE_REASON.to_owned());
            }
        }
        if let Some(length) = &self.length {
            update
                .constraints
                .get_or_insert_with(ConstraintsPatch::default)
                .length = Some(length.clone());
        }
        update
    }
}

/// Pipeline stages in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Brief → Prompt Spec.
    Analysis,
    /// Caller overrides merged in.
    Overrides,
    /// Non-fatal spec checks.
    Validation,
    /// Prompt Spec → expanded prompt.
    Generation,
    /// Reserved for post-generation review.
    Quality,
}

/// What happened to a stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage ran.
    Completed,
    /// The stage was not needed or is not implemented.
    Skipped,
}

/// One entry of the stage log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage.
    pub stage: StageName,
    /// Outcome.
    pub status: StageStatus,
    /// Short note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageRecord {
    fn completed(stage: StageName) -> Self {
        Self { stage, status: StageStatus::Completed, detail: None }
    }

    fn skipped(stage: StageName, detail: &str) -> Self {
        Self { stage, status: StageStatus::Skipped, detail: Some(detail.to_owned()) }
    }
}

/// Result of the generation stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedPrompt {
    /// The final prompt text.
    pub expanded_prompt: String,
    /// One-paragraph outline of the prompt's structure.
    pub structure_summary: String,
    /// Elements the prompt insists on.
    pub key_elements: Vec<String>,
}

/// Input to [`PipelineOrchestrator::run`].
#[derive(Clone, Debug, Default)]
pub struct PipelineInput {
    /// Raw user brief.
    pub brief: String,
    /// Requested output type; inferred from the brief when unset.
    pub output_type: Option<OutputType>,
    /// Skip analysis and start from this spec.
    pub existing_spec: Option<PromptSpec>,
    /// Caller overrides.
    pub overrides: SpecOverrides,
    /// Checked before each model call.
    pub cancel: CancellationToken,
}

impl PipelineInput {
    /// Input for a brief with every option unset.
    #[must_use]
    pub fn new(brief: impl Into<String>) -> Self {
        Self { brief: brief.into(), ..Self::default() }
    }
}

/// Output of a full pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Spec after overrides.
    pub spec: PromptSpec,
    /// Validation findings for `spec`.
    pub validation: ValidationReport,
    /// Generated prompt.
    pub generated: GeneratedPrompt,
    /// Stage log in execution order.
    pub stages: Vec<StageRecord>,
}

/// Runs the single-prompt pipeline against one model.
pub struct PipelineOrchestrator {
    caller: Arc<dyn ModelCaller>,
    model_id: String,
    credentials: Credentials,
    assembler: PromptAssembler,
    validators: ValidatorRegistry,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Orchestrator with the standard assembler and validators.
    #[must_use]
    pub fn new(caller: Arc<dyn ModelCaller>, model_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            caller,
            model_id: model_id.into(),
            credentials,
            assembler: PromptAssembler::standard(),
            validators: ValidatorRegistry::standard(),
        }
    }

    /// Replaces the prompt assembler.
    #[must_use]
    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Replaces the per-type validators.
    #[must_use]
    pub fn with_validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    /// Runs every stage.
    ///
    /// # Errors
    ///
    /// Fails when the analysis or generation model call fails, or when prompt
    /// assembly fails. Validation problems are reported, never raised.
    pub async fn run(&self, input: &PipelineInput) -> PipelineResult<PipelineOutput> {
        let mut stages = Vec::with_capacity(5);

        let spec = match &input.existing_spec {
            Some(spec) => {
                stages.push(StageRecord::skipped(StageName::Analysis, "existing spec supplied"));
                spec.clone()
            }
            None => {
                let spec = self.analyse(input).await?;
                stages.push(StageRecord::completed(StageName::Analysis));
                spec
            }
        };

        let spec = if input.overrides.is_empty() {
            stages.push(StageRecord::skipped(StageName::Overrides, "no overrides"));
            spec
        } else {
            stages.push(StageRecord::completed(StageName::Overrides));
            merge_spec(&spec, &input.overrides.to_update())
        };

        let validation = self.validators.validate(&spec);
        for warning in &validation.warnings {
            warn!(warning = %warning, "prompt spec warning");
        }
        for error in &validation.errors {
            warn!(error = %error, "prompt spec invalid; continuing");
        }
        stages.push(StageRecord::completed(StageName::Validation));

        let generated = self.generate(&input.brief, &spec, &input.cancel).await?;
        stages.push(StageRecord::completed(StageName::Generation));
        stages.push(StageRecord::skipped(StageName::Quality, "not implemented"));

        info!(output_type = %spec.output_type, valid = validation.valid, "pipeline finished");
        Ok(PipelineOutput { spec, validation, generated, stages })
    }

    /// Runs only the analysis stage.
    ///
    /// # Errors
    ///
    /// Fails when the model call fails.
    pub async fn run_analysis_only(&self, input: &PipelineInput) -> PipelineResult<PromptSpec> {
        self.analyse(input).await
    }

    /// Runs only the generation stage against a ready spec.
    ///
    /// # Errors
    ///
    /// Fails when prompt assembly or the model call fails.
    pub async fn run_generation_only(
        &self,
        brief: &str,
        spec: &PromptSpec,
        cancel: &CancellationToken,
    ) -> PipelineResult<GeneratedPrompt> {
        self.generate(brief, spec, cancel).await
    }

    fn request(&self, cancel: &CancellationToken) -> ModelRequest {
        ModelRequest::new(self.model_id.clone(), String::new())
            .with_credentials(self.credentials.clone())
            .with_cancellation(cancel.clone())
    }

    async fn analyse(&self, input: &PipelineInput) -> PipelineResult<PromptSpec> {
        let brief = input.brief.trim();
        let output_type = input
            .output_type
            .or_else(|| infer_settings(brief).output_type.map(|detected| detected.value))
            .unwrap_or_default();
        debug!(%output_type, "running analysis");

        let request = ModelRequest {
            user_prompt: format!("Output type: {output_type}\n\nRequest:\n{brief}"),
            system_prompt: Some(ANALYSIS_PROMPT.to_owned()),
            json_mode: true,
            ..self.request(&input.cancel)
        };
        let response = self
            .caller
            .call(request)
            .await
            .map_err(PipelineError::model("analysis"))?;

        Ok(spec_from_analysis(&response, brief, output_type))
    }

    async fn generate(
        &self,
        brief: &str,
        spec: &PromptSpec,
        cancel: &CancellationToken,
    ) -> PipelineResult<GeneratedPrompt> {
        let params = PlanParams {
            prompt_spec: Some(spec.clone()),
            ..PlanParams::new(brief)
        };
        let plan = self.assembler.plan(&params)?;
        debug!(spec_id = %plan.spec_id, "running generation");

        let request = ModelRequest {
            user_prompt: plan.user_prompt,
            system_prompt: Some(format!("{}\n\n{GENERATION_CONTRACT}", plan.system_prompt.trim_end())),
            json_mode: true,
            ..self.request(cancel)
        };
        let response = self
            .caller
            .call(request)
            .await
            .map_err(PipelineError::model("generation"))?;

        Ok(generated_from_response(&response))
    }
}

/// Builds a spec from an analysis response.
///
/// Missing and `null` fields default; `version` and `outputType` are pinned.
/// A response that is not a usable spec yields an empty spec whose goal is
/// the brief.
#[must_use]
pub fn spec_from_analysis(response: &str, brief: &str, output_type: OutputType) -> PromptSpec {
    let fallback = || {
        let mut spec = create_empty_spec(output_type);
        spec.intent.primary_goal = brief.trim().to_owned();
        spec
    };

    let mut value = match parse_json_response(response).map(without_nulls) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            warn!("analysis response is not a JSON object; using the brief as the goal");
            return fallback();
        }
        Err(err) => {
            warn!(error = %err, "analysis response is not JSON; using the brief as the goal");
            return fallback();
        }
    };
    if let Some(object) = value.as_object_mut() {
        object.remove("version");
        object.remove("outputType");
        object.remove("output_type");
    }

    match PromptSpec::from_value(value) {
        Ok(parsed) => {
            let pinned = create_empty_spec(output_type);
            PromptSpec {
                version: pinned.version,
                output_type,
                ..parsed
            }
        }
        Err(err) => {
            warn!(error = %err, "analysis response does not match the Prompt Spec shape");
            fallback()
        }
    }
}

/// Drops `null` object entries and array items at every depth.
fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items.into_iter().filter(|v| !v.is_null()).map(without_nulls).collect(),
        ),
        other => other,
    }
}

/// Reads a generation response, falling back to the raw text as the prompt.
#[must_use]
pub fn generated_from_response(response: &str) -> GeneratedPrompt {
    let strategies: [Strategy<str, GeneratedPrompt>; 2] = [
        |text| {
            let value = parse_json_response(text).ok()?;
            let expanded_prompt = string_at_paths(&value, &["expanded_prompt", "expandedPrompt"])?;
            let mut generated: GeneratedPrompt = serde_json::from_value(value).unwrap_or_default();
            generated.expanded_prompt = expanded_prompt;
            Some(generated)
        },
        |text| {
            Some(GeneratedPrompt {
                expanded_prompt: text.trim().to_owned(),
                ..GeneratedPrompt::default()
            })
        },
    ];
    first_match(response, &strategies).unwrap_or_default()
}
