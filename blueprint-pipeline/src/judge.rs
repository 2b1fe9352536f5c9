//! Judge phase: scoring an executed blueprint against a fixed rubric.
//!
//! A single evaluator or a two-persona committee scores four dimensions on a
//! 0 to 10 scale. Committee scores are averaged. Judge failures never escape;
//! they become a zero-score evaluation whose summary carries the error.

use std::fmt::Write as _;

use blueprint_adapters::{ModelCaller, ModelRequest, parse_json_response};
use blueprint_primitives::RubricEnforcement;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// Scores for the four rubric dimensions, each in `0..=10`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dimensions {
    /// How closely the output follows the blueprint's instructions.
    #[serde(deserialize_with = "score")]
    pub instruction_adherence: f64,
    /// Substantive quality of the output.
    #[serde(deserialize_with = "score")]
    pub task_quality: f64,
    /// Structure and formatting.
    #[serde(deserialize_with = "score")]
    pub structure_format: f64,
    /// Fit of tone to the audience.
    #[serde(deserialize_with = "score")]
    pub tone_audience: f64,
}

/// Accepts a JSON number or a numeric string such as `"8"` or `" 7.5 "`.
fn score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("score `{text}` is not a number"))),
    }
}

impl Dimensions {
    fn values(self) -> [f64; 4] {
        [
            self.instruction_adherence,
            self.task_quality,
            self.structure_format,
            self.tone_audience,
        ]
    }

    /// Unweighted mean rounded to one decimal.
    #[must_use]
    pub fn composite(self) -> f64 {
        round_one(self.values().iter().sum::<f64>() / 4.0)
    }

    /// Element-wise mean of two score sets.
    #[must_use]
    pub fn averaged(self, other: Self) -> Self {
        Self {
            instruction_adherence: (self.instruction_adherence + other.instruction_adherence) / 2.0,
            task_quality: (self.task_quality + other.task_quality) / 2.0,
            structure_format: (self.structure_format + other.structure_format) / 2.0,
            tone_audience: (self.tone_audience + other.tone_audience) / 2.0,
        }
    }

    fn clamped(self) -> Self {
        let clamp = |score: f64| if score.is_finite() { score.clamp(0.0, 10.0) } else { 0.0 };
        Self {
            instruction_adherence: clamp(self.instruction_adherence),
            task_quality: clamp(self.task_quality),
            structure_format: clamp(self.structure_format),
            tone_audience: clamp(self.tone_audience),
        }
    }
}

/// One justification per dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Justifications {
    pub instruction_adherence: String,
    pub task_quality: String,
    pub structure_format: String,
    pub tone_audience: String,
}

impl Justifications {
    fn attributed(&self, other: &Self, first: &str, second: &str) -> Self {
        let join = |a: &str, b: &str| format!("[{first}] {a} / [{second}] {b}");
        Self {
            instruction_adherence: join(&self.instruction_adherence, &other.instruction_adherence),
            task_quality: join(&self.task_quality, &other.task_quality),
            structure_format: join(&self.structure_format, &other.structure_format),
            tone_audience: join(&self.tone_audience, &other.tone_audience),
        }
    }
}

/// Final judge verdict for one cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeEvaluation {
    /// Dimension scores (averaged in committee mode).
    pub dimensions: Dimensions,
    /// Per-dimension reasoning.
    pub justifications: Justifications,
    /// Overall score, one decimal.
    pub composite: f64,
    /// Short verdict, or the failure message for zero-score evaluations.
    pub summary: String,
    /// Whether two judges contributed.
    pub dual_judge: bool,
    /// Scoring discipline the judges were given.
    pub rubric_enforcement: RubricEnforcement,
}

impl JudgeEvaluation {
    /// All-zero evaluation carrying `reason` as the summary.
    #[must_use]
    pub fn zero(reason: impl Into<String>, dual_judge: bool, rubric: RubricEnforcement) -> Self {
        Self {
            dimensions: Dimensions::default(),
            justifications: Justifications::default(),
            composite: 0.0,
            summary: reason.into(),
            dual_judge,
            rubric_enforcement: rubric,
        }
    }
}

/// Human-scored reference output used to calibrate judges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineExample {
    /// Reference score, `0..=10`.
    pub score: f64,
    /// Optional display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Inline content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Kind of content, e.g. `text` or `image`.
    pub content_type: String,
    /// Link to the content when it is not inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

/// Judge phase settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    /// Run the judge phase at all.
    pub enabled: bool,
    /// Use the two-persona committee.
    pub dual: bool,
    /// Scoring discipline.
    pub rubric: RubricEnforcement,
    /// Calibration examples, any order.
    pub baselines: Vec<BaselineExample>,
}

/// Evaluator persona.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JudgePersona {
    /// Lone evaluator.
    Single,
    /// Committee member focused on correctness.
    Accuracy,
    /// Committee member focused on readability.
    Style,
}

impl JudgePersona {
    /// Attribution tag used in committee justifications.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Single => "Judge",
            Self::Accuracy => "Accuracy Judge",
            Self::Style => "Style Judge",
        }
    }

    fn brief(self) -> &'static str {
        match self {
            Self::Single => {
                "You are an impartial evaluator of AI-generated content. Score the output \
                 against the blueprint that produced it."
            }
            Self::Accuracy => {
                "You are a strict evaluator focused on accuracy. Check every explicit \
                 requirement in the blueprint and penalise omissions, factual errors, and \
                 instructions that were ignored."
            }
            Self::Style => {
                "You are an evaluator focused on style and readability. Judge clarity, flow, \
                 structure, and whether the tone suits the intended audience."
            }
        }
    }
}

fn rubric_modifier(rubric: RubricEnforcement) -> &'static str {
    match rubric {
        RubricEnforcement::Lenient => {
            "Rubric enforcement: LENIENT. Give partial credit when the intent is met even if \
             details differ from the blueprint."
        }
        RubricEnforcement::Standard => {
            "Rubric enforcement: STANDARD. Score each dimension as the rubric describes."
        }
        RubricEnforcement::Strict => {
            "Rubric enforcement: STRICT. Deduct for every missed or partially met requirement. \
             Reserve 9 and 10 for flawless work."
        }
    }
}

const JUDGE_CONTRACT: &str = "Respond with JSON only, exactly in this shape:\n\
{\"dimensions\": {\"instructionAdherence\": 0-10, \"taskQuality\": 0-10, \
\"structureFormat\": 0-10, \"toneAudience\": 0-10}, \
\"justifications\": {\"instructionAdherence\": \"...\", \"taskQuality\": \"...\", \
\"structureFormat\": \"...\", \"toneAudience\": \"...\"}, \
\"composite\": 0-10, \"summary\": \"...\"}";

/// Everything the judge needs to see.
#[derive(Clone, Copy, Debug)]
pub struct JudgeInput<'a> {
    /// The user's original brief.
    pub brief: &'a str,
    /// Blueprint produced by the architect.
    pub blueprint: &'a str,
    /// Output produced by the executor.
    pub output: &'a str,
    /// Calibration examples.
    pub baselines: &'a [BaselineExample],
}

/// Builds the `(system, user)` prompt pair for one persona.
#[must_use]
pub fn build_judge_prompt(
    input: &JudgeInput<'_>,
    persona: JudgePersona,
    rubric: RubricEnforcement,
) -> (String, String) {
    let system = format!("{}\n\n{}\n\n{JUDGE_CONTRACT}", persona.brief(), rubric_modifier(rubric));

    let mut user = format!(
        "Original request:\n{}\n\nBlueprint:\n{}\n\nGenerated output:\n{}",
        input.brief.trim(),
        input.blueprint.trim(),
        input.output.trim()
    );

    let mut baselines: Vec<&BaselineExample> = input.baselines.iter().collect();
    baselines.sort_by(|a, b| a.score.total_cmp(&b.score));
    if !baselines.is_empty() {
        user.push_str("\n\nCalibration examples scored by humans (lowest first):");
        for baseline in baselines {
            let label = baseline.label.as_deref().unwrap_or("untitled");
            let body = baseline
                .content
                .as_deref()
                .or(baseline.file_url.as_deref())
                .unwrap_or("(no content)");
            let _ = write!(
                user,
                "\n- Score {:.1} ({label}, {}): {body}",
                baseline.score, baseline.content_type
            );
        }
    }

    (system, user)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEvaluation {
    dimensions: Dimensions,
    justifications: Justifications,
    composite: Option<f64>,
    summary: String,
}

/// Parses a judge response. A missing `composite` is derived from the dimensions.
///
/// # Errors
///
/// Returns [`PipelineError::Parse`] when the text holds no JSON and
/// [`PipelineError::Shape`] when the JSON does not follow the judge contract.
pub fn parse_evaluation(text: &str, rubric: RubricEnforcement) -> PipelineResult<JudgeEvaluation> {
    let value = parse_json_response(text).map_err(|source| PipelineError::Parse {
        stage: "judge",
        source,
    })?;
    let raw: RawEvaluation = serde_json::from_value(value).map_err(|source| PipelineError::Shape {
        stage: "judge",
        source,
    })?;

    let dimensions = raw.dimensions.clamped();
    let composite = raw
        .composite
        .filter(|c| c.is_finite())
        .map_or_else(|| dimensions.composite(), |c| round_one(c.clamp(0.0, 10.0)));

    Ok(JudgeEvaluation {
        dimensions,
        justifications: raw.justifications,
        composite,
        summary: raw.summary,
        dual_judge: false,
        rubric_enforcement: rubric,
    })
}

/// Combines two committee verdicts: dimensions averaged, composite recomputed.
#[must_use]
pub fn combine(accuracy: &JudgeEvaluation, style: &JudgeEvaluation) -> JudgeEvaluation {
    let dimensions = accuracy.dimensions.averaged(style.dimensions);
    let first = JudgePersona::Accuracy.tag();
    let second = JudgePersona::Style.tag();
    JudgeEvaluation {
        dimensions,
        justifications: accuracy
            .justifications
            .attributed(&style.justifications, first, second),
        composite: dimensions.composite(),
        summary: format!("[{first}] {} / [{second}] {}", accuracy.summary, style.summary),
        dual_judge: true,
        rubric_enforcement: accuracy.rubric_enforcement,
    }
}

/// Runs the judge phase. Never fails: errors become a zero-score evaluation.
///
/// `template` supplies the model id, credentials, and cancellation token.
pub async fn judge_output(
    caller: &dyn ModelCaller,
    template: &ModelRequest,
    input: &JudgeInput<'_>,
    settings: &JudgeSettings,
) -> JudgeEvaluation {
    let outcome = if settings.dual {
        let accuracy = ask(caller, template, input, JudgePersona::Accuracy, settings.rubric);
        let style = ask(caller, template, input, JudgePersona::Style, settings.rubric);
        match tokio::join!(accuracy, style) {
            (Ok(a), Ok(s)) => Ok(combine(&a, &s)),
            (Err(err), _) | (_, Err(err)) => Err(err),
        }
    } else {
        ask(caller, template, input, JudgePersona::Single, settings.rubric).await
    };

    outcome.unwrap_or_else(|err| {
        warn!(error = %err, dual = settings.dual, "judge phase failed; recording zero score");
        JudgeEvaluation::zero(err.to_string(), settings.dual, settings.rubric)
    })
}

async fn ask(
    caller: &dyn ModelCaller,
    template: &ModelRequest,
    input: &JudgeInput<'_>,
    persona: JudgePersona,
    rubric: RubricEnforcement,
) -> PipelineResult<JudgeEvaluation> {
    let (system, user) = build_judge_prompt(input, persona, rubric);
    let request = ModelRequest {
        user_prompt: user,
        system_prompt: Some(system),
        json_mode: true,
        ..template.clone()
    };
    let text = caller
        .call(request)
        .await
        .map_err(PipelineError::model("judge"))?;
    let evaluation = parse_evaluation(&text, rubric)?;
    debug!(persona = persona.tag(), composite = evaluation.composite, "judge scored output");
    Ok(evaluation)
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
