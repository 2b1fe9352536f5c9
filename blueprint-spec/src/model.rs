//! Prompt Spec schema and zero-valued factories.

use std::collections::BTreeMap;

use blueprint_primitives::OutputType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SpecResult;
use crate::type_specific::TypeSpecific;

/// Current schema version. Specs carrying any other version may be stale.
pub const PROMPT_SPEC_VERSION: &str = "1.0";

/// Recognised values for [`Audience::expertise_level`].
pub const EXPERTISE_LEVELS: &[&str] = &["beginner", "intermediate", "advanced", "expert", "mixed"];

/// Recognised values for [`Constraints::length`].
pub const LENGTH_PREFERENCES: &[&str] = &["short", "medium", "long", "custom"];

/// Recognised values for [`Intent::urgency`].
pub const URGENCY_LEVELS: &[&str] = &["low", "normal", "high", "critical"];

/// What the requester is trying to achieve.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    /// One-sentence goal. Required for a valid spec.
    pub primary_goal: String,
    /// Observable criteria the output must meet.
    pub success_criteria: Vec<String>,
    /// What the reader should do after reading.
    pub action_desired: String,
    /// One of [`URGENCY_LEVELS`], or empty.
    pub urgency: String,
}

/// Who the output is for.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Audience {
    /// Primary readership.
    pub primary: String,
    /// Optional secondary readership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    /// One of [`EXPERTISE_LEVELS`], or empty.
    pub expertise_level: String,
    /// Relationship between author and reader.
    pub relationship: String,
    /// What the audience expects to get.
    pub expectations: Vec<String>,
}

/// Situational background.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextInfo {
    /// Where or when the output will be consumed.
    pub setting: String,
    /// Facts the audience already knows.
    pub prior_knowledge: Vec<String>,
    /// Documents or links the output relates to.
    pub related_materials: Vec<String>,
    /// Cultural or regional considerations.
    pub cultural_notes: String,
}

/// Hard limits on the output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// One of [`LENGTH_PREFERENCES`], or empty.
    pub length: String,
    /// Exact length requirement when `length` is `custom`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_specific: Option<String>,
    /// Words describing the desired tone.
    pub tone_markers: Vec<String>,
    /// Structural requirements.
    pub format_requirements: Vec<String>,
    /// Content that must not appear.
    pub forbidden: Vec<String>,
    /// Brand voice guidance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_voice: Option<String>,
}

/// Quality bar for the output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quality {
    /// Elements that must be present.
    pub must_include: Vec<String>,
    /// Elements that are welcome but optional.
    pub nice_to_have: Vec<String>,
    /// What makes this output stand out.
    pub differentiation: String,
    /// Patterns to avoid.
    pub anti_patterns: Vec<String>,
}

/// Values guessed by analysis, with the reasoning behind each guess.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inferred {
    /// Guessed tone id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Guessed format id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Guessed length id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    /// Reasoning keyed by field name.
    pub reasoning: BTreeMap<String, String>,
}

/// Versioned intermediate representation of a user's request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptSpec {
    /// Schema version, see [`PROMPT_SPEC_VERSION`].
    pub version: String,
    /// Target artefact kind.
    pub output_type: OutputType,
    /// Goal of the request.
    pub intent: Intent,
    /// Readership.
    pub audience: Audience,
    /// Situational background.
    pub context: ContextInfo,
    /// Hard limits.
    pub constraints: Constraints,
    /// Quality bar.
    pub quality: Quality,
    /// Attributes specific to `output_type`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_specific: Option<TypeSpecific>,
    /// Inferred values and reasoning.
    pub inferred: Inferred,
}

impl Default for PromptSpec {
    fn default() -> Self {
        create_empty_spec(OutputType::default())
    }
}

impl PromptSpec {
    /// Decodes a spec from JSON, filling absent fields with zero values.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpecError::Decode`] when the payload is not a valid spec
    /// (wrong field types or an unknown `outputType`).
    pub fn from_json(json: &str) -> SpecResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decodes a spec from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SpecError::Decode`] under the same conditions as
    /// [`PromptSpec::from_json`].
    pub fn from_value(value: Value) -> SpecResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Returns `true` when the spec was produced by the current schema.
    #[must_use]
    pub fn is_current_version(&self) -> bool {
        self.version == PROMPT_SPEC_VERSION
    }
}

/// Creates a zero-valued spec at the current version.
#[must_use]
pub fn create_empty_spec(output_type: OutputType) -> PromptSpec {
    PromptSpec {
        version: PROMPT_SPEC_VERSION.to_owned(),
        output_type,
        intent: Intent::default(),
        audience: Audience::default(),
        context: ContextInfo::default(),
        constraints: Constraints::default(),
        quality: Quality::default(),
        type_specific: None,
        inferred: Inferred::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spec_is_zero_valued() {
        let spec = create_empty_spec(OutputType::Email);
        assert_eq!(spec.version, PROMPT_SPEC_VERSION);
        assert_eq!(spec.output_type, OutputType::Email);
        assert!(spec.intent.primary_goal.is_empty());
        assert!(spec.inferred.reasoning.is_empty());
        assert!(spec.type_specific.is_none());
    }

    #[test]
    fn decodes_partial_json_with_defaults() {
        let spec = PromptSpec::from_json(
            r#"{
                "version": "1.0",
                "outputType": "code",
                "intent": { "primary_goal": "Parse CSV files" },
                "typeSpecific": { "kind": "code", "language": "rust" }
            }"#,
        )
        .expect("decode");

        assert_eq!(spec.output_type, OutputType::Code);
        assert_eq!(spec.intent.primary_goal, "Parse CSV files");
        assert!(spec.audience.expectations.is_empty());
        assert!(matches!(spec.type_specific, Some(TypeSpecific::Code(ref code)) if code.language.as_deref() == Some("rust")));
    }

    #[test]
    fn unknown_output_type_fails_decode() {
        assert!(PromptSpec::from_json(r#"{ "outputType": "podcast" }"#).is_err());
    }
}
