//! Deep-clone-then-patch merging for Prompt Specs.

use std::collections::BTreeMap;

use blueprint_primitives::OutputType;
use serde::{Deserialize, Serialize};

use crate::model::{Audience, Constraints, ContextInfo, Inferred, Intent, PromptSpec, Quality};
use crate::type_specific::TypeSpecific;

/// Copies every `Some` field of a patch onto the target.
macro_rules! patch_fields {
    ($target:expr, $patch:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $target.$field = value.clone();
            }
        )+
    };
}

/// Same as `patch_fields!` for target fields that are themselves optional.
macro_rules! patch_optional_fields {
    ($target:expr, $patch:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $target.$field = Some(value.clone());
            }
        )+
    };
}

/// Partial update for [`Intent`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct IntentPatch {
    pub primary_goal: Option<String>,
    pub success_criteria: Option<Vec<String>>,
    pub action_desired: Option<String>,
    pub urgency: Option<String>,
}

/// Partial update for [`Audience`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct AudiencePatch {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub expertise_level: Option<String>,
    pub relationship: Option<String>,
    pub expectations: Option<Vec<String>>,
}

/// Partial update for [`ContextInfo`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ContextPatch {
    pub setting: Option<String>,
    pub prior_knowledge: Option<Vec<String>>,
    pub related_materials: Option<Vec<String>>,
    pub cultural_notes: Option<String>,
}

/// Partial update for [`Constraints`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ConstraintsPatch {
    pub length: Option<String>,
    pub length_specific: Option<String>,
    pub tone_markers: Option<Vec<String>>,
    pub format_requirements: Option<Vec<String>>,
    pub forbidden: Option<Vec<String>>,
    pub brand_voice: Option<String>,
}

/// Partial update for [`Quality`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct QualityPatch {
    pub must_include: Option<Vec<String>>,
    pub nice_to_have: Option<Vec<String>>,
    pub differentiation: Option<String>,
    pub anti_patterns: Option<Vec<String>>,
}

/// Partial update for [`Inferred`]. `reasoning` entries merge key by key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct InferredPatch {
    pub tone: Option<String>,
    pub format: Option<String>,
    pub length: Option<String>,
    pub reasoning: BTreeMap<String, String>,
}

/// Partial update applied by [`merge_spec`]. `SpecUpdate::default()` is a no-op.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SpecUpdate {
    pub version: Option<String>,
    pub output_type: Option<OutputType>,
    pub intent: Option<IntentPatch>,
    pub audience: Option<AudiencePatch>,
    pub context: Option<ContextPatch>,
    pub constraints: Option<ConstraintsPatch>,
    pub quality: Option<QualityPatch>,
    pub type_specific: Option<TypeSpecific>,
    pub inferred: Option<InferredPatch>,
}

impl SpecUpdate {
    /// Returns `true` when applying the update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Returns a new spec with `update` folded into a clone of `spec`.
///
/// Each sub-object present in the update is shallow-merged: fields the patch
/// sets overwrite, fields it omits are preserved. `inferred.reasoning` merges
/// one level deeper so unrelated reasoning entries survive.
#[must_use]
pub fn merge_spec(spec: &PromptSpec, update: &SpecUpdate) -> PromptSpec {
    let mut merged = spec.clone();

    patch_fields!(merged, update; version, output_type);

    if let Some(patch) = &update.intent {
        patch_fields!(merged.intent, patch; primary_goal, success_criteria, action_desired, urgency);
    }
    if let Some(patch) = &update.audience {
        patch_fields!(merged.audience, patch; primary, expertise_level, relationship, expectations);
        patch_optional_fields!(merged.audience, patch; secondary);
    }
    if let Some(patch) = &update.context {
        patch_fields!(merged.context, patch; setting, prior_knowledge, related_materials, cultural_notes);
    }
    if let Some(patch) = &update.constraints {
        patch_fields!(merged.constraints, patch; length, tone_markers, format_requirements, forbidden);
        patch_optional_fields!(merged.constraints, patch; length_specific, brand_voice);
    }
    if let Some(patch) = &update.quality {
        patch_fields!(merged.quality, patch; must_include, nice_to_have, differentiation, anti_patterns);
    }
    if let Some(patch) = &update.type_specific {
        merged.type_specific = Some(match &merged.type_specific {
            Some(existing) => existing.merged(patch),
            None => patch.clone(),
        });
    }
    if let Some(patch) = &update.inferred {
        patch_optional_fields!(merged.inferred, patch; tone, format, length);
        for (key, reason) in &patch.reasoning {
            merged.inferred.reasoning.insert(key.clone(), reason.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::create_empty_spec;
    use crate::type_specific::{CodeAttributes, TypeSpecific};

    fn sample_spec() -> PromptSpec {
        let mut spec = create_empty_spec(OutputType::Code);
        spec.intent.primary_goal = "Write a CSV parser".into();
        spec.intent.urgency = "normal".into();
        spec.audience.expertise_level = "advanced".into();
        spec.inferred.tone = Some("professional".into());
        spec.inferred
            .reasoning
            .insert("tone".into(), "technical brief".into());
        spec.type_specific = Some(TypeSpecific::Code(CodeAttributes {
            language: Some("rust".into()),
            ..CodeAttributes::default()
        }));
        spec
    }

    #[test]
    fn merge_with_empty_update_is_identity() {
        let spec = sample_spec();
        assert_eq!(merge_spec(&spec, &SpecUpdate::default()), spec);
    }

    #[test]
    fn present_fields_overwrite_and_absent_fields_survive() {
        let spec = sample_spec();
        let update = SpecUpdate {
            intent: Some(IntentPatch {
                urgency: Some("high".into()),
                ..IntentPatch::default()
            }),
            ..SpecUpdate::default()
        };

        let merged = merge_spec(&spec, &update);
        assert_eq!(merged.intent.urgency, "high");
        assert_eq!(merged.intent.primary_goal, "Write a CSV parser");
        assert_eq!(merged.audience, spec.audience);
    }

    #[test]
    fn reasoning_merges_key_wise() {
        let spec = sample_spec();
        let mut reasoning = BTreeMap::new();
        reasoning.insert("format".to_owned(), "asked for a table".to_owned());
        let update = SpecUpdate {
            inferred: Some(InferredPatch {
                format: Some("table".into()),
                reasoning,
                ..InferredPatch::default()
            }),
            ..SpecUpdate::default()
        };

        let merged = merge_spec(&spec, &update);
        assert_eq!(merged.inferred.reasoning.len(), 2);
        assert_eq!(merged.inferred.tone.as_deref(), Some("professional"));
        assert_eq!(merged.inferred.format.as_deref(), Some("table"));
    }

    #[test]
    fn source_spec_is_never_mutated() {
        let spec = sample_spec();
        let snapshot = spec.clone();
        let update: SpecUpdate = serde_json::from_str(
            r#"{ "audience": { "primary": "data engineers" }, "typeSpecific": { "kind": "code", "framework": "polars" } }"#,
        )
        .unwrap();

        let merged = merge_spec(&spec, &update);
        assert_eq!(spec, snapshot);
        assert_eq!(merged.audience.primary, "data engineers");
        let Some(TypeSpecific::Code(code)) = merged.type_specific else {
            panic!("expected code attributes");
        };
        assert_eq!(code.language.as_deref(), Some("rust"));
        assert_eq!(code.framework.as_deref(), Some("polars"));
    }
}
