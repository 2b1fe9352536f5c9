//! Spec validation: blocking errors, advisory warnings, and per-type validators.

use std::collections::HashMap;

use blueprint_primitives::OutputType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{
    EXPERTISE_LEVELS, LENGTH_PREFERENCES, PROMPT_SPEC_VERSION, PromptSpec, URGENCY_LEVELS,
};
use crate::type_specific::TypeSpecific;

/// Outcome of [`validate_spec`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// `false` when at least one error was recorded.
    pub valid: bool,
    /// Problems that make the spec unusable.
    pub errors: Vec<String>,
    /// Advisory findings; never affect `valid`.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Validator for the `type_specific` payload of one output type.
pub type TypeValidator = fn(&TypeSpecific) -> Vec<String>;

/// Lookup table of per-output-type validators.
///
/// Types without a registered validator receive no extra validation.
#[derive(Clone, Debug, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<OutputType, TypeValidator>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in validators for every type that has attributes.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(OutputType::Email, validate_email)
            .with(OutputType::Copywriting, validate_copywriting)
            .with(OutputType::SocialPost, validate_social_post)
            .with(OutputType::Article, validate_article)
            .with(OutputType::Code, validate_code)
            .with(OutputType::Image, validate_image)
    }

    /// Registers (or replaces) the validator for an output type.
    #[must_use]
    pub fn with(mut self, output_type: OutputType, validator: TypeValidator) -> Self {
        self.validators.insert(output_type, validator);
        self
    }

    /// Returns the validator registered for `output_type`, if any.
    #[must_use]
    pub fn get(&self, output_type: OutputType) -> Option<TypeValidator> {
        self.validators.get(&output_type).copied()
    }

    /// Validates a spec using this registry for the type-specific stage.
    #[must_use]
    pub fn validate(&self, spec: &PromptSpec) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if spec.intent.primary_goal.trim().is_empty() {
            errors.push("intent.primary_goal is required".to_owned());
        }

        if !spec.is_current_version() {
            warnings.push(format!(
                "spec version `{}` does not match current version `{PROMPT_SPEC_VERSION}`; it may be stale",
                spec.version
            ));
        }

        check_enum(
            &mut warnings,
            "audience.expertise_level",
            &spec.audience.expertise_level,
            EXPERTISE_LEVELS,
        );
        check_enum(
            &mut warnings,
            "constraints.length",
            &spec.constraints.length,
            LENGTH_PREFERENCES,
        );
        check_enum(&mut warnings, "intent.urgency", &spec.intent.urgency, URGENCY_LEVELS);

        if let Some(type_specific) = &spec.type_specific {
            if type_specific.output_type() != spec.output_type {
                warnings.push(format!(
                    "typeSpecific is for `{}` but outputType is `{}`",
                    type_specific.output_type(),
                    spec.output_type
                ));
            } else if let Some(validator) = self.get(spec.output_type) {
                warnings.extend(validator(type_specific));
            }
        }

        ValidationReport::from_findings(errors, warnings)
    }
}

/// Validates a spec with the standard validator registry.
#[must_use]
pub fn validate_spec(spec: &PromptSpec) -> ValidationReport {
    ValidatorRegistry::standard().validate(spec)
}

/// Validates an untyped spec as received from a model or an external caller.
///
/// An unrecognised `outputType` is reported as an error instead of failing to
/// decode; the remaining checks still run against a `text` stand-in.
#[must_use]
pub fn validate_spec_value(raw: &Value) -> ValidationReport {
    let mut value = raw.clone();
    let mut errors = Vec::new();

    if let Some(object) = value.as_object_mut() {
        let declared = object.get("outputType").and_then(Value::as_str).map(str::to_owned);
        match declared {
            Some(name) if name.parse::<OutputType>().is_ok() => {}
            Some(name) => {
                errors.push(format!("unrecognized outputType `{name}`"));
                object.insert("outputType".into(), Value::from(OutputType::Text.as_str()));
                object.remove("typeSpecific");
            }
            None => errors.push("outputType is required".to_owned()),
        }
    }

    match PromptSpec::from_value(value) {
        Ok(spec) => {
            let mut report = validate_spec(&spec);
            errors.append(&mut report.errors);
            ValidationReport::from_findings(errors, report.warnings)
        }
        Err(err) => {
            errors.push(err.to_string());
            ValidationReport::from_findings(errors, Vec::new())
        }
    }
}

/// Cheap check for hot paths: current version, and a non-empty primary goal.
///
/// `output_type` is enforced by the type system.
#[must_use]
pub fn is_minimally_valid(spec: &PromptSpec) -> bool {
    spec.is_current_version() && !spec.intent.primary_goal.trim().is_empty()
}

fn check_enum(warnings: &mut Vec<String>, field: &str, value: &str, allowed: &[&str]) {
    if !value.is_empty() && !allowed.contains(&value) {
        warnings.push(format!(
            "{field} `{value}` is not one of: {}",
            allowed.join(", ")
        ));
    }
}

const EMAIL_TYPES: &[&str] = &[
    "cold_outreach",
    "follow_up",
    "newsletter",
    "announcement",
    "internal",
    "support",
];
const COPY_TYPES: &[&str] = &["landing_page", "ad", "product_description", "tagline", "sales_page"];
const EMOTIONAL_APPEALS: &[&str] = &["urgency", "trust", "aspiration", "fomo", "curiosity", "belonging"];
const PLATFORM_LIMITS: &[(&str, u32)] = &[
    ("x", 280),
    ("twitter", 280),
    ("linkedin", 3000),
    ("instagram", 2200),
    ("facebook", 63_206),
    ("threads", 500),
];

fn validate_email(payload: &TypeSpecific) -> Vec<String> {
    let TypeSpecific::Email(email) = payload else {
        return Vec::new();
    };
    let mut warnings = Vec::new();
    if let Some(kind) = &email.email_type {
        check_enum(&mut warnings, "typeSpecific.email_type", kind, EMAIL_TYPES);
    }
    if email.subject_line.as_ref().is_some_and(|s| s.chars().count() > 120) {
        warnings.push("typeSpecific.subject_line is longer than 120 characters".to_owned());
    }
    warnings
}

fn validate_copywriting(payload: &TypeSpecific) -> Vec<String> {
    let TypeSpecific::Copywriting(copy) = payload else {
        return Vec::new();
    };
    let mut warnings = Vec::new();
    if let Some(kind) = &copy.copy_type {
        check_enum(&mut warnings, "typeSpecific.copy_type", kind, COPY_TYPES);
    }
    if let Some(appeal) = &copy.emotional_appeal {
        check_enum(&mut warnings, "typeSpecific.emotional_appeal", appeal, EMOTIONAL_APPEALS);
    }
    if copy.key_benefits.len() > 10 {
        warnings.push("typeSpecific.key_benefits lists more than 10 benefits".to_owned());
    }
    warnings
}

fn validate_social_post(payload: &TypeSpecific) -> Vec<String> {
    let TypeSpecific::SocialPost(post) = payload else {
        return Vec::new();
    };
    let mut warnings = Vec::new();
    let Some(platform) = post.platform.as_deref() else {
        warnings.push("typeSpecific.platform is not set".to_owned());
        return warnings;
    };
    match PLATFORM_LIMITS.iter().find(|(name, _)| *name == platform) {
        Some((_, max)) => {
            if post.character_limit.is_some_and(|limit| limit > *max) {
                warnings.push(format!(
                    "typeSpecific.character_limit exceeds the {platform} maximum of {max}"
                ));
            }
        }
        None => warnings.push(format!("typeSpecific.platform `{platform}` is not recognized")),
    }
    warnings
}

fn validate_article(payload: &TypeSpecific) -> Vec<String> {
    let TypeSpecific::Article(article) = payload else {
        return Vec::new();
    };
    let mut warnings = Vec::new();
    if article.section_count.is_some_and(|n| n == 0 || n > 20) {
        warnings.push("typeSpecific.section_count should be between 1 and 20".to_owned());
    }
    if article.target_keywords.len() > 15 {
        warnings.push("typeSpecific.target_keywords lists more than 15 keywords".to_owned());
    }
    warnings
}

fn validate_code(payload: &TypeSpecific) -> Vec<String> {
    let TypeSpecific::Code(code) = payload else {
        return Vec::new();
    };
    if code.language.as_deref().is_none_or(|lang| lang.trim().is_empty()) {
        vec!["typeSpecific.language is not set; the model will pick one".to_owned()]
    } else {
        Vec::new()
    }
}

fn validate_image(payload: &TypeSpecific) -> Vec<String> {
    let TypeSpecific::Image(image) = payload else {
        return Vec::new();
    };
    let mut warnings = Vec::new();
    if let Some(ratio) = &image.aspect_ratio {
        let well_formed = ratio
            .split_once(':')
            .is_some_and(|(w, h)| w.parse::<u32>().is_ok_and(|w| w > 0) && h.parse::<u32>().is_ok_and(|h| h > 0));
        if !well_formed {
            warnings.push(format!("typeSpecific.aspect_ratio `{ratio}` is not in W:H form"));
        }
    }
    if image.subject.as_deref().is_none_or(str::is_empty) {
        warnings.push("typeSpecific.subject is not set".to_owned());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::create_empty_spec;
    use crate::type_specific::{CodeAttributes, EmailAttributes, SocialPostAttributes};

    fn valid_spec() -> PromptSpec {
        let mut spec = create_empty_spec(OutputType::Text);
        spec.intent.primary_goal = "Explain borrow checking".into();
        spec
    }

    #[test]
    fn missing_primary_goal_is_an_error() {
        let report = validate_spec(&create_empty_spec(OutputType::Text));
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn unknown_enum_values_only_warn() {
        let mut spec = valid_spec();
        spec.audience.expertise_level = "guru".into();
        spec.constraints.length = "epic".into();
        spec.intent.urgency = "yesterday".into();
        spec.version = "0.9".into();

        let report = validate_spec(&spec);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 4);
    }

    #[test]
    fn type_validators_dispatch_by_output_type() {
        let mut spec = valid_spec();
        spec.output_type = OutputType::SocialPost;
        spec.type_specific = Some(TypeSpecific::SocialPost(SocialPostAttributes {
            platform: Some("x".into()),
            character_limit: Some(1000),
            ..SocialPostAttributes::default()
        }));

        let report = validate_spec(&spec);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("280"));
    }

    #[test]
    fn unregistered_type_gets_no_extra_validation() {
        let mut spec = valid_spec();
        spec.output_type = OutputType::Code;
        spec.type_specific = Some(TypeSpecific::Code(CodeAttributes::default()));

        let report = ValidatorRegistry::new().validate(&spec);
        assert!(report.warnings.is_empty());
        assert_eq!(validate_spec(&spec).warnings.len(), 1);
    }

    #[test]
    fn mismatched_variant_warns() {
        let mut spec = valid_spec();
        spec.type_specific = Some(TypeSpecific::Email(EmailAttributes::default()));
        let report = validate_spec(&spec);
        assert!(report.valid);
        assert!(report.warnings[0].contains("outputType"));
    }

    #[test]
    fn unrecognized_output_type_in_raw_json_is_an_error() {
        let report = validate_spec_value(&json!({
            "version": "1.0",
            "outputType": "podcast",
            "intent": { "primary_goal": "Record an episode" }
        }));
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["unrecognized outputType `podcast`".to_owned()]);
    }

    #[test]
    fn minimal_validity_checks_version_and_goal() {
        let mut spec = valid_spec();
        assert!(is_minimally_valid(&spec));
        spec.version = "0.1".into();
        assert!(!is_minimally_valid(&spec));
        assert!(!is_minimally_valid(&create_empty_spec(OutputType::Email)));
    }
}
