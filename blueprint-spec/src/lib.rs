//! Versioned Prompt Spec intermediate representation.
//!
//! A [`PromptSpec`] sits between the raw user brief and the rendered prompt
//! text. Specs are never mutated in place: [`merge_spec`] returns a patched
//! copy, and [`validate_spec`] reports problems without blocking callers.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod merge;
mod model;
mod type_specific;
mod validate;

pub use error::{SpecError, SpecResult};
pub use merge::{
    AudiencePatch, ConstraintsPatch, ContextPatch, InferredPatch, IntentPatch, QualityPatch,
    SpecUpdate, merge_spec,
};
pub use model::{
    Audience, Constraints, ContextInfo, EXPERTISE_LEVELS, Inferred, Intent, LENGTH_PREFERENCES,
    PROMPT_SPEC_VERSION, PromptSpec, Quality, URGENCY_LEVELS, create_empty_spec,
};
pub use type_specific::{
    ArticleAttributes, CodeAttributes, CopywritingAttributes, EmailAttributes, ImageAttributes,
    SocialPostAttributes, TypeSpecific,
};
pub use validate::{
    TypeValidator, ValidationReport, ValidatorRegistry, is_minimally_valid, validate_spec,
    validate_spec_value,
};
