//! Conditional prompt rendering and assembly.
//!
//! Data flows bottom-up: [`condition`] decides which steps apply, [`template`]
//! renders them, and [`assembler`] binds a template spec plus caller controls
//! into a system/user prompt pair.

#![warn(missing_docs, clippy::pedantic)]

pub mod assembler;
pub mod condition;
pub mod inference;
pub mod registry;
pub mod template;

mod error;

pub use assembler::{
    PlanParams, PromptAssembler, PromptPlan, Toggles, build_prompt_plan,
    build_prompt_plan_with_inference,
};
pub use condition::{Condition, Operator, conditions_hold, evaluate, resolve_path};
pub use error::{PromptError, PromptResult};
pub use inference::{Detected, InferredSettings, infer_settings};
pub use registry::{FALLBACK_SPEC_ID, SpecRegistry, TemplateSpec};
pub use template::{Channel, RenderStep, RenderedBlock, StepTrace, build_blocks, render_template};
