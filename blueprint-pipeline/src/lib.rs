//! Prompt pipelines built on the blueprint engine.
//!
//! Two entry points share the same architect, executor, and judge plumbing:
//!
//! - [`PipelineOrchestrator`] turns one brief into a Prompt Spec and an
//!   expanded prompt.
//! - [`MatrixRunner`] sweeps a tone × length × format matrix, producing a
//!   blueprint per cell and optionally executing and scoring it.
//!
//! Every model call goes through [`blueprint_adapters::ModelCaller`], so tests
//! and embedders can substitute their own transport.

#![warn(missing_docs, clippy::pedantic)]

pub mod architect;
mod error;
pub mod judge;
pub mod matrix;
pub mod orchestrator;

pub use error::{PipelineError, PipelineResult};
pub use judge::{
    BaselineExample, Dimensions, JudgeEvaluation, JudgeInput, JudgePersona, JudgeSettings,
    Justifications, judge_output,
};
pub use matrix::{
    CellResult, DEFAULT_MAX_CELLS, MatrixConfig, MatrixExperiment, MatrixRunner, ModelSelection,
    ProgressObserver, TracingProgressObserver, expand_matrix,
};
pub use orchestrator::{
    GeneratedPrompt, PipelineInput, PipelineOrchestrator, PipelineOutput, SpecOverrides, StageName,
    StageRecord, StageStatus,
};
