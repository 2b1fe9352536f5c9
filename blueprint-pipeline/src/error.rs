use blueprint_adapters::{GatewayError, JsonParseError};
use blueprint_prompts::PromptError;
use thiserror::Error;

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by the orchestrator and the matrix runner.
///
/// Per-cell failures inside a matrix run are recorded on the cell instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The cartesian product exceeds the configured cap.
    #[error("matrix expands to {cells} cells, above the limit of {max}")]
    MatrixTooLarge {
        /// Cells the matrix would produce.
        cells: usize,
        /// Configured cap.
        max: usize,
    },

    /// A model call failed.
    #[error("{stage} model call failed: {source}")]
    Model {
        /// Stage or phase that issued the call.
        stage: &'static str,
        /// Gateway error.
        #[source]
        source: GatewayError,
    },

    /// A model response could not be parsed.
    #[error("{stage} response was not usable: {source}")]
    Parse {
        /// Stage or phase that received the response.
        stage: &'static str,
        /// Parser error.
        #[source]
        source: JsonParseError,
    },

    /// A model response was JSON but not in the agreed shape.
    #[error("{stage} response did not match the expected shape: {source}")]
    Shape {
        /// Stage or phase that received the response.
        stage: &'static str,
        /// Decoder error naming the offending field.
        #[source]
        source: serde_json::Error,
    },

    /// Prompt assembly failed.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl PipelineError {
    pub(crate) fn model(stage: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |source| Self::Model { stage, source }
    }
}
