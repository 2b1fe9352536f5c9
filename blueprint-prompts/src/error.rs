//! Error types for prompt assembly.

use thiserror::Error;

/// Errors emitted while assembling prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    /// No template spec resolved from the request, registry default, or fallback.
    #[error("template spec not found: {id}")]
    SpecNotFound {
        /// The id that was requested.
        id: String,
    },

    /// Template spec JSON failed to decode.
    #[error("invalid template spec: {reason}")]
    InvalidTemplateSpec {
        /// Reason for the failure.
        reason: String,
    },
}

/// Result alias for prompt operations.
pub type PromptResult<T> = Result<T, PromptError>;
