//! Error types for the Prompt Spec model.

use thiserror::Error;

/// Errors emitted while decoding Prompt Specs.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The JSON payload could not be decoded into a spec.
    #[error("failed to decode prompt spec: {source}")]
    Decode {
        /// Source [`serde_json::Error`].
        #[from]
        source: serde_json::Error,
    },
}

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;
