//! Shared error definitions for blueprint primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the blueprint engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided experiment identifier could not be parsed.
    #[error("invalid experiment id: {source}")]
    InvalidExperimentId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A catalog or axis identifier failed validation.
    #[error("invalid identifier `{id}`: {reason}")]
    InvalidIdentifier {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The output type is not part of the closed set.
    #[error("unknown output type `{0}`")]
    UnknownOutputType(String),

    /// The rubric enforcement mode is not recognised.
    #[error("unknown rubric enforcement mode `{0}`")]
    UnknownRubric(String),

    /// Catalog data failed to decode.
    #[error("invalid catalog: {reason}")]
    InvalidCatalog {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
