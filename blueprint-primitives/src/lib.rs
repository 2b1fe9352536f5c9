//! Core shared types for the prompt blueprint engine.

#![warn(missing_docs, clippy::pedantic)]

mod catalog;
mod combo;
mod error;
mod ids;
mod output_type;
mod rubric;

/// Immutable tone/length/format/output-type lookup tables.
pub use catalog::{Catalog, CatalogBuilder, Descriptor};
/// Matrix cell coordinates.
pub use combo::Combo;
/// Error type and result alias shared across the engine.
pub use error::{Error, Result};
/// Identifier types and validation.
pub use ids::{ExperimentId, validate_identifier};
/// Closed set of output types.
pub use output_type::OutputType;
/// Judge scoring discipline.
pub use rubric::RubricEnforcement;
