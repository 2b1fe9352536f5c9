//! Runtime configuration for the blueprint engine.
//!
//! Settings start from defaults, may be replaced wholesale by a JSON document,
//! and are then adjusted by `BLUEPRINT_*` environment variables.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use schema::{BlueprintConfig, GatewaySettings, MatrixSettings, TelemetrySettings};
