//! Prompt blueprint engine facade.
//!
//! Depend on this crate via `cargo add blueprint`. It bundles the engine crates
//! behind feature flags so embedders can take only the pieces they need, for
//! example the template engine without any HTTP stack.

#![warn(missing_docs, clippy::pedantic)]

/// Shared ids, output types, and the control-axis catalog.
pub use blueprint_primitives as primitives;

/// Prompt Spec model, merging, and validation (enabled by `spec` feature).
#[cfg(feature = "spec")]
pub use blueprint_spec as spec;

/// Template rendering and prompt assembly (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use blueprint_prompts as prompts;

/// LLM gateway and provider transports (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use blueprint_adapters as adapters;

/// Orchestrator and matrix runner (enabled by `pipeline` feature).
#[cfg(feature = "pipeline")]
pub use blueprint_pipeline as pipeline;

/// Runtime configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use blueprint_config as config;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use blueprint_telemetry as telemetry;
