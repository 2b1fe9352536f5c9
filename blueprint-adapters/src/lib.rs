//! LLM gateway: one call signature over several model providers.
//!
//! [`gateway::LlmGateway`] resolves a model id to a provider, checks that the
//! caller supplied that provider's key, and hands the request to a
//! [`traits::ProviderTransport`]. Transports enforce a per-request timeout and
//! honour the request's cancellation token; the Gemini transport additionally
//! retries through [`retry::retry_with_backoff`].

#![warn(missing_docs, clippy::pedantic)]

pub mod anthropic;
pub mod credentials;
pub mod extract;
pub mod gateway;
pub mod gemini;
pub mod json;
pub mod openai;
pub mod retry;
pub mod traits;

mod http_client;

pub use credentials::Credentials;
pub use gateway::{LlmGateway, ModelCatalog};
pub use json::{JsonParseError, parse_json_response};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use traits::{
    Attachment, ErrorClass, GatewayError, GatewayResult, ModelCaller, ModelRequest, Provider,
    ProviderTransport,
};
