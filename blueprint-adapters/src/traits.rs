//! Shared gateway types: the error vocabulary, model requests, and the
//! [`ModelCaller`] seam the pipeline depends on.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::credentials::Credentials;

/// Result alias used across the gateway.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Model vendors the gateway can reach.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// `OpenAI` chat completions.
    OpenAi,
    /// Anthropic messages.
    Anthropic,
    /// Google Gemini `generateContent`.
    Gemini,
}

impl Provider {
    /// Every provider, in a stable order.
    pub const ALL: [Self; 3] = [Self::OpenAi, Self::Anthropic, Self::Gemini];

    /// Lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry classification of a [`GatewayError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// The provider said it is temporarily unavailable (HTTP 503).
    Unavailable,
    /// Worth retrying: timeouts, rate limits, network failures, other 5xx.
    Transient,
    /// Retrying would fail the same way.
    Permanent,
}

/// Errors raised while calling a model.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Gateway or transport is misconfigured.
    #[error("gateway not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// No provider is registered for the model id.
    #[error("unknown model `{model}`")]
    UnknownModel {
        /// The requested model id.
        model: String,
    },

    /// The caller did not supply a key for the provider.
    #[error("missing {provider} API key")]
    MissingCredential {
        /// Provider whose key is absent.
        provider: Provider,
    },

    /// The request did not finish within the per-request timeout.
    #[error("{provider} request timed out after {timeout:?}")]
    TimedOut {
        /// Provider that was called.
        provider: Provider,
        /// Limit that expired.
        timeout: Duration,
    },

    /// HTTP 503.
    #[error("{provider} is temporarily unavailable: {reason}")]
    Unavailable {
        /// Provider that was called.
        provider: Provider,
        /// Response body excerpt.
        reason: String,
    },

    /// HTTP 429.
    #[error("{provider} rate limited the request: {reason}")]
    RateLimited {
        /// Provider that was called.
        provider: Provider,
        /// Response body excerpt.
        reason: String,
    },

    /// HTTP 400, 404, or 422.
    #[error("{provider} rejected the request: {reason}")]
    BadRequest {
        /// Provider that was called.
        provider: Provider,
        /// Response body excerpt.
        reason: String,
    },

    /// HTTP 401 or 403.
    #[error("{provider} rejected the API key: {reason}")]
    InvalidCredential {
        /// Provider that was called.
        provider: Provider,
        /// Response body excerpt.
        reason: String,
    },

    /// Any other non-success status.
    #[error("{provider} returned HTTP {status}: {reason}")]
    Upstream {
        /// Provider that was called.
        provider: Provider,
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        reason: String,
    },

    /// Network or protocol failure before a response arrived.
    #[error("gateway transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The provider answered with something the gateway cannot use.
    #[error("gateway response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },

    /// The caller's cancellation token fired.
    #[error("model call cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for unusable responses.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }

    /// Maps an HTTP status and body excerpt onto the error vocabulary.
    #[must_use]
    pub fn from_status(provider: Provider, status: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match status {
            503 => Self::Unavailable { provider, reason },
            429 => Self::RateLimited { provider, reason },
            400 | 404 | 422 => Self::BadRequest { provider, reason },
            401 | 403 => Self::InvalidCredential { provider, reason },
            status => Self::Upstream {
                provider,
                status,
                reason,
            },
        }
    }

    /// Classifies the error for retry decisions.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable { .. } => ErrorClass::Unavailable,
            Self::TimedOut { .. } | Self::RateLimited { .. } | Self::Transport { .. } => {
                ErrorClass::Transient
            }
            Self::Upstream { status, .. } if *status >= 500 => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        }
    }
}

/// Extra input forwarded alongside the user prompt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    /// Base64-encoded image.
    Image {
        /// MIME type such as `image/png`.
        mime_type: String,
        /// Base64 payload without a `data:` prefix.
        data: String,
    },
    /// Plain-text document.
    Text {
        /// File name shown to the model.
        name: String,
        /// Document contents.
        content: String,
    },
}

impl Attachment {
    /// Text rendering used by providers that only accept text parts.
    #[must_use]
    pub fn text_part(&self) -> Option<String> {
        match self {
            Self::Text { name, content } => Some(format!("Attachment `{name}`:\n{content}")),
            Self::Image { .. } => None,
        }
    }
}

/// One model invocation.
#[derive(Clone, Debug, Default)]
pub struct ModelRequest {
    /// Model identifier, e.g. `gpt-4o-mini`.
    pub model_id: String,
    /// User prompt.
    pub user_prompt: String,
    /// Optional system prompt.
    pub system_prompt: Option<String>,
    /// Provider keys available for the call.
    pub credentials: Credentials,
    /// Inline attachments.
    pub attachments: Vec<Attachment>,
    /// Ask the provider for a JSON object response where supported.
    pub json_mode: bool,
    /// Checked before each attempt and raced against retry waits.
    pub cancel: CancellationToken,
}

impl ModelRequest {
    /// Creates a request with no system prompt, credentials, or attachments.
    #[must_use]
    pub fn new(model_id: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            user_prompt: user_prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the system prompt. Blank prompts are dropped.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    /// Supplies provider keys.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Requests a JSON object response.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Ties the request to a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Anything that can answer a [`ModelRequest`] with text.
///
/// The pipeline only sees this trait, so tests substitute scripted callers.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    /// Performs the call and returns the model's text output.
    async fn call(&self, request: ModelRequest) -> GatewayResult<String>;
}

/// A single provider's wire protocol.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Provider served by this transport.
    fn provider(&self) -> Provider;

    /// Sends `request` using `credential` and returns the text output.
    async fn send(&self, request: &ModelRequest, credential: &str) -> GatewayResult<String>;
}
