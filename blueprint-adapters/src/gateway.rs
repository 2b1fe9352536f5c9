//! Provider lookup and dispatch.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::anthropic::{AnthropicConfig, AnthropicTransport};
use crate::gemini::{GeminiConfig, GeminiTransport};
use crate::openai::{OpenAiConfig, OpenAiTransport};
use crate::retry::RetryPolicy;
use crate::traits::{
    GatewayError, GatewayResult, ModelCaller, ModelRequest, Provider, ProviderTransport,
};

/// Maps model ids to providers: exact ids first, then the longest matching prefix.
#[derive(Clone, Debug, Default)]
pub struct ModelCatalog {
    exact: HashMap<String, Provider>,
    prefixes: BTreeMap<String, Provider>,
}

impl ModelCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Well-known model ids and the vendor naming prefixes.
    #[must_use]
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for id in ["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini", "o3-mini"] {
            catalog = catalog.with_model(id, Provider::OpenAi);
        }
        for id in ["claude-3-5-sonnet-latest", "claude-3-5-haiku-latest", "claude-sonnet-4-0"] {
            catalog = catalog.with_model(id, Provider::Anthropic);
        }
        for id in ["gemini-2.0-flash", "gemini-1.5-pro", "gemini-2.5-pro"] {
            catalog = catalog.with_model(id, Provider::Gemini);
        }
        catalog
            .with_prefix("gpt-", Provider::OpenAi)
            .with_prefix("chatgpt-", Provider::OpenAi)
            .with_prefix("o1", Provider::OpenAi)
            .with_prefix("o3", Provider::OpenAi)
            .with_prefix("o4", Provider::OpenAi)
            .with_prefix("claude-", Provider::Anthropic)
            .with_prefix("gemini-", Provider::Gemini)
    }

    /// Registers an exact model id.
    #[must_use]
    pub fn with_model(mut self, id: impl Into<String>, provider: Provider) -> Self {
        self.exact.insert(id.into(), provider);
        self
    }

    /// Registers an id prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>, provider: Provider) -> Self {
        self.prefixes.insert(prefix.into(), provider);
        self
    }

    /// Returns the provider serving `model_id`.
    #[must_use]
    pub fn provider_for(&self, model_id: &str) -> Option<Provider> {
        let model_id = model_id.trim();
        self.exact.get(model_id).copied().or_else(|| {
            self.prefixes
                .iter()
                .filter(|(prefix, _)| model_id.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, provider)| *provider)
        })
    }
}

/// Unified entry point for model calls.
#[derive(Clone, Default)]
pub struct LlmGateway {
    catalog: ModelCatalog,
    transports: HashMap<Provider, Arc<dyn ProviderTransport>>,
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<_> = self.transports.keys().collect();
        providers.sort();
        f.debug_struct("LlmGateway")
            .field("catalog", &self.catalog)
            .field("providers", &providers)
            .finish()
    }
}

impl LlmGateway {
    /// Gateway with no transports registered.
    #[must_use]
    pub fn new(catalog: ModelCatalog) -> Self {
        Self {
            catalog,
            transports: HashMap::new(),
        }
    }

    /// Standard catalog with all three HTTPS transports.
    ///
    /// `timeout` applies per request (per attempt for Gemini); `retry` is only
    /// used by the Gemini transport.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if a transport endpoint is invalid.
    pub fn standard(timeout: Duration, retry: RetryPolicy) -> GatewayResult<Self> {
        let openai = OpenAiTransport::new(OpenAiConfig::default().with_timeout(timeout))?;
        let anthropic = AnthropicTransport::new(AnthropicConfig::default().with_timeout(timeout))?;
        let gemini =
            GeminiTransport::new(GeminiConfig::default().with_timeout(timeout).with_retry(retry));

        Ok(Self::new(ModelCatalog::standard())
            .with_transport(Arc::new(openai))
            .with_transport(Arc::new(anthropic))
            .with_transport(Arc::new(gemini)))
    }

    /// Registers (or replaces) the transport for its provider.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn ProviderTransport>) -> Self {
        self.transports.insert(transport.provider(), transport);
        self
    }

    /// The model catalog.
    #[must_use]
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Looks up the provider, checks the credential, and dispatches.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownModel`] for unmapped ids,
    /// [`GatewayError::MissingCredential`] before any network activity when the
    /// provider key is absent, or whatever the transport raises.
    pub async fn call_model(&self, request: ModelRequest) -> GatewayResult<String> {
        let provider = self
            .catalog
            .provider_for(&request.model_id)
            .ok_or_else(|| GatewayError::UnknownModel {
                model: request.model_id.clone(),
            })?;
        let credential = request
            .credentials
            .get(provider)
            .ok_or(GatewayError::MissingCredential { provider })?;
        let transport = self.transports.get(&provider).ok_or_else(|| {
            GatewayError::configuration(format!("no transport registered for {provider}"))
        })?;

        debug!(
            model = %request.model_id,
            %provider,
            json_mode = request.json_mode,
            attachments = request.attachments.len(),
            "dispatching model call"
        );

        let result = transport.send(&request, credential).await;
        if let Err(err) = &result {
            warn!(model = %request.model_id, %provider, error = %err, "model call failed");
        }
        result
    }
}

#[async_trait]
impl ModelCaller for LlmGateway {
    async fn call(&self, request: ModelRequest) -> GatewayResult<String> {
        self.call_model(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::credentials::Credentials;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProviderTransport for Recording {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn send(&self, request: &ModelRequest, credential: &str) -> GatewayResult<String> {
            self.seen.lock().unwrap().push(format!("{}:{credential}", request.model_id));
            Ok("ok".into())
        }
    }

    #[test]
    fn exact_ids_then_longest_prefix() {
        let catalog = ModelCatalog::standard().with_prefix("gpt-4o-realtime", Provider::Gemini);
        assert_eq!(catalog.provider_for("gpt-4o"), Some(Provider::OpenAi));
        assert_eq!(catalog.provider_for("gpt-4o-realtime-x"), Some(Provider::Gemini));
        assert_eq!(catalog.provider_for("claude-opus-x"), Some(Provider::Anthropic));
        assert_eq!(catalog.provider_for("gemini-exp"), Some(Provider::Gemini));
        assert_eq!(catalog.provider_for("llama3"), None);
    }

    #[tokio::test]
    async fn dispatches_with_provider_key() {
        let transport = Arc::new(Recording::default());
        let gateway = LlmGateway::new(ModelCatalog::standard()).with_transport(transport.clone());
        let request = ModelRequest::new("claude-3-5-haiku-latest", "hi")
            .with_credentials(Credentials::new().with(Provider::Anthropic, "key-a"));

        let out = gateway.call(request).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(*transport.seen.lock().unwrap(), vec!["claude-3-5-haiku-latest:key-a"]);
    }

    #[tokio::test]
    async fn missing_credential_fails_fast() {
        let transport = Arc::new(Recording::default());
        let gateway = LlmGateway::new(ModelCatalog::standard()).with_transport(transport.clone());
        let request = ModelRequest::new("claude-3-5-haiku-latest", "hi")
            .with_credentials(Credentials::new().with(Provider::OpenAi, "wrong-provider"));

        let err = gateway.call_model(request).await.expect_err("no anthropic key");
        assert!(matches!(err, GatewayError::MissingCredential { provider: Provider::Anthropic }));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_model_and_missing_transport() {
        let gateway = LlmGateway::new(ModelCatalog::standard());
        let err = gateway.call_model(ModelRequest::new("llama3", "hi")).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownModel { .. }));

        let request = ModelRequest::new("gpt-4o", "hi")
            .with_credentials(Credentials::new().with(Provider::OpenAi, "k"));
        let err = gateway.call_model(request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }
}
