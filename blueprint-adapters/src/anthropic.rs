//! Anthropic messages transport.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};

use crate::http_client::{HyperClient, build_https_client, sanitize_base_url, send_json};
use crate::traits::{
    Attachment, GatewayError, GatewayResult, ModelRequest, Provider, ProviderTransport,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic transport.
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    base_url: String,
    timeout: Duration,
    max_tokens: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com/".to_owned(),
            timeout: Duration::from_secs(60),
            max_tokens: 4096,
        }
    }
}

impl AnthropicConfig {
    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> GatewayResult<Self> {
        self.base_url = sanitize_base_url(Provider::Anthropic, base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the output token budget sent with every request.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Calls `v1/messages` over HTTPS.
pub struct AnthropicTransport {
    client: HyperClient,
    endpoint: Uri,
    timeout: Duration,
    max_tokens: u32,
}

impl fmt::Debug for AnthropicTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicTransport")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AnthropicTransport {
    /// Constructs a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the endpoint is invalid.
    pub fn new(config: AnthropicConfig) -> GatewayResult<Self> {
        let endpoint = format!("{}v1/messages", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                GatewayError::configuration(format!("invalid Anthropic endpoint: {err}"))
            })?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
            timeout: config.timeout,
            max_tokens: config.max_tokens,
        })
    }

    fn build_body(&self, request: &ModelRequest) -> MessagesRequest {
        let mut content: Vec<ContentBlock> = request
            .attachments
            .iter()
            .map(|attachment| match attachment {
                Attachment::Image { mime_type, data } => ContentBlock::Image {
                    source: ImageSource {
                        kind: "base64",
                        media_type: mime_type.clone(),
                        data: data.clone(),
                    },
                },
                Attachment::Text { .. } => ContentBlock::Text {
                    text: attachment.text_part().unwrap_or_default(),
                },
            })
            .collect();
        content.push(ContentBlock::Text {
            text: request.user_prompt.clone(),
        });

        let system = match (&request.system_prompt, request.json_mode) {
            (Some(system), true) => Some(format!("{system}\n\n{JSON_ONLY}")),
            (Some(system), false) => Some(system.clone()),
            (None, true) => Some(JSON_ONLY.to_owned()),
            (None, false) => None,
        };

        MessagesRequest {
            model: request.model_id.clone(),
            max_tokens: self.max_tokens,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        }
    }
}

// The messages API has no JSON response mode.
const JSON_ONLY: &str = "Respond with a single JSON object and nothing else.";

#[async_trait]
impl ProviderTransport for AnthropicTransport {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn send(&self, request: &ModelRequest, credential: &str) -> GatewayResult<String> {
        let body = serde_json::to_vec(&self.build_body(request)).map_err(|err| {
            GatewayError::configuration(format!("failed to encode Anthropic request: {err}"))
        })?;

        let http = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header("x-api-key", credential)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .body(Body::from(body))
            .map_err(|err| {
                GatewayError::transport(format!("failed to build Anthropic request: {err}"))
            })?;

        let response: MessagesResponse = send_json(
            &self.client,
            Provider::Anthropic,
            http,
            self.timeout,
            &request.cancel,
        )
        .await?;

        let text = response.text();
        if text.is_empty() {
            return Err(GatewayError::response("Anthropic response contained no text blocks"));
        }
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn transport() -> AnthropicTransport {
        AnthropicTransport::new(AnthropicConfig::default().with_max_tokens(256)).unwrap()
    }

    #[test]
    fn system_prompt_is_top_level() {
        let request = ModelRequest::new("claude-3-5-haiku-latest", "hi").with_system_prompt("sys");
        let body = serde_json::to_value(transport().build_body(&request)).unwrap();
        assert_eq!(body["system"], "sys");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(
            body["messages"],
            json!([{ "role": "user", "content": [{ "type": "text", "text": "hi" }] }])
        );
    }

    #[test]
    fn json_mode_adds_instruction() {
        let request = ModelRequest::new("claude-3-5-sonnet-latest", "hi").json();
        let body = serde_json::to_value(transport().build_body(&request)).unwrap();
        assert_eq!(body["system"], JSON_ONLY);
    }

    #[test]
    fn attachments_precede_prompt() {
        let request = ModelRequest::new("claude-3-5-sonnet-latest", "caption this").with_attachment(
            Attachment::Image {
                mime_type: "image/jpeg".into(),
                data: "BBBB".into(),
            },
        );
        let body = serde_json::to_value(transport().build_body(&request)).unwrap();
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["source"]["media_type"], "image/jpeg");
        assert_eq!(content[1]["text"], "caption this");
    }

    #[test]
    fn response_joins_text_blocks() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{ "content": [
                { "type": "text", "text": "Hello, " },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "world" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "Hello, world");
    }
}
