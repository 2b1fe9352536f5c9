//! `OpenAI` chat completions transport.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};

use crate::http_client::{HyperClient, build_https_client, sanitize_base_url, send_json};
use crate::traits::{
    Attachment, GatewayError, GatewayResult, ModelRequest, Provider, ProviderTransport,
};

/// Configuration for the `OpenAI` transport.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    base_url: String,
    timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/".to_owned(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAiConfig {
    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> GatewayResult<Self> {
        self.base_url = sanitize_base_url(Provider::OpenAi, base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Calls `v1/chat/completions` over HTTPS.
pub struct OpenAiTransport {
    client: HyperClient,
    endpoint: Uri,
    timeout: Duration,
}

impl fmt::Debug for OpenAiTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiTransport")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiTransport {
    /// Constructs a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the endpoint is invalid.
    pub fn new(config: OpenAiConfig) -> GatewayResult<Self> {
        let endpoint = format!("{}v1/chat/completions", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                GatewayError::configuration(format!("invalid OpenAI endpoint: {err}"))
            })?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl ProviderTransport for OpenAiTransport {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn send(&self, request: &ModelRequest, credential: &str) -> GatewayResult<String> {
        let body = serde_json::to_vec(&build_body(request)).map_err(|err| {
            GatewayError::configuration(format!("failed to encode OpenAI request: {err}"))
        })?;

        let http = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {credential}"))
            .body(Body::from(body))
            .map_err(|err| {
                GatewayError::transport(format!("failed to build OpenAI request: {err}"))
            })?;

        let response: ChatCompletionResponse = send_json(
            &self.client,
            Provider::OpenAi,
            http,
            self.timeout,
            &request.cancel,
        )
        .await?;

        response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.and_then(|message| message.content))
            .ok_or_else(|| GatewayError::response("OpenAI response contained no message content"))
    }
}

fn build_body(request: &ModelRequest) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system_prompt {
        messages.push(OpenAiMessage {
            role: "system",
            content: MessageContent::Text(system.clone()),
        });
    }

    let content = if request.attachments.is_empty() {
        MessageContent::Text(request.user_prompt.clone())
    } else {
        let mut parts = vec![ContentPart::Text {
            text: request.user_prompt.clone(),
        }];
        parts.extend(request.attachments.iter().map(|attachment| match attachment {
            Attachment::Image { mime_type, data } => ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{mime_type};base64,{data}"),
                },
            },
            Attachment::Text { .. } => ContentPart::Text {
                text: attachment.text_part().unwrap_or_default(),
            },
        }));
        MessageContent::Parts(parts)
    };
    messages.push(OpenAiMessage {
        role: "user",
        content,
    });

    ChatCompletionRequest {
        model: request.model_id.clone(),
        messages,
        response_format: request.json_mode.then_some(ResponseFormat {
            kind: "json_object",
        }),
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn plain_request_shape() {
        let request = ModelRequest::new("gpt-4o-mini", "hello").with_system_prompt("be brief");
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hello" }
                ]
            })
        );
    }

    #[test]
    fn json_mode_and_attachments() {
        let request = ModelRequest::new("gpt-4o", "describe")
            .json()
            .with_attachment(Attachment::Image {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
            });
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(body["response_format"], json!({ "type": "json_object" }));
        let parts = &body["messages"][0]["content"];
        assert_eq!(parts[0], json!({ "type": "text", "text": "describe" }));
        assert_eq!(parts[1]["image_url"]["url"], Value::from("data:image/png;base64,AAAA"));
    }

    #[test]
    fn response_parsing_extracts_content() {
        let json = r#"{ "choices": [ { "message": { "content": "hi" } } ] }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let content = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.and_then(|msg| msg.content));
        assert_eq!(content.as_deref(), Some("hi"));
    }

    #[test]
    fn rejects_schemeless_base_url() {
        let err = OpenAiConfig::default()
            .with_base_url("api.openai.com")
            .expect_err("missing scheme should error");
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }
}
