//! Google Gemini `generateContent` transport. The only transport that retries.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client, sanitize_base_url, send_json};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::traits::{
    Attachment, GatewayError, GatewayResult, ModelRequest, Provider, ProviderTransport,
};

/// Configuration for the Gemini transport.
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/".to_owned(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl GeminiConfig {
    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> GatewayResult<Self> {
        self.base_url = sanitize_base_url(Provider::Gemini, base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Calls `v1beta/models/{model}:generateContent` over HTTPS with tiered retry.
pub struct GeminiTransport {
    client: HyperClient,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl fmt::Debug for GeminiTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiTransport")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GeminiTransport {
    /// Constructs a transport from `config`.
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: build_https_client(),
            base_url: config.base_url,
            timeout: config.timeout,
            retry: config.retry,
        }
    }

    fn endpoint(&self, model: &str, credential: &str) -> GatewayResult<Uri> {
        format!(
            "{}v1beta/models/{model}:generateContent?key={credential}",
            self.base_url
        )
        .parse::<Uri>()
        .map_err(|err| GatewayError::configuration(format!("invalid Gemini endpoint: {err}")))
    }

    async fn attempt(&self, request: &ModelRequest, credential: &str, body: &[u8]) -> GatewayResult<String> {
        let http = Request::post(self.endpoint(&request.model_id, credential)?)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_vec()))
            .map_err(|err| {
                GatewayError::transport(format!("failed to build Gemini request: {err}"))
            })?;

        let response: GenerateContentResponse = send_json(
            &self.client,
            Provider::Gemini,
            http,
            self.timeout,
            &request.cancel,
        )
        .await?;

        let text = response.text();
        if text.is_empty() {
            return Err(GatewayError::response("Gemini response contained no text parts"));
        }
        Ok(text)
    }
}

#[async_trait]
impl ProviderTransport for GeminiTransport {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn send(&self, request: &ModelRequest, credential: &str) -> GatewayResult<String> {
        let body = serde_json::to_vec(&build_body(request)).map_err(|err| {
            GatewayError::configuration(format!("failed to encode Gemini request: {err}"))
        })?;
        debug!(model = %request.model_id, bytes = body.len(), "sending Gemini request");

        retry_with_backoff(&self.retry, &request.cancel, "gemini.generate_content", || {
            self.attempt(request, credential, &body)
        })
        .await
    }
}

fn build_body(request: &ModelRequest) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: request.user_prompt.clone(),
    }];
    parts.extend(request.attachments.iter().map(|attachment| match attachment {
        Attachment::Image { mime_type, data } => Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.clone(),
                data: data.clone(),
            },
        },
        Attachment::Text { .. } => Part::Text {
            text: attachment.text_part().unwrap_or_default(),
        },
    }));

    GenerateContentRequest {
        system_instruction: request.system_prompt.as_ref().map(|system| SystemInstruction {
            parts: vec![Part::Text {
                text: system.clone(),
            }],
        }),
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config: request.json_mode.then_some(GenerationConfig {
            response_mime_type: "application/json",
        }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .take(1)
            .flat_map(|candidate| &candidate.content.parts)
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_shape() {
        let request = ModelRequest::new("gemini-2.0-flash", "hello")
            .with_system_prompt("sys")
            .json()
            .with_attachment(Attachment::Image {
                mime_type: "image/png".into(),
                data: "CCCC".into(),
            });
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(body["systemInstruction"], json!({ "parts": [{ "text": "sys" }] }));
        assert_eq!(body["generationConfig"], json!({ "responseMimeType": "application/json" }));
        assert_eq!(
            body["contents"][0]["parts"],
            json!([
                { "text": "hello" },
                { "inline_data": { "mime_type": "image/png", "data": "CCCC" } }
            ])
        );
    }

    #[test]
    fn endpoint_embeds_model_and_key() {
        let transport = GeminiTransport::new(GeminiConfig::default());
        let uri = transport.endpoint("gemini-2.0-flash", "k").unwrap();
        assert_eq!(
            uri.to_string(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=k"
        );
    }

    #[test]
    fn response_uses_first_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{ "candidates": [
                { "content": { "parts": [ { "text": "a" }, { "text": "b" } ] } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ] }"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "ab");
    }
}
