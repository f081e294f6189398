//! Remote chat-completion backend for the `/generate` endpoint
//!
//! The backend speaks the OpenAI-compatible chat completions protocol: one
//! request per generation call, carrying the caller's prompt as a single
//! user message. Decoding is fixed at temperature 0.2; the caller only
//! chooses the model.
use axum::http::{Method, header};
use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::HttpClient;
use crate::errors::ApiError;

/// Decoding temperature applied to every generation request.
const CHAT_TEMPERATURE: f32 = 0.2;

/// Handle on the remote chat-completion service. The credential is injected
/// at startup and lives here read-only for the life of the process.
#[derive(Debug, Clone, Builder)]
pub struct ChatBackend {
    pub(crate) base_url: Url,
    pub(crate) api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl ChatBackend {
    /// Send `prompt` to the chat model named `model` and return its text
    /// output. Exactly one upstream call is made; any failure along the way
    /// surfaces as [`ApiError::ChatUpstream`] with the underlying message.
    pub async fn complete<T: HttpClient>(
        &self,
        client: &T,
        model: &str,
        prompt: &str,
    ) -> Result<String, ApiError> {
        let url = self
            .base_url
            .join("chat/completions")
            .map_err(|e| ApiError::ChatUpstream(e.to_string()))?;

        let payload = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: CHAT_TEMPERATURE,
        };
        let body = serde_json::to_vec(&payload).map_err(|e| ApiError::ChatUpstream(e.to_string()))?;

        let mut builder = axum::http::Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            );
        // Set the host header to match the target server (otherwise
        // CDN-fronted providers get mad).
        if let Some(host) = url.host_str() {
            let host_value = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            builder = builder.header(header::HOST, host_value);
        }
        let req = builder
            .body(axum::body::Body::from(body))
            .map_err(|e| ApiError::ChatUpstream(e.to_string()))?;

        debug!("Requesting chat completion for model {} from {}", model, url);
        let response = client
            .request(req)
            .await
            .map_err(|e| ApiError::ChatUpstream(e.to_string()))?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ApiError::ChatUpstream(e.to_string()))?;

        if !status.is_success() {
            let detail = String::from_utf8_lossy(&bytes);
            return Err(ApiError::ChatUpstream(format!(
                "chat service returned {status}: {detail}"
            )));
        }

        let parsed: ChatCompletionResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::ChatUpstream(format!("invalid chat completion response: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ChatUpstream("chat completion had no choices".to_string()))?;

        Ok(choice.message.content)
    }
}
