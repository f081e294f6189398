/// Wire shapes for the gateway's own HTTP surface.
///
/// These are the only structured entities in the system; nothing here
/// outlives a single request/response cycle.
use serde::{Deserialize, Serialize};

/// Body of `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The prompt forwarded to the chat model. Must be non-empty.
    pub prompt: String,
    /// Which chat model the prompt is forwarded to.
    pub model_name: String,
}

/// Successful response from `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub output: String,
}

/// Body of `POST /summarize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    /// The text to summarize. Must be non-empty.
    pub text: String,
    /// Preferred summarization model. Empty or absent means "resolver's
    /// choice": the fallback list is probed in order.
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Successful response from `POST /summarize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// Uniform error body: every handler failure renders as `500 {detail}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
