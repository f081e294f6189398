//! Summarization model resolution and invocation
//!
//! This is the one non-trivial piece of the gateway. Summarization models
//! are hosted on a hub addressed by model id; a model may or may not be
//! loadable at any given moment. Resolution is best-effort degrade-
//! gracefully: prefer the caller's choice, silently fall back to the
//! operator-trusted defaults, fail loudly only when nothing works.
//!
//! Each probe outcome is an explicit [`Result`] value that gets logged and
//! skipped, so the policy reads as a loop over outcomes rather than
//! catch-and-ignore. Nothing is cached across requests: every call pays the
//! full probe cost again.
use axum::http::{Method, StatusCode, header};
use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::HttpClient;
use crate::errors::ApiError;

/// Operator-trusted summarization models, probed in order when the caller
/// names no model or names one that fails to load.
pub const FALLBACK_MODELS: &[&str] = &["facebook/bart-large-cnn", "sshleifer/distilbart-cnn-12-6"];

/// Handle on the hub that hosts summarization models.
#[derive(Debug, Clone, Builder)]
pub struct SummarizerHub {
    pub(crate) base_url: Url,
}

/// A resolved, ready-to-invoke summarization model.
#[derive(Debug, Clone)]
pub struct SummaryModel {
    hub: SummarizerHub,
    pub model: String,
}

/// Length and sampling constraints sent with every summarization call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryConstraints {
    pub max_length: u32,
    pub min_length: u32,
    pub do_sample: bool,
}

impl Default for SummaryConstraints {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 30,
            do_sample: false,
        }
    }
}

/// Why a single candidate was skipped. Probe failures are logged, never
/// surfaced to the caller.
#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("model unavailable (status {0})")]
    Unavailable(StatusCode),
}

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
    parameters: SummaryConstraints,
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary_text: String,
}

impl SummarizerHub {
    /// Map a caller-supplied model id (possibly empty) to a usable model.
    ///
    /// Candidate order is strict: the caller's choice when non-empty, then
    /// [`FALLBACK_MODELS`] in list order. The first candidate whose probe
    /// succeeds wins; exhaustion is [`ApiError::NoSummarizerAvailable`].
    pub async fn resolve<T: HttpClient>(
        &self,
        client: &T,
        requested: &str,
    ) -> Result<SummaryModel, ApiError> {
        let candidates = (!requested.is_empty())
            .then_some(requested)
            .into_iter()
            .chain(FALLBACK_MODELS.iter().copied());

        for candidate in candidates {
            match self.probe(client, candidate).await {
                Ok(()) => {
                    debug!("Resolved summarization model: {}", candidate);
                    return Ok(SummaryModel {
                        hub: self.clone(),
                        model: candidate.to_owned(),
                    });
                }
                Err(e) => {
                    debug!("Skipping summarization model {}: {}", candidate, e);
                }
            }
        }

        Err(ApiError::NoSummarizerAvailable)
    }

    /// Check whether the hub can serve `model`. A 2xx status means usable;
    /// anything else (including transport failure) means skip.
    async fn probe<T: HttpClient>(&self, client: &T, model: &str) -> Result<(), ProbeError> {
        let url = self
            .base_url
            .join(&format!("status/{model}"))
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
        let req = axum::http::Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .body(axum::body::Body::empty())
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let response = client
            .request(req)
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::Unavailable(response.status()))
        }
    }
}

impl SummaryModel {
    /// Run the model over `text` and return the first result's summary.
    /// Invocation failure surfaces the upstream message verbatim.
    pub async fn summarize<T: HttpClient>(
        &self,
        client: &T,
        text: &str,
        constraints: SummaryConstraints,
    ) -> Result<String, ApiError> {
        let url = self
            .hub
            .base_url
            .join(&format!("models/{}", self.model))
            .map_err(|e| ApiError::SummarizerUpstream(e.to_string()))?;

        let payload = SummaryRequest {
            inputs: text,
            parameters: constraints,
        };
        let body =
            serde_json::to_vec(&payload).map_err(|e| ApiError::SummarizerUpstream(e.to_string()))?;

        let req = axum::http::Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .map_err(|e| ApiError::SummarizerUpstream(e.to_string()))?;

        debug!("Summarizing with model {} at {}", self.model, url);
        let response = client
            .request(req)
            .await
            .map_err(|e| ApiError::SummarizerUpstream(e.to_string()))?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ApiError::SummarizerUpstream(e.to_string()))?;

        if !status.is_success() {
            let detail = String::from_utf8_lossy(&bytes);
            return Err(ApiError::SummarizerUpstream(format!(
                "summarization model {} returned {status}: {detail}",
                self.model
            )));
        }

        let mut parsed: Vec<SummaryOutput> = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::SummarizerUpstream(format!("invalid summarizer response: {e}")))?;
        if parsed.is_empty() {
            return Err(ApiError::SummarizerUpstream(
                "summarizer returned no results".to_string(),
            ));
        }

        Ok(parsed.remove(0).summary_text)
    }
}
