//! Error taxonomy for the gateway
//!
//! Every failure a handler can hit collapses to the same wire shape:
//! HTTP 500 with a JSON `{detail}` body. The variants exist so the
//! interesting distinction (fallback exhaustion vs. everything else) is
//! visible in code and logs, not on the wire.
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::models::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The chat completion service failed or rejected the request. The
    /// upstream message is passed through verbatim.
    #[error("{0}")]
    ChatUpstream(String),

    /// The caller's model and every fallback entry failed to load.
    #[error("No summarization model available")]
    NoSummarizerAvailable,

    /// A resolved summarization model failed during inference.
    #[error("{0}")]
    SummarizerUpstream(String),

    /// The request body failed validation before any upstream call.
    #[error("{0}")]
    InvalidRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        debug!("Request failed: {}", detail);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { detail }),
        )
            .into_response()
    }
}
