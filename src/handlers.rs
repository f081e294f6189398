/// Axum handlers for the gateway endpoints
use axum::{Json, extract::State};
use tracing::{info, instrument};

use crate::AppState;
use crate::client::HttpClient;
use crate::errors::ApiError;
use crate::models::{GenerateRequest, GenerateResponse, SummarizeRequest, SummarizeResponse};
use crate::summarizer::SummaryConstraints;

/// `POST /generate`: forward the prompt to the named chat model.
#[instrument(skip(state, req))]
pub async fn generate<T: HttpClient>(
    State(state): State<AppState<T>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if req.prompt.is_empty() {
        return Err(ApiError::InvalidRequest("prompt must not be empty".into()));
    }

    info!("Generation request for model: {}", req.model_name);
    let output = state
        .chat
        .complete(&state.http_client, &req.model_name, &req.prompt)
        .await?;

    Ok(Json(GenerateResponse { output }))
}

/// `POST /summarize`: resolve a summarization model (caller's choice, then
/// the fallback list) and run it with the fixed length constraints.
#[instrument(skip(state, req))]
pub async fn summarize<T: HttpClient>(
    State(state): State<AppState<T>>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    if req.text.is_empty() {
        return Err(ApiError::InvalidRequest("text must not be empty".into()));
    }

    let requested = req.model_name.as_deref().unwrap_or("");
    let model = state
        .summarizer
        .resolve(&state.http_client, requested)
        .await?;

    info!("Summarizing with model: {}", model.model);
    let summary = model
        .summarize(&state.http_client, &req.text, SummaryConstraints::default())
        .await?;

    Ok(Json(SummarizeResponse { summary }))
}
