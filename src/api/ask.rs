//! Answer proxy endpoint

use std::sync::Arc;

use axum::{Json, Router, body::Bytes, extract::State, routing::post};
use serde::Deserialize;

use super::{ApiState, error::ApiError};
use crate::answer::AnswerResult;

/// Build the answer router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ask", post(ask)).with_state(state)
}

/// Answer request body
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
}

/// Answer a question against the knowledge document
///
/// The document is read fresh for every request.
async fn ask(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<AnswerResult>, ApiError> {
    let gateway = state.require_gateway()?;

    let question = serde_json::from_slice::<AskRequest>(&body)
        .ok()
        .and_then(|r| r.question)
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing 'question' string".to_string()))?;

    let knowledge = state.knowledge.load().await?;

    tracing::info!(question = %question, gateway = gateway.name(), "answering question");
    let result = gateway.answer(&question, &knowledge).await?;

    Ok(Json(result))
}
