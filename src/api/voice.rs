//! Transcription and speech proxy endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::{ApiState, error::ApiError};
use crate::gateway::AudioClip;

/// Largest accepted audio upload
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

const EXPECTED_AUDIO: &str = "Expected form field 'audio' as a file";

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/tts", post(synthesize))
        .with_state(state)
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Transcribe an uploaded audio file
///
/// Expects a multipart form with a file field named `audio`.
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let gateway = state.require_gateway()?;

    let mut multipart = multipart.map_err(|_| ApiError::BadRequest(EXPECTED_AUDIO.to_string()))?;
    let clip = read_audio_field(&mut multipart).await?;

    tracing::debug!(audio_bytes = clip.bytes.len(), file = %clip.file_name, "transcribing upload");
    let text = gateway.transcribe(clip).await?;

    Ok(Json(TranscribeResponse { text }))
}

/// Pull the `audio` file field out of a multipart form
async fn read_audio_field(multipart: &mut Multipart) -> Result<AudioClip, ApiError> {
    let bad = || ApiError::BadRequest(EXPECTED_AUDIO.to_string());

    while let Some(field) = multipart.next_field().await.map_err(|_| bad())? {
        if field.name() != Some("audio") {
            continue;
        }

        let file_name = field.file_name().map(ToString::to_string).ok_or_else(bad)?;
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|_| bad())?;

        if bytes.is_empty() {
            return Err(bad());
        }

        return Ok(AudioClip {
            bytes: bytes.to_vec(),
            file_name,
            mime_type,
        });
    }

    Err(bad())
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: Option<String>,
}

/// Synthesize text to speech
///
/// Returns MP3 audio that must not be cached.
async fn synthesize(State(state): State<Arc<ApiState>>, body: Bytes) -> Result<Response, ApiError> {
    let gateway = state.require_gateway()?;

    let text = serde_json::from_slice::<SynthesizeRequest>(&body)
        .ok()
        .and_then(|r| r.text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing 'text' string".to_string()))?;

    let audio = gateway.synthesize(&text).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        audio,
    )
        .into_response())
}
