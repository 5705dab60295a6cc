//! Client side of the three proxy endpoints

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::answer::AnswerResult;
use crate::gateway::AudioClip;
use crate::{Error, Result};

/// Proxy endpoints as seen by the session controller
#[async_trait]
pub trait Backend: Send + Sync {
    /// Transcribe a captured clip
    async fn transcribe(&self, clip: AudioClip) -> Result<String>;

    /// Answer a non-blank question
    async fn ask(&self, question: &str) -> Result<AnswerResult>;

    /// Synthesize MP3 speech for a non-blank script
    async fn speak(&self, text: &str) -> Result<Vec<u8>>;
}

/// [`Backend`] talking to a running ALEX server over HTTP
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct TranscribeBody {
    #[serde(default)]
    text: String,
}

impl HttpBackend {
    /// Create a backend for the server at `base_url` (e.g. `http://localhost:3000`)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    /// Map an error response to a validation or service error
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);

        tracing::warn!(status = %status, error = %message, "proxy request failed");
        if status == StatusCode::BAD_REQUEST {
            Err(Error::Validation(message))
        } else {
            Err(Error::Service(format!("{status}: {message}")))
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn transcribe(&self, clip: AudioClip) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(clip.bytes)
            .file_name(clip.file_name)
            .mime_str(&clip.mime_type)
            .map_err(|e| Error::Validation(format!("invalid audio type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("audio", part);

        let response = self
            .client
            .post(self.url("transcribe"))
            .multipart(form)
            .send()
            .await?;

        let body: TranscribeBody = Self::check(response).await?.json().await?;
        Ok(body.text)
    }

    async fn ask(&self, question: &str) -> Result<AnswerResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::Validation("question is blank".to_string()));
        }

        let response = self
            .client
            .post(self.url("ask"))
            .json(&json!({ "question": question }))
            .send()
            .await?;

        let body = Self::check(response).await?.text().await?;
        AnswerResult::from_json(&body)
    }

    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("speech text is blank".to_string()));
        }

        let response = self
            .client
            .post(self.url("tts"))
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let audio = Self::check(response).await?.bytes().await?;
        Ok(audio.to_vec())
    }
}
