//! `OpenAI` inference gateway client
//!
//! Answers go through the Responses API with a strict `json_schema` text
//! format; transcription and speech use the audio endpoints. No retries.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AudioClip, InferenceGateway};
use crate::answer::{self, AnswerResult};
use crate::config::ModelConfig;
use crate::{Error, Result};

/// Default gateway base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// `OpenAI` gateway client shared by the three proxies
pub struct OpenAiGateway {
    client: Client,
    api_key: SecretString,
    base_url: String,
    models: ModelConfig,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    text: TextOptions<'a>,
}

#[derive(Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Serialize)]
struct TextOptions<'a> {
    format: TextFormat<'a>,
}

#[derive(Serialize)]
struct TextFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    schema: Value,
    strict: bool,
}

#[derive(Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl ResponsesResponse {
    /// Collect the model's text output
    fn into_output_text(self) -> Result<String> {
        if let Some(text) = self.output_text.filter(|t| !t.is_empty()) {
            return Ok(text);
        }

        let mut text = String::new();
        for item in self.output.into_iter().filter(|i| i.kind == "message") {
            for part in item.content {
                match part.kind.as_str() {
                    "output_text" => text.push_str(part.text.as_deref().unwrap_or_default()),
                    "refusal" => {
                        return Err(Error::Service(format!(
                            "model refused: {}",
                            part.refusal.unwrap_or_default()
                        )));
                    }
                    _ => {}
                }
            }
        }

        if text.is_empty() {
            return Err(Error::Service("gateway returned no output text".to_string()));
        }
        Ok(text)
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

impl OpenAiGateway {
    /// Create a gateway client
    #[must_use]
    pub fn new(api_key: SecretString, models: ModelConfig) -> Self {
        let base_url = models.base_url.trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            api_key,
            base_url,
            models,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key.expose_secret())
    }

    /// Turn a non-success response into a service error
    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "{what} request failed");
        Err(Error::Service(format!("{what} error {status}: {body}")))
    }
}

#[async_trait]
impl InferenceGateway for OpenAiGateway {
    async fn answer(&self, question: &str, knowledge: &str) -> Result<AnswerResult> {
        tracing::debug!(
            model = %self.models.answer,
            question_len = question.len(),
            knowledge_bytes = knowledge.len(),
            "requesting structured answer"
        );

        let request = ResponsesRequest {
            model: &self.models.answer,
            input: vec![
                InputMessage {
                    role: "system",
                    content: answer::SYSTEM_PROMPT.into(),
                },
                InputMessage {
                    role: "developer",
                    content: answer::DEVELOPER_PROMPT.into(),
                },
                InputMessage {
                    role: "user",
                    content: question.into(),
                },
                InputMessage {
                    role: "user",
                    content: answer::knowledge_message(knowledge).into(),
                },
            ],
            text: TextOptions {
                format: TextFormat {
                    kind: "json_schema",
                    name: answer::SCHEMA_NAME,
                    schema: answer::answer_schema(),
                    strict: true,
                },
            },
        };

        let response = self
            .client
            .post(self.url("responses"))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "answer request failed");
                e
            })?;

        let response = Self::check(response, "answer").await?;
        let body: ResponsesResponse = response.json().await?;
        let result = AnswerResult::from_json(&body.into_output_text()?)?;

        tracing::info!(status = %result.status, steps = result.steps.len(), "answer received");
        Ok(result)
    }

    async fn transcribe(&self, clip: AudioClip) -> Result<String> {
        tracing::debug!(
            audio_bytes = clip.bytes.len(),
            mime = %clip.mime_type,
            "starting transcription"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(clip.bytes)
                    .file_name(clip.file_name)
                    .mime_str(&clip.mime_type)
                    .map_err(|e| Error::Validation(format!("invalid audio type: {e}")))?,
            )
            .text("model", self.models.transcription.clone());

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let response = Self::check(response, "transcription").await?;
        let result: TranscriptionResponse = response.json().await?;
        let text = result.text.unwrap_or_default();

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.models.speech,
            input: text,
            voice: &self.models.voice,
            response_format: "mp3",
        };

        tracing::debug!(voice = %self.models.voice, text_len = text.len(), "synthesizing speech");

        let response = self
            .client
            .post(self.url("audio/speech"))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await?;

        let response = Self::check(response, "speech").await?;
        let audio = response.bytes().await?;

        tracing::debug!(audio_bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
