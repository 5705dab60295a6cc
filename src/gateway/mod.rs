//! Inference gateway seam
//!
//! The three proxies delegate all of their real work to a third-party
//! inference provider: schema-constrained answering, transcription, and
//! speech synthesis. [`InferenceGateway`] is the seam; [`OpenAiGateway`] is
//! the production implementation.

mod openai;

use async_trait::async_trait;

pub use openai::{DEFAULT_BASE_URL, OpenAiGateway};

use crate::Result;
use crate::answer::AnswerResult;

/// A single captured or uploaded audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl AudioClip {
    /// Wrap WAV bytes produced by the local capture pipeline
    #[must_use]
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: "audio.wav".to_string(),
            mime_type: "audio/wav".to_string(),
        }
    }
}

/// Third-party endpoints the proxies forward to
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Answer `question` using only `knowledge`, constrained to the answer schema
    async fn answer(&self, question: &str, knowledge: &str) -> Result<AnswerResult>;

    /// Transcribe an audio clip to plain text (empty when nothing was heard)
    async fn transcribe(&self, clip: AudioClip) -> Result<String>;

    /// Synthesize MP3 speech for `text`
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
