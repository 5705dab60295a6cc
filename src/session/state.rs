//! Session state owned by the controller

use std::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::devices::{CaptureHandle, PlaybackResource};
use crate::answer::AnswerResult;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    RequestingMic,
    Recording,
    Transcribing,
    Ready,
    Asking,
    Answered,
    Tts,
    Playing,
}

impl SessionStatus {
    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RequestingMic => "requesting_mic",
            Self::Recording => "recording",
            Self::Transcribing => "transcribing",
            Self::Ready => "ready",
            Self::Asking => "asking",
            Self::Answered => "answered",
            Self::Tts => "tts",
            Self::Playing => "playing",
        }
    }

    /// States from which a new recording or question may start
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Idle | Self::Ready | Self::Answered)
    }

    /// States from which the current answer may be read aloud
    #[must_use]
    pub const fn can_speak(self) -> bool {
        matches!(self, Self::Answered | Self::Tts | Self::Playing)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outstanding speech synthesis request
pub(super) struct SpeechHandle {
    pub(super) generation: u64,
    pub(super) token: CancellationToken,
}

/// Loaded playback resource
pub(super) struct ActiveAudio {
    pub(super) generation: u64,
    pub(super) resource: Box<dyn PlaybackResource>,
}

/// The single mutable unit of client state
///
/// Each handle field is owned exclusively here and only touched by the
/// controller's transition functions.
#[derive(Default)]
pub struct Session {
    pub(super) status: SessionStatus,
    pub(super) transcript: String,
    pub(super) question: String,
    pub(super) result: Option<AnswerResult>,
    pub(super) last_error: Option<String>,
    pub(super) capture: Option<Box<dyn CaptureHandle>>,
    pub(super) speech: Option<SpeechHandle>,
    pub(super) audio: Option<ActiveAudio>,
}

impl Session {
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Last transcribed text (may be empty)
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// User-editable question text
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub const fn result(&self) -> Option<&AnswerResult> {
        self.result.as_ref()
    }

    /// Most recent failure, cleared by the next successful transition
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// Generation of the outstanding speech request, if any
    #[must_use]
    pub fn speech_generation(&self) -> Option<u64> {
        self.speech.as_ref().map(|s| s.generation)
    }

    #[must_use]
    pub const fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("transcript", &self.transcript)
            .field("question", &self.question)
            .field("result", &self.result.as_ref().map(|r| r.status))
            .field("last_error", &self.last_error)
            .field("capturing", &self.capture.is_some())
            .field("speech_generation", &self.speech_generation())
            .field("has_audio", &self.audio.is_some())
            .finish()
    }
}
