//! Session controller
//!
//! Sequences microphone capture, transcription, question answering, and
//! speech playback for one user. All transitions run on the caller's task;
//! the only spawned work is the speech request, whose result comes back as a
//! [`SessionEvent`] and is fed to [`SessionController::handle`].
//!
//! ```text
//! idle ─▶ requesting_mic ─▶ recording ─▶ transcribing ─▶ ready
//!                                                          │ ask
//!                     ┌── barge_in ──┐                     ▼
//!  answered ◀─────────┴─ playing ◀── tts ◀── speak ── answered
//! ```
//!
//! Barge-in is synchronous: by the time [`SessionController::barge_in`]
//! returns, audio is stopped, the outstanding request is cancelled, and any
//! late response for it will be discarded.

mod backend;
mod devices;
mod state;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use backend::{Backend, HttpBackend};
pub use devices::{CaptureHandle, Microphone, PlaybackDone, PlaybackResource, Recording, Speaker};
pub use state::{Session, SessionStatus};

use crate::gateway::AudioClip;
use crate::speech_script::build_speakable_script;
use crate::{Error, Result};
use state::{ActiveAudio, SpeechHandle};

/// Results of asynchronous work, delivered back to the controller
#[derive(Debug)]
pub enum SessionEvent {
    /// A speech request completed (successfully or not)
    SpeechReady {
        generation: u64,
        audio: Result<Vec<u8>>,
    },
    /// A playback resource reached its natural end
    PlaybackEnded { generation: u64 },
}

/// Owns a [`Session`] and performs every transition on it
pub struct SessionController {
    session: Session,
    backend: Arc<dyn Backend>,
    microphone: Box<dyn Microphone>,
    speaker: Box<dyn Speaker>,
    generation: u64,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionController {
    /// Create a controller with a fresh idle session
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        microphone: Box<dyn Microphone>,
        speaker: Box<dyn Speaker>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::default(),
            backend,
            microphone,
            speaker,
            generation: 0,
            events_tx,
            events_rx,
        }
    }

    /// Read-only view of the session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Replace the question text (user edit)
    pub fn set_question(&mut self, question: impl Into<String>) {
        self.session.question = question.into();
    }

    /// Request the microphone and start recording
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is idle, ready, or answered,
    /// and `PermissionDenied` if the device is refused. On failure the session
    /// is back in its prior state with no capture handle.
    pub async fn start_recording(&mut self) -> Result<()> {
        let prior = self.session.status;
        if !prior.is_settled() {
            return Err(Error::InvalidState(format!(
                "cannot start recording while {prior}"
            )));
        }

        self.session.status = SessionStatus::RequestingMic;
        match self.microphone.open().await {
            Ok(handle) => {
                self.session.capture = Some(handle);
                self.session.status = SessionStatus::Recording;
                self.session.last_error = None;
                tracing::info!("recording started");
                Ok(())
            }
            Err(e) => {
                self.session.status = prior;
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Stop recording and transcribe what was captured
    ///
    /// On success both transcript and question become the trimmed
    /// transcription, even if the question had been edited meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if not recording. Capture or transcription
    /// failures leave the transcript and question untouched and the session
    /// `ready`.
    pub async fn stop_recording(&mut self) -> Result<()> {
        if self.session.status != SessionStatus::Recording {
            return Err(Error::InvalidState(format!(
                "cannot stop recording while {}",
                self.session.status
            )));
        }
        let Some(mut handle) = self.session.capture.take() else {
            return Err(Error::InvalidState("no capture device open".to_string()));
        };

        self.session.status = SessionStatus::Transcribing;
        let finalized = handle.finalize().await;
        drop(handle);

        let outcome = match finalized {
            Ok(recording) => self.transcribe(&recording).await,
            Err(e) => Err(e),
        };

        self.session.status = SessionStatus::Ready;
        match outcome {
            Ok(text) => {
                let text = text.trim().to_string();
                tracing::info!(transcript = %text, "transcription ready");
                self.session.transcript.clone_from(&text);
                self.session.question = text;
                self.session.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    async fn transcribe(&self, recording: &Recording) -> Result<String> {
        tracing::debug!(
            chunks = recording.chunks.len(),
            sample_rate = recording.sample_rate,
            "encoding recording"
        );
        let clip = AudioClip::wav(recording.to_wav()?);
        self.backend.transcribe(clip).await
    }

    /// Ask a question
    ///
    /// A blank question is a silent no-op and returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is idle, ready, or answered.
    /// A failed request restores the prior state and keeps the previous result.
    pub async fn ask(&mut self, question: &str) -> Result<bool> {
        let question = question.trim();
        if question.is_empty() {
            tracing::debug!("ignoring blank question");
            return Ok(false);
        }

        let prior = self.session.status;
        if !prior.is_settled() {
            return Err(Error::InvalidState(format!("cannot ask while {prior}")));
        }

        self.session.status = SessionStatus::Asking;
        match self.backend.ask(question).await {
            Ok(result) => {
                tracing::info!(status = %result.status, steps = result.steps.len(), "answer received");
                self.session.result = Some(result);
                self.session.status = SessionStatus::Answered;
                self.session.last_error = None;
                Ok(true)
            }
            Err(e) => {
                self.session.status = prior;
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Ask the session's current question text
    ///
    /// # Errors
    ///
    /// See [`SessionController::ask`]
    pub async fn ask_current(&mut self) -> Result<bool> {
        let question = self.session.question.clone();
        self.ask(&question).await
    }

    /// Read the current answer aloud
    ///
    /// Always barges in first, so at most one speech request or playback is
    /// ever active. Returns `false` without doing anything when there is no
    /// answer yet or the session is not answered, speaking, or playing.
    pub fn speak_result(&mut self) -> bool {
        if self.session.result.is_none() {
            tracing::debug!("no answer to speak");
            return false;
        }
        if !self.session.status.can_speak() {
            tracing::debug!(status = %self.session.status, "cannot speak in current state");
            return false;
        }

        self.barge_in();

        let script = self
            .session
            .result
            .as_ref()
            .map(build_speakable_script)
            .unwrap_or_default();
        if script.trim().is_empty() {
            return false;
        }

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.session.speech = Some(SpeechHandle {
            generation,
            token: token.clone(),
        });
        self.session.status = SessionStatus::Tts;

        tracing::debug!(generation, script_len = script.len(), "requesting speech");

        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let audio = tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::debug!(generation, "speech request cancelled");
                    return;
                }
                audio = backend.speak(&script) => audio,
            };

            if events
                .send(SessionEvent::SpeechReady { generation, audio })
                .is_err()
            {
                tracing::debug!(generation, "session gone before speech arrived");
            }
        });

        true
    }

    /// Stop audio and cancel any pending speech request
    ///
    /// Idempotent and safe to call with nothing active.
    pub fn barge_in(&mut self) {
        let had_audio = self.release_audio();

        let had_speech = self.session.speech.take().is_some_and(|speech| {
            speech.token.cancel();
            true
        });

        if matches!(
            self.session.status,
            SessionStatus::Tts | SessionStatus::Playing
        ) {
            self.session.status = SessionStatus::Answered;
        }

        if had_audio || had_speech {
            tracing::info!(had_audio, had_speech, "barge-in");
        }
    }

    /// Wait for the next asynchronous result
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Wait for the next asynchronous result and apply it
    ///
    /// Returns `false` if no further events can arrive.
    pub async fn step(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Apply an asynchronous result to the session
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SpeechReady { generation, audio } => {
                self.on_speech_ready(generation, audio);
            }
            SessionEvent::PlaybackEnded { generation } => self.on_playback_ended(generation),
        }
    }

    fn on_speech_ready(&mut self, generation: u64, audio: Result<Vec<u8>>) {
        let current = self
            .session
            .speech
            .as_ref()
            .is_some_and(|s| s.generation == generation && !s.token.is_cancelled());
        if !current {
            tracing::debug!(generation, "discarding stale speech response");
            return;
        }
        self.session.speech = None;

        let audio = match audio {
            Ok(audio) => audio,
            Err(e) => {
                self.session.status = SessionStatus::Answered;
                self.record_failure(&e);
                return;
            }
        };

        self.release_audio();

        let done = PlaybackDone::new(generation, self.events_tx.clone());
        let started = self.speaker.load(audio, done).and_then(|mut resource| {
            match resource.play() {
                Ok(()) => Ok(resource),
                Err(e) => {
                    resource.stop();
                    Err(e)
                }
            }
        });

        match started {
            Ok(resource) => {
                self.session.audio = Some(ActiveAudio {
                    generation,
                    resource,
                });
                self.session.status = SessionStatus::Playing;
                tracing::debug!(generation, "playback started");
            }
            Err(e) => {
                self.session.status = SessionStatus::Answered;
                self.record_failure(&e);
            }
        }
    }

    fn on_playback_ended(&mut self, generation: u64) {
        if !self
            .session
            .audio
            .as_ref()
            .is_some_and(|a| a.generation == generation)
        {
            tracing::debug!(generation, "ignoring end of replaced playback");
            return;
        }

        self.session.audio = None;
        if self.session.status == SessionStatus::Playing {
            self.session.status = SessionStatus::Answered;
        }
        tracing::debug!(generation, "playback finished");
    }

    /// Stop and drop the current playback resource
    fn release_audio(&mut self) -> bool {
        self.session.audio.take().is_some_and(|mut audio| {
            audio.resource.stop();
            true
        })
    }

    fn record_failure(&mut self, error: &Error) {
        tracing::warn!(status = %self.session.status, error = %error, "session operation failed");
        self.session.last_error = Some(error.to_string());
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.barge_in();
    }
}
