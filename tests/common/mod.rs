//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alex_gateway::gateway::{AudioClip, InferenceGateway};
use alex_gateway::session::{
    Backend, CaptureHandle, Microphone, PlaybackDone, PlaybackResource, Recording, Speaker,
};
use alex_gateway::{AnswerResult, Error, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Semaphore;

pub const TRAFFIC_STOP: &str = "what do I do at a traffic stop";

/// A two-step answer about traffic stops
#[must_use]
pub fn traffic_stop_answer() -> AnswerResult {
    AnswerResult::from_value(json!({
        "status": "ok",
        "clarifying_question": null,
        "title": "Traffic Stop Procedure",
        "summary": "Approach safely and identify yourself.",
        "steps": [
            {"step_number": 1, "instruction": "Activate emergency lights.", "notes": null},
            {"step_number": 2, "instruction": "Approach from the passenger side.", "notes": "Keep your hands visible."}
        ],
        "relevant_excerpts": [
            {"excerpt": "Officers shall activate emergency lights.", "location_hint": "Section 4.2"}
        ],
        "kb_limitations": null
    }))
    .expect("fixture is a valid answer")
}

/// An answer for a question the knowledge document does not cover
#[must_use]
pub fn not_in_kb_answer() -> AnswerResult {
    AnswerResult::from_value(json!({
        "status": "not_in_kb",
        "clarifying_question": null,
        "title": null,
        "summary": null,
        "steps": [],
        "relevant_excerpts": [],
        "kb_limitations": "The document does not cover vehicle maintenance."
    }))
    .expect("fixture is a valid answer")
}

/// Calls observed by a fake collaborator
#[derive(Debug, Default)]
pub struct Calls {
    pub transcribe: AtomicUsize,
    pub ask: AtomicUsize,
    pub speak: AtomicUsize,
}

impl Calls {
    pub fn transcribe(&self) -> usize {
        self.transcribe.load(Ordering::SeqCst)
    }

    pub fn ask(&self) -> usize {
        self.ask.load(Ordering::SeqCst)
    }

    pub fn speak(&self) -> usize {
        self.speak.load(Ordering::SeqCst)
    }
}

/// In-memory [`Backend`]
///
/// Speech requests wait on a gate so tests can hold them in flight.
pub struct FakeBackend {
    pub calls: Calls,
    pub transcript: Mutex<std::result::Result<String, String>>,
    pub answer: Mutex<std::result::Result<AnswerResult, String>>,
    pub asked: Mutex<Vec<String>>,
    pub spoken: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<AudioClip>>,
    speech_gate: Semaphore,
}

impl FakeBackend {
    /// Backend that answers everything immediately
    #[must_use]
    pub fn new() -> Self {
        let backend = Self::gated();
        backend.release_speech(Semaphore::MAX_PERMITS);
        backend
    }

    /// Backend whose speech requests block until released
    #[must_use]
    pub fn gated() -> Self {
        Self {
            calls: Calls::default(),
            transcript: Mutex::new(Ok(TRAFFIC_STOP.to_string())),
            answer: Mutex::new(Ok(traffic_stop_answer())),
            asked: Mutex::new(Vec::new()),
            spoken: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            speech_gate: Semaphore::new(0),
        }
    }

    /// Let `n` pending or future speech requests complete
    pub fn release_speech(&self, n: usize) {
        self.speech_gate.add_permits(n);
    }

    pub fn fail_transcription(&self, message: &str) {
        *self.transcript.lock().unwrap() = Err(message.to_string());
    }

    pub fn fail_answers(&self, message: &str) {
        *self.answer.lock().unwrap() = Err(message.to_string());
    }

    pub fn answer_with(&self, result: AnswerResult) {
        *self.answer.lock().unwrap() = Ok(result);
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn transcribe(&self, clip: AudioClip) -> Result<String> {
        self.calls.transcribe.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().unwrap().push(clip);
        self.transcript.lock().unwrap().clone().map_err(Error::Service)
    }

    async fn ask(&self, question: &str) -> Result<AnswerResult> {
        self.calls.ask.fetch_add(1, Ordering::SeqCst);
        self.asked.lock().unwrap().push(question.to_string());
        self.answer.lock().unwrap().clone().map_err(Error::Service)
    }

    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        self.calls.speak.fetch_add(1, Ordering::SeqCst);
        self.spoken.lock().unwrap().push(text.to_string());

        self.speech_gate
            .acquire()
            .await
            .map_err(|e| Error::Service(e.to_string()))?
            .forget();

        Ok(format!("mp3:{text}").into_bytes())
    }
}

/// In-memory [`Microphone`] that grants or denies access
pub struct FakeMicrophone {
    pub grant: bool,
    pub chunks: Vec<Vec<f32>>,
    pub opened: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

impl FakeMicrophone {
    #[must_use]
    pub fn granting(chunks: Vec<Vec<f32>>) -> Self {
        Self {
            grant: true,
            chunks,
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn denying() -> Self {
        Self {
            grant: false,
            ..Self::granting(Vec::new())
        }
    }
}

#[async_trait]
impl Microphone for FakeMicrophone {
    async fn open(&mut self) -> Result<Box<dyn CaptureHandle>> {
        if !self.grant {
            return Err(Error::PermissionDenied("microphone access denied".to_string()));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCapture {
            chunks: self.chunks.clone(),
            released: Arc::clone(&self.released),
        }))
    }
}

struct FakeCapture {
    chunks: Vec<Vec<f32>>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl CaptureHandle for FakeCapture {
    async fn finalize(&mut self) -> Result<Recording> {
        Ok(Recording {
            sample_rate: 16_000,
            chunks: std::mem::take(&mut self.chunks),
        })
    }
}

impl Drop for FakeCapture {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory [`Speaker`] recording what happens to each resource
#[derive(Clone, Default)]
pub struct FakeSpeaker {
    /// Entries like `load:<audio>`, `play:<audio>`, `stop:<audio>`
    pub log: Arc<Mutex<Vec<String>>>,
    /// Completion handles of loaded resources, oldest first
    pub pending: Arc<Mutex<Vec<PlaybackDone>>>,
}

impl FakeSpeaker {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log().iter().filter(|e| e.starts_with(prefix)).count()
    }

    /// Let the most recently loaded resource reach its natural end
    pub fn finish_latest(&self) {
        if let Some(done) = self.pending.lock().unwrap().pop() {
            done.finished();
        }
    }
}

impl Speaker for FakeSpeaker {
    fn load(&mut self, audio: Vec<u8>, done: PlaybackDone) -> Result<Box<dyn PlaybackResource>> {
        let name = String::from_utf8_lossy(&audio).into_owned();
        self.log.lock().unwrap().push(format!("load:{name}"));
        self.pending.lock().unwrap().push(done);
        Ok(Box::new(FakePlayback {
            name,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakePlayback {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl PlaybackResource for FakePlayback {
    fn play(&mut self) -> Result<()> {
        self.log.lock().unwrap().push(format!("play:{}", self.name));
        Ok(())
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().push(format!("stop:{}", self.name));
    }
}

/// In-memory [`InferenceGateway`] counting every upstream call
pub struct MockGateway {
    pub calls: Calls,
    pub seen_knowledge: Mutex<Option<String>>,
    pub seen_question: Mutex<Option<String>>,
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Calls::default(),
            seen_knowledge: Mutex::new(None),
            seen_question: Mutex::new(None),
        })
    }
}

#[async_trait]
impl InferenceGateway for MockGateway {
    async fn answer(&self, question: &str, knowledge: &str) -> Result<AnswerResult> {
        self.calls.ask.fetch_add(1, Ordering::SeqCst);
        *self.seen_question.lock().unwrap() = Some(question.to_string());
        *self.seen_knowledge.lock().unwrap() = Some(knowledge.to_string());
        Ok(traffic_stop_answer())
    }

    async fn transcribe(&self, clip: AudioClip) -> Result<String> {
        self.calls.transcribe.fetch_add(1, Ordering::SeqCst);
        Ok(format!("heard {} bytes", clip.bytes.len()))
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.calls.speak.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mp3:{text}").into_bytes())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
