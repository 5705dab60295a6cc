//! Capture and playback seams
//!
//! The controller never touches hardware directly. Real devices live in
//! [`crate::voice`]; tests substitute in-memory fakes.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::SessionEvent;
use crate::Result;
use crate::voice::samples_to_wav;

/// Grants exclusive access to an audio input
#[async_trait]
pub trait Microphone: Send {
    /// Request the capture device and start buffering audio
    ///
    /// Fails with [`crate::Error::PermissionDenied`] when access is refused.
    async fn open(&mut self) -> Result<Box<dyn CaptureHandle>>;
}

/// An open capture device
///
/// Dropping the handle releases the device.
#[async_trait]
pub trait CaptureHandle: Send {
    /// Stop capturing and hand back every buffered chunk
    async fn finalize(&mut self) -> Result<Recording>;
}

/// Audio buffered between start and finalize, chunks in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub sample_rate: u32,
    pub chunks: Vec<Vec<f32>>,
}

impl Recording {
    /// All samples, concatenated in capture order
    #[must_use]
    pub fn samples(&self) -> Vec<f32> {
        self.chunks.concat()
    }

    /// Encode the recording as a single WAV file
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        samples_to_wav(&self.samples(), self.sample_rate)
    }
}

/// Turns synthesized audio into playable resources
pub trait Speaker: Send {
    /// Load audio bytes into a fresh resource without starting it
    ///
    /// # Errors
    ///
    /// Returns error if the audio cannot be decoded or the output opened
    fn load(&mut self, audio: Vec<u8>, done: PlaybackDone) -> Result<Box<dyn PlaybackResource>>;
}

/// A loaded, playable audio resource
pub trait PlaybackResource: Send {
    /// Begin playback
    ///
    /// # Errors
    ///
    /// Returns error if the output device fails to start
    fn play(&mut self) -> Result<()>;

    /// Pause, rewind, and detach; no further audio may be produced
    fn stop(&mut self);
}

/// Notifies the controller that a resource finished playing on its own
#[derive(Debug)]
pub struct PlaybackDone {
    generation: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl PlaybackDone {
    pub(super) const fn new(generation: u64, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, events }
    }

    /// Report natural end of playback
    pub fn finished(self) {
        let event = SessionEvent::PlaybackEnded {
            generation: self.generation,
        };
        if self.events.send(event).is_err() {
            tracing::debug!(generation = self.generation, "session gone before playback ended");
        }
    }
}
