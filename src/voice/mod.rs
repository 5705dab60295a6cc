//! Audio hardware adapters
//!
//! cpal-backed implementations of the session's [`Microphone`] and
//! [`Speaker`] seams. cpal streams are not `Send`, so each one lives on its
//! own thread and is controlled through channels and flags.
//!
//! [`Microphone`]: crate::session::Microphone
//! [`Speaker`]: crate::session::Speaker

mod capture;
mod playback;

pub use capture::{CpalMicrophone, SAMPLE_RATE, samples_to_wav};
pub use playback::{CpalSpeaker, DecodedAudio, decode_mp3};
