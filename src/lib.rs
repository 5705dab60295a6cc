//! ALEX Gateway - Voice front end for procedural question answering
//!
//! This library provides the core functionality for ALEX:
//! - Answer, transcription, and speech proxies over an inference gateway
//! - Conversion of structured answers into speakable scripts
//! - A session controller with barge-in for voice interaction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Session Controller                   │
//! │   Microphone  │  Speaker  │  Script  │  Barge-in    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP
//! ┌────────────────────▼────────────────────────────────┐
//! │                   ALEX Gateway                       │
//! │   /api/ask  │  /api/transcribe  │  /api/tts         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Inference Gateway (OpenAI)              │
//! │   Responses  │  Transcriptions  │  Speech           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod answer;
pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod knowledge;
pub mod session;
pub mod speech_script;
pub mod voice;

pub use answer::{AnswerResult, AnswerStatus, Excerpt, Step};
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::{AudioClip, InferenceGateway, OpenAiGateway};
pub use knowledge::KnowledgeSource;
pub use session::{Backend, HttpBackend, Session, SessionController, SessionStatus};
pub use speech_script::build_speakable_script;
