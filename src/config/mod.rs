//! Configuration management for the ALEX gateway
//!
//! Precedence is env > TOML file > default. A `.env` file in the working
//! directory is loaded into the environment first when present.

pub mod file;

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};
use file::AlexConfigFile;

/// Default API server port
pub const DEFAULT_PORT: u16 = 3000;

/// Default knowledge document path, relative to the working directory
pub const DEFAULT_KNOWLEDGE_PATH: &str = "knowledge.html";

/// ALEX gateway configuration
#[derive(Debug)]
pub struct Config {
    /// Inference gateway credential, shared by all three proxies
    pub api_key: Option<SecretString>,

    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Inference gateway models
    pub models: ModelConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Knowledge document read on every answer request
    pub knowledge_path: PathBuf,
}

/// Inference gateway endpoint and model selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Gateway base URL without the `/v1` suffix
    pub base_url: String,

    /// Model for schema-constrained answers
    pub answer: String,

    /// Transcription model
    pub transcription: String,

    /// Speech synthesis model
    pub speech: String,

    /// Speech synthesis voice
    pub voice: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: crate::gateway::DEFAULT_BASE_URL.to_string(),
            answer: "gpt-5.2".to_string(),
            transcription: "gpt-4o-mini-transcribe".to_string(),
            speech: "gpt-4o-mini-tts".to_string(),
            voice: "coral".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the process environment, and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value cannot be parsed
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env"),
        }

        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a config file with an environment lookup
    ///
    /// Blank environment values count as unset.
    ///
    /// # Errors
    ///
    /// Returns error if the port variable is set but not a valid port
    pub fn resolve(fc: AlexConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_key = env("OPENAI_API_KEY")
            .or(fc.api_keys.openai)
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let port = match env("ALEX_PORT").or_else(|| env("PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid port {raw:?}: {e}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };

        let server = ServerConfig {
            port,
            static_dir: env("ALEX_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            knowledge_path: env("ALEX_KNOWLEDGE_PATH")
                .or(fc.server.knowledge_path)
                .map_or_else(|| PathBuf::from(DEFAULT_KNOWLEDGE_PATH), PathBuf::from),
        };

        let defaults = ModelConfig::default();
        let models = ModelConfig {
            base_url: env("OPENAI_BASE_URL")
                .or(fc.models.base_url)
                .unwrap_or(defaults.base_url),
            answer: env("ALEX_ANSWER_MODEL")
                .or(fc.models.answer)
                .unwrap_or(defaults.answer),
            transcription: env("ALEX_STT_MODEL")
                .or(fc.models.transcription)
                .unwrap_or(defaults.transcription),
            speech: env("ALEX_TTS_MODEL")
                .or(fc.models.speech)
                .unwrap_or(defaults.speech),
            voice: env("ALEX_TTS_VOICE")
                .or(fc.models.voice)
                .unwrap_or(defaults.voice),
        };

        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, proxies will report service unavailable");
        }

        Ok(Self {
            api_key,
            server,
            models,
        })
    }

    /// Whether the inference credential is configured
    #[must_use]
    pub const fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Copy of the credential for handing to a gateway client
    #[must_use]
    pub fn credential(&self) -> Option<SecretString> {
        self.api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_owned()))
    }
}
