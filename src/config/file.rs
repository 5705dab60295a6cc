//! TOML configuration file loading
//!
//! Supports `~/.config/alex/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlexConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Inference gateway models
    #[serde(default)]
    pub models: ModelsFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Directory of static web UI files
    pub static_dir: Option<String>,

    /// Path to the knowledge document
    pub knowledge_path: Option<String>,
}

/// Inference gateway model selection
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsFileConfig {
    /// Gateway base URL (e.g. "https://api.openai.com")
    pub base_url: Option<String>,

    /// Model used for schema-constrained answers
    pub answer: Option<String>,

    /// Transcription model
    pub transcription: Option<String>,

    /// Speech synthesis model
    pub speech: Option<String>,

    /// Speech synthesis voice
    pub voice: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the text is not valid TOML for this schema
pub fn parse_config_file(content: &str) -> Result<AlexConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from the standard path
///
/// Returns `AlexConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AlexConfigFile {
    let Some(path) = config_file_path() else {
        return AlexConfigFile::default();
    };

    if !path.exists() {
        return AlexConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AlexConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AlexConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/alex/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("alex").join("config.toml"))
}
