//! Structured answers produced by the answer proxy
//!
//! An [`AnswerResult`] is the only shape the answer endpoint ever returns.
//! Payloads coming back from the inference gateway are validated here, at the
//! boundary, so nothing downstream handles untyped JSON.

mod prompt;
mod render;
mod schema;

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use prompt::{DEVELOPER_PROMPT, SYSTEM_PROMPT, knowledge_message};
pub use render::render_answer;
pub use schema::{SCHEMA_NAME, answer_schema};

use crate::{Error, Result};

/// Top-level keys every answer payload must carry
const RESULT_KEYS: &[&str] = &[
    "status",
    "clarifying_question",
    "title",
    "summary",
    "steps",
    "relevant_excerpts",
    "kb_limitations",
];

const STEP_KEYS: &[&str] = &["step_number", "instruction", "notes"];

const EXCERPT_KEYS: &[&str] = &["excerpt", "location_hint"];

/// Outcome of answering a question against the knowledge document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// The document supports an answer
    Ok,
    /// The question is too vague; a clarifying question is attached
    NeedsClarification,
    /// The document does not cover the question
    NotInKb,
    /// The document covers the topic but ambiguously
    UnclearInKb,
}

impl AnswerStatus {
    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NeedsClarification => "needs_clarification",
            Self::NotInKb => "not_in_kb",
            Self::UnclearInKb => "unclear_in_kb",
        }
    }

    /// Whether the status reports a gap in the knowledge document
    #[must_use]
    pub const fn is_kb_gap(self) -> bool {
        matches!(self, Self::NotInKb | Self::UnclearInKb)
    }
}

impl fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One numbered procedure step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub step_number: NonZeroU32,
    pub instruction: String,
    pub notes: Option<String>,
}

/// A verbatim passage from the knowledge document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Excerpt {
    pub excerpt: String,
    pub location_hint: Option<String>,
}

/// Schema-constrained answer to a single question
///
/// Serializes every field, with absent values as explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerResult {
    pub status: AnswerStatus,
    pub clarifying_question: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub steps: Vec<Step>,
    pub relevant_excerpts: Vec<Excerpt>,
    pub kb_limitations: Option<String>,
}

impl AnswerResult {
    /// Parse and validate a raw answer payload
    ///
    /// # Errors
    ///
    /// Returns a service error if the text is not JSON or does not match the
    /// answer schema exactly
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::Service(format!("answer payload is not JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate an already-parsed answer payload
    ///
    /// Every declared key must be present (nullable ones as `null`), no
    /// undeclared key may appear, and step numbers must be positive.
    ///
    /// # Errors
    ///
    /// Returns a service error describing the first violation found
    pub fn from_value(value: Value) -> Result<Self> {
        require_exact_keys(&value, RESULT_KEYS, "answer")?;

        for (field, keys) in [("steps", STEP_KEYS), ("relevant_excerpts", EXCERPT_KEYS)] {
            if let Some(items) = value.get(field).and_then(Value::as_array) {
                for (i, item) in items.iter().enumerate() {
                    require_exact_keys(item, keys, &format!("{field}[{i}]"))?;
                }
            }
        }

        serde_json::from_value(value)
            .map_err(|e| Error::Service(format!("non-conforming answer payload: {e}")))
    }
}

fn require_exact_keys(value: &Value, keys: &[&str], context: &str) -> Result<()> {
    let object = value.as_object().ok_or_else(|| {
        Error::Service(format!(
            "non-conforming answer payload: {context} is not an object"
        ))
    })?;

    if let Some(missing) = keys.iter().find(|key| !object.contains_key(**key)) {
        return Err(Error::Service(format!(
            "non-conforming answer payload: {context} is missing `{missing}`"
        )));
    }

    if let Some(extra) = object.keys().find(|key| !keys.contains(&key.as_str())) {
        return Err(Error::Service(format!(
            "non-conforming answer payload: {context} has undeclared key `{extra}`"
        )));
    }

    Ok(())
}
