//! Speakable scripts for reading answers aloud
//!
//! Turns an [`AnswerResult`] into plain narration text: no markup, parts
//! separated by blank lines. Excerpts are never read aloud.

use crate::answer::{AnswerResult, AnswerStatus};

/// Title spoken when the answer carries none
pub const DEFAULT_TITLE: &str = "ALEX Guidance";

/// Spoken when the knowledge document has a gap but no explanation was given
pub const DEFAULT_KB_LIMITATION: &str = "The current HTML knowledge base does not address this topic.";

const CLARIFYING_LEAD_IN: &str = "Clarifying question.";
const STEPS_LEAD_IN: &str = "Procedure steps.";

/// Build the narration script for an answer
#[must_use]
pub fn build_speakable_script(result: &AnswerResult) -> String {
    let mut parts: Vec<String> = Vec::new();

    let title = result.title.as_deref().unwrap_or(DEFAULT_TITLE).trim();
    parts.push(title.to_string());

    if let Some(summary) = non_blank(result.summary.as_deref()) {
        parts.push(summary.to_string());
    }

    match result.status {
        AnswerStatus::NeedsClarification => {
            if let Some(question) = non_blank(result.clarifying_question.as_deref()) {
                parts.push(CLARIFYING_LEAD_IN.to_string());
                parts.push(question.to_string());
            }
        }
        AnswerStatus::NotInKb | AnswerStatus::UnclearInKb => {
            let limitation = non_blank(result.kb_limitations.as_deref()).unwrap_or(DEFAULT_KB_LIMITATION);
            parts.push(limitation.to_string());
        }
        AnswerStatus::Ok => {
            if !result.steps.is_empty() {
                parts.push(STEPS_LEAD_IN.to_string());
                for step in &result.steps {
                    parts.push(format!("Step {}. {}", step.step_number, step.instruction));
                    if let Some(notes) = non_blank(step.notes.as_deref()) {
                        parts.push(format!("Notes. {notes}"));
                    }
                }
            }
        }
    }

    parts.join("\n\n")
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
