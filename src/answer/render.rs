//! Plain-text display of an answer

use std::fmt::Write;

use super::AnswerResult;

/// Render an answer for reading on screen
///
/// Unlike the speakable script this keeps every section, excerpts included,
/// and shows the status.
#[must_use]
pub fn render_answer(result: &AnswerResult) -> String {
    let mut out = String::new();

    let title = non_blank(result.title.as_deref()).unwrap_or("ALEX Guidance");
    let _ = writeln!(out, "{title} [{}]", result.status);

    if let Some(summary) = non_blank(result.summary.as_deref()) {
        let _ = writeln!(out, "\n{summary}");
    }

    if let Some(question) = non_blank(result.clarifying_question.as_deref()) {
        let _ = writeln!(out, "\nClarifying question\n  {question}");
    }

    if !result.steps.is_empty() {
        out.push_str("\nProcedure\n");
        for step in &result.steps {
            let _ = writeln!(out, "  {}. {}", step.step_number, step.instruction.trim());
            if let Some(notes) = non_blank(step.notes.as_deref()) {
                let _ = writeln!(out, "     Notes: {notes}");
            }
        }
    }

    if !result.relevant_excerpts.is_empty() {
        out.push_str("\nExcerpts\n");
        for excerpt in &result.relevant_excerpts {
            match non_blank(excerpt.location_hint.as_deref()) {
                Some(hint) => {
                    let _ = writeln!(out, "  \"{}\" ({hint})", excerpt.excerpt.trim());
                }
                None => {
                    let _ = writeln!(out, "  \"{}\"", excerpt.excerpt.trim());
                }
            }
        }
    }

    if let Some(limitations) = non_blank(result.kb_limitations.as_deref()) {
        let _ = writeln!(out, "\nKB Notes\n  {limitations}");
    }

    out.trim_end().to_string()
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
