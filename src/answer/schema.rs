//! Strict JSON schema handed to the inference gateway

use serde_json::{Value, json};

/// Schema name reported to the gateway's structured-output format
pub const SCHEMA_NAME: &str = "alex_procedure_response";

/// Build the strict answer schema
///
/// Every property is required and no additional properties are allowed, so
/// nullable fields come back as explicit `null` rather than being omitted.
#[must_use]
pub fn answer_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "status": {
                "type": "string",
                "enum": ["ok", "needs_clarification", "not_in_kb", "unclear_in_kb"]
            },
            "clarifying_question": { "type": ["string", "null"] },
            "title": { "type": ["string", "null"] },
            "summary": { "type": ["string", "null"] },
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "step_number": { "type": "integer", "minimum": 1 },
                        "instruction": { "type": "string" },
                        "notes": { "type": ["string", "null"] }
                    },
                    "required": ["step_number", "instruction", "notes"]
                }
            },
            "relevant_excerpts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "excerpt": { "type": "string" },
                        "location_hint": { "type": ["string", "null"] }
                    },
                    "required": ["excerpt", "location_hint"]
                }
            },
            "kb_limitations": { "type": ["string", "null"] }
        },
        "required": [
            "status",
            "clarifying_question",
            "title",
            "summary",
            "steps",
            "relevant_excerpts",
            "kb_limitations"
        ]
    })
}
