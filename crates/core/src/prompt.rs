//! Prompt rendering shared by the token estimator and the answerer
//! implementations.
//!
//! Both must agree on the text that a call will carry, otherwise the
//! splitter's budget checks drift from what actually goes over the wire.

use crate::field::{AcceptedSpec, FieldSpec};
use serde_json::json;

/// Render the field-description block sent to the answerer: a JSON object
/// of `key → {description, accepted_values}`.
pub fn render_fields_block(fields: &[FieldSpec]) -> String {
    let mut block = serde_json::Map::new();
    for field in fields {
        block.insert(
            field.key.clone(),
            json!({
                "description": field.description,
                "accepted_values": accepted_values_list(&field.accepted),
            }),
        );
    }
    serde_json::Value::Object(block).to_string()
}

fn accepted_values_list(accepted: &AcceptedSpec) -> Vec<String> {
    match accepted {
        AcceptedSpec::FreeText => Vec::new(),
        AcceptedSpec::Enum { values } => values.clone(),
        AcceptedSpec::Ranges { bounds } => {
            bounds.iter().map(|(low, high)| format!("{low}-{high}")).collect()
        }
    }
}

/// Render the full instruction prompt for one call.
///
/// Mirrors the wire format: source framing, inline transcript, response
/// contract, then the fields block.
pub fn render_system_prompt(fields: &[FieldSpec], transcript: &[String], has_images: bool) -> String {
    let mut sources = Vec::new();
    if has_images {
        sources.push("frames");
    }
    if !transcript.is_empty() {
        sources.push("transcription");
    }

    let mut prompt = format!(
        "You are an expert in structured video content analysis.\n\
         You are given {} from a video.\n",
        sources.join(", and "),
    );

    if !transcript.is_empty() {
        prompt.push_str("Transcription:\n");
        prompt.push_str(&transcript.join("\n"));
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "Your task is to extract structured information based on the provided material.\n\
         Return a valid JSON dictionary with key: value pairs.\n\
         Use only the keys and descriptions provided below. If a value is not identifiable, return 'N/A'.\n\
         Respond only with the JSON object: {key: value, ...}.\n\n",
    );
    prompt.push_str("Fields:\n");
    prompt.push_str(&render_fields_block(fields));
    prompt
}
