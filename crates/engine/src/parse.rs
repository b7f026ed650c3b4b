//! Tolerant parsing of answerer responses.
//!
//! Models wrap their JSON in prose or markdown fences more often than not.
//! The parser strips fences, takes the outermost brace span, and stringifies
//! scalar values. Anything unparsable degrades to an empty answer; a bad
//! response must never abort a pass.

use cliplens_core::chunk::RawAnswer;
use tracing::warn;

/// Parse one raw response into a key→value mapping.
///
/// Returns an empty `RawAnswer` (with a warning) when no JSON object can
/// be recovered.
pub fn parse_answer(response: &str) -> RawAnswer {
    let cleaned = strip_fences(response);

    let Some(object) = outer_object(cleaned) else {
        warn!(
            response = %truncate(response, 120),
            "No JSON object found in answer, dropping"
        );
        return RawAnswer::new();
    };

    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(object) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(key, value)| stringify(value).map(|v| (key, v)))
            .collect(),
        Err(e) => {
            warn!(
                error = %e,
                response = %truncate(response, 120),
                "Failed to parse answer JSON, dropping"
            );
            RawAnswer::new()
        }
    }
}

/// Remove markdown code fences (```json … ``` or bare ```).
fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// The substring from the first `{` to the last `}`, inclusive.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Render a JSON scalar as the string the validator sees.
///
/// Nested arrays/objects are dropped; the response contract is flat.
fn stringify(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null => None,
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

fn truncate(text: &str, max: usize) -> &str {
    let mut end = max.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
