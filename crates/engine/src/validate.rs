//! Schema validation of parsed answers.
//!
//! Each returned value is checked against its field's accepted-value
//! schema. Unknown keys are dropped; fields the answerer skipped are not
//! reported here at all (the orchestrator's retry logic treats absence
//! separately from rejection).

use cliplens_core::chunk::{RawAnswer, ValidatedAnswer};
use cliplens_core::field::FieldSpec;
use tracing::debug;

/// Split a raw answer into schema-conforming and rejected values.
pub fn validate(raw: &RawAnswer, fields: &[FieldSpec]) -> ValidatedAnswer {
    let mut out = ValidatedAnswer::default();

    for (key, value) in raw.iter() {
        let Some(spec) = fields.iter().find(|f| &f.key == key) else {
            debug!(key, "Dropping unknown key from answer");
            continue;
        };

        if spec.accepted.accepts(value) {
            out.valid.insert(key.clone(), value.clone());
        } else {
            debug!(key, value, "Value rejected by field schema");
            out.invalid.insert(key.clone(), value.clone());
        }
    }

    out
}
