//! `cliplens template` — Show a template's parsed fields and planned groups.

use cliplens_core::field::{AcceptedSpec, FieldSpec};
use cliplens_core::template::Template;
use cliplens_engine::group_fields;
use std::path::Path;

pub async fn run(path: &Path, brand: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let template =
        Template::load(path, brand).map_err(|e| format!("Failed to load template: {e}"))?;

    println!("Template: {}", path.display());
    println!("  Fields: {}\n", template.len());

    for entry in template.entries() {
        let spec = &entry.spec;
        println!(
            "  {:<28} {:<10} {:<10} frames: {:<14} audio: {}",
            spec.key,
            accepted_kind(&spec.accepted),
            spec.aggregation,
            spec.media.frame_method.as_deref().unwrap_or("-"),
            spec.media.audio_key.as_deref().unwrap_or("-"),
        );
    }

    let specs: Vec<FieldSpec> = template.fields().cloned().collect();
    let groups = group_fields(&specs);
    println!("\n  Field groups: {}", groups.len());
    for group in &groups {
        println!("    {:<28} {} field(s)", group.signature.to_string(), group.fields.len());
    }

    Ok(())
}

fn accepted_kind(accepted: &AcceptedSpec) -> &'static str {
    match accepted {
        AcceptedSpec::FreeText => "free-text",
        AcceptedSpec::Enum { .. } => "enum",
        AcceptedSpec::Ranges { .. } => "range",
    }
}
