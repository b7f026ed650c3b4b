//! `cliplens process` — Run a template against a media manifest.

use crate::manifest;
use cliplens_config::AppConfig;
use cliplens_core::answerer::{Answerer, Transcriber};
use cliplens_core::template::Template;
use cliplens_engine::Orchestrator;
use cliplens_providers::{
    OpenAiTranscriber, OpenAiVisionAnswerer, ScriptedAnswerer, ScriptedTranscriber,
};
use cliplens_telemetry::{RunRecorder, RunSummary};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn run(
    template_path: &Path,
    manifest_path: &Path,
    brand: Option<&Path>,
    output: Option<&Path>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !dry_run && !config.has_api_key() {
        let config_path = AppConfig::config_dir().join("config.toml");
        eprintln!("No API key configured.");
        eprintln!("Add one to {} or export CLIPLENS_API_KEY.", config_path.display());
        eprintln!("Use --dry-run to exercise the pipeline without an API key.");
        return Err("missing API key".into());
    }

    let template = Template::load(template_path, brand)
        .map_err(|e| format!("Failed to load template: {e}"))?;
    let bundle = manifest::load(manifest_path)?;

    info!(
        fields = template.len(),
        frame_methods = bundle.frames.len(),
        audio_keys = bundle.audio.len(),
        "Starting run"
    );

    let (answerer, transcriber): (Arc<dyn Answerer>, Arc<dyn Transcriber>) = if dry_run {
        (
            Arc::new(ScriptedAnswerer::empty()),
            Arc::new(ScriptedTranscriber::new("")),
        )
    } else {
        let api_key = config.api_key.clone().unwrap_or_default();
        (
            Arc::new(
                OpenAiVisionAnswerer::new("openai", &config.api_url, &api_key, &config.model)
                    .with_max_answer_tokens(config.max_answer_tokens),
            ),
            Arc::new(OpenAiTranscriber::new(
                "openai",
                &config.api_url,
                &api_key,
                &config.transcript_model,
            )),
        )
    };

    let orchestrator = Orchestrator::new(answerer)
        .with_transcriber(transcriber)
        .with_cost_model(Arc::new(config.cost_model()))
        .with_options(config.engine_options());

    let recorder = if config.telemetry.enabled {
        let recorder = Arc::new(RunRecorder::new());
        let listener = recorder.spawn_listener(orchestrator.events());
        Some((recorder, listener))
    } else {
        None
    };

    let results = orchestrator.process(&template, &bundle).await;

    let mut map = serde_json::Map::new();
    for (label, value) in results {
        map.insert(label, serde_json::Value::String(value));
    }
    let json = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;

    match output {
        Some(path) => {
            std::fs::write(path, &json)?;
            println!("Wrote results to {}", path.display());
        }
        None => println!("{json}"),
    }

    if let Some((recorder, listener)) = recorder {
        // Dropping the orchestrator closes the event bus; the listener
        // drains whatever is still buffered and exits.
        drop(orchestrator);
        listener.await?;
        print_summary(&recorder.summary());
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\nRun summary");
    println!("  Field groups:       {}", summary.groups);
    println!("  Too-heavy groups:   {}", summary.too_heavy_groups);
    println!("  Answerer calls:     {}", summary.calls);
    println!("  Failed calls:       {}", summary.failures);
    println!("  Retried fields:     {}", summary.retried_fields);
    println!("  Defaulted fields:   {}", summary.defaulted_fields);
    println!("  Estimated tokens:   {}", summary.estimated_tokens);
    if summary.transcription_failures > 0 {
        println!("  Failed transcripts: {}", summary.transcription_failures);
    }
}
