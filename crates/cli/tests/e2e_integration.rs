//! End-to-end integration tests for the Cliplens extraction pipeline.
//!
//! These tests exercise the full path from a template file on disk to the
//! final label-to-value mapping: template parsing, grouping, splitting,
//! scripted answering, validation, retry, merging, and label remapping.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cliplens_core::media::{FrameRef, MediaBundle};
use cliplens_core::template::Template;
use cliplens_engine::{EngineOptions, Orchestrator};
use cliplens_providers::{ScriptedAnswerer, ScriptedTranscriber};
use cliplens_telemetry::RunRecorder;

// ── Fixtures ─────────────────────────────────────────────────────────────

const TEMPLATE: &str = r#"{
    "Has Logo": {
        "key": "has_logo",
        "prompt_ai": "Is the brand logo visible?",
        "accepted_values": ["1", "0"],
        "split_logic": "or",
        "frame_method": "regular_1s",
        "frames_used": "all",
        "split_possible": true
    },
    "Visual Quality": {
        "key": "visual_quality",
        "prompt_ai": "Rate the visual quality.",
        "accepted_values": ["0-100"],
        "split_logic": "mean",
        "frame_method": "regular_1s",
        "frames_used": "all",
        "split_possible": true
    },
    "Music Genre": {
        "key": "music_genre",
        "prompt_ai": "What music genre plays?",
        "accepted_values": [],
        "audio": "main_audio"
    }
}"#;

fn load_template(dir: &Path, content: &str) -> Template {
    let path = dir.join("template.json");
    std::fs::write(&path, content).unwrap();
    Template::load(&path, None).unwrap()
}

fn frames(n: usize) -> Vec<FrameRef> {
    (0..n).map(|i| FrameRef::from_b64(format!("frame{i}"))).collect()
}

fn bundle(frame_count: usize, with_audio: bool) -> MediaBundle {
    let mut bundle = MediaBundle::new();
    bundle.frames.insert("regular_1s".into(), frames(frame_count));
    if with_audio {
        bundle.audio.insert("main_audio".into(), vec![PathBuf::from("voice.mp3")]);
    }
    bundle
}

fn values(labeled: &[(String, String)]) -> Vec<(&str, &str)> {
    labeled.iter().map(|(l, v)| (l.as_str(), v.as_str())).collect()
}

// ── Full pipeline ────────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_maps_labels_in_template_order() {
    let dir = tempfile::tempdir().unwrap();
    let template = load_template(dir.path(), TEMPLATE);

    // 25 frames at 10 per window means three calls for the frames group,
    // then one call for the audio group.
    let answerer = Arc::new(ScriptedAnswerer::new(vec![
        r#"{"has_logo": "1", "visual_quality": "80"}"#.into(),
        r#"{"has_logo": "1", "visual_quality": "80"}"#.into(),
        r#"{"has_logo": "1", "visual_quality": "80"}"#.into(),
        r#"{"music_genre": "electronic"}"#.into(),
    ]));
    let orchestrator = Orchestrator::new(answerer.clone())
        .with_transcriber(Arc::new(ScriptedTranscriber::new("upbeat electronic music")));

    let labeled = orchestrator.process(&template, &bundle(25, true)).await;

    assert_eq!(
        values(&labeled),
        [
            ("Has Logo", "1"),
            ("Visual Quality", "80"),
            ("Music Genre", "electronic"),
        ]
    );
    assert_eq!(answerer.call_count(), 4);
}

#[tokio::test]
async fn too_heavy_group_defaults_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let template = load_template(dir.path(), TEMPLATE);

    // 25 frames need three windows; a ceiling of two makes the frames
    // group unprocessable. The audio group still runs.
    let answerer = Arc::new(ScriptedAnswerer::new(vec![
        r#"{"music_genre": "jazz"}"#.into(),
    ]));
    let orchestrator = Orchestrator::new(answerer.clone())
        .with_transcriber(Arc::new(ScriptedTranscriber::new("smooth jazz")))
        .with_options(EngineOptions { max_chunks: 2, ..EngineOptions::default() });

    let labeled = orchestrator.process(&template, &bundle(25, true)).await;

    assert_eq!(
        values(&labeled),
        [
            ("Has Logo", "N/A"),
            ("Visual Quality", "N/A"),
            ("Music Genre", "jazz"),
        ]
    );
    assert_eq!(answerer.call_count(), 1);
}

#[tokio::test]
async fn retry_recovers_fields_that_failed_validation() {
    let dir = tempfile::tempdir().unwrap();
    let template = load_template(
        dir.path(),
        r#"{
            "Has Logo": {
                "key": "has_logo",
                "prompt_ai": "Is the brand logo visible?",
                "accepted_values": ["1", "0"],
                "split_logic": "or",
                "frame_method": "regular_1s",
                "frames_used": "all",
                "split_possible": true
            },
            "Has People": {
                "key": "has_people",
                "prompt_ai": "Do people appear?",
                "accepted_values": ["1", "0"],
                "split_logic": "or",
                "frame_method": "regular_1s",
                "frames_used": "all",
                "split_possible": true
            }
        }"#,
    );

    // The primary answer for has_logo fails the enum schema, so only that
    // field goes through the retry pass.
    let answerer = Arc::new(ScriptedAnswerer::new(vec![
        r#"{"has_logo": "maybe", "has_people": "1"}"#.into(),
        r#"{"has_logo": "0"}"#.into(),
    ]));
    let orchestrator = Orchestrator::new(answerer.clone());

    let labeled = orchestrator.process(&template, &bundle(5, false)).await;

    assert_eq!(values(&labeled), [("Has Logo", "0"), ("Has People", "1")]);
    assert_eq!(answerer.call_count(), 2);
}

#[tokio::test]
async fn group_without_media_defaults_wholesale() {
    let dir = tempfile::tempdir().unwrap();
    let template = load_template(dir.path(), TEMPLATE);

    let answerer = Arc::new(ScriptedAnswerer::empty());
    let orchestrator = Orchestrator::new(answerer.clone());

    // No frames and no transcriber: neither group has any input.
    let labeled = orchestrator.process(&template, &MediaBundle::new()).await;

    assert_eq!(
        values(&labeled),
        [
            ("Has Logo", "N/A"),
            ("Visual Quality", "N/A"),
            ("Music Genre", "N/A"),
        ]
    );
    assert_eq!(answerer.call_count(), 0);
}

#[tokio::test]
async fn stub_answerer_resolves_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let template = load_template(
        dir.path(),
        r#"{
            "Scene Notes": {
                "key": "scene_notes",
                "prompt_ai": "Describe the scene.",
                "accepted_values": [],
                "frame_method": "regular_1s",
                "frames_used": "all"
            },
            "Voiceover Notes": {
                "key": "voiceover_notes",
                "prompt_ai": "Summarize the voiceover.",
                "accepted_values": [],
                "audio": "main_audio"
            }
        }"#,
    );

    let answerer = Arc::new(ScriptedAnswerer::empty());
    let orchestrator = Orchestrator::new(answerer.clone())
        .with_transcriber(Arc::new(ScriptedTranscriber::new("")));

    let labeled = orchestrator.process(&template, &bundle(5, true)).await;

    assert_eq!(
        values(&labeled),
        [("Scene Notes", "N/A"), ("Voiceover Notes", "N/A")]
    );
    assert!(answerer.call_count() > 0, "The pipeline should still make calls");
}

// ── Telemetry wiring ─────────────────────────────────────────────────────

#[tokio::test]
async fn run_recorder_observes_the_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let template = load_template(dir.path(), TEMPLATE);

    let answerer = Arc::new(ScriptedAnswerer::new(vec![
        r#"{"has_logo": "0", "visual_quality": "60"}"#.into(),
        r#"{"has_logo": "0", "visual_quality": "60"}"#.into(),
        r#"{"has_logo": "0", "visual_quality": "60"}"#.into(),
        r#"{"music_genre": "ambient"}"#.into(),
    ]));
    let orchestrator = Orchestrator::new(answerer)
        .with_transcriber(Arc::new(ScriptedTranscriber::new("calm ambient music")));

    let recorder = Arc::new(RunRecorder::new());
    let listener = recorder.spawn_listener(orchestrator.events());

    orchestrator.process(&template, &bundle(25, true)).await;

    drop(orchestrator);
    listener.await.unwrap();

    let summary = recorder.summary();
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.calls, 4);
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.too_heavy_groups, 0);

    let frames_trace = recorder.group_trace("regular_1s/-").unwrap();
    assert_eq!(frames_trace.chunk_count, 3);
    assert_eq!(frames_trace.field_count, 2);
    assert!(frames_trace.ended_at.is_some());
}
