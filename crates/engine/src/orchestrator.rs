//! Batch orchestration — the primary/retry driver for one run.
//!
//! Per field-group: split, answer every chunk (bounded concurrency),
//! validate, compute the retry set from the fully-settled primary pass,
//! run at most one restricted retry pass, then merge and default.
//!
//! The answerer is the only suspension point. Its failures are caught per
//! chunk and never abort the group; accumulation into the merge table
//! happens in chunk order after each pass settles.

use crate::estimate::{estimate_call, CharCostModel, CostModel};
use crate::group::{group_fields, FieldGroup};
use crate::merge::merge;
use crate::parse::parse_answer;
use crate::split::{split, SplitOutcome, SplitParams};
use crate::validate::validate;
use chrono::Utc;
use cliplens_core::answerer::{Answerer, Transcriber};
use cliplens_core::chunk::{Chunk, MergeTable, ValidatedAnswer};
use cliplens_core::error::EngineError;
use cliplens_core::event::{EngineEvent, EventBus, Pass};
use cliplens_core::field::{FieldSpec, FramePolicy};
use cliplens_core::media::{select_frames, FrameRef, MediaBundle, Ratios};
use cliplens_core::template::Template;
use cliplens_core::NOT_AVAILABLE;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Which fields qualify for the retry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Retry fields that were invalid somewhere and valid nowhere.
    NeverValid,

    /// Retry fields that were invalid anywhere, even if also valid.
    AnyInvalid,
}

/// Tunable limits for one engine run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Per-call token budget for the primary pass.
    pub primary_budget: usize,

    /// Smaller per-call budget for the retry pass.
    pub retry_budget: usize,

    /// Largest image window per chunk.
    pub max_images_per_chunk: usize,

    /// Chunk ceiling for the primary pass.
    pub max_chunks: usize,

    /// Chunk ceiling for the retry pass.
    pub retry_max_chunks: usize,

    /// Concurrent answerer calls within a pass.
    pub concurrency: usize,

    /// Retry eligibility policy.
    pub retry_policy: RetryPolicy,

    /// Reference sampling method for density ratios.
    pub baseline_method: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            primary_budget: 8000,
            retry_budget: 6000,
            max_images_per_chunk: 10,
            max_chunks: 15,
            retry_max_chunks: 10,
            concurrency: 4,
            retry_policy: RetryPolicy::NeverValid,
            baseline_method: "regular_1s".to_string(),
        }
    }
}

/// Drives the full pipeline: grouping, splitting, answering, validation,
/// retry, and merging.
pub struct Orchestrator {
    answerer: Arc<dyn Answerer>,
    transcriber: Option<Arc<dyn Transcriber>>,
    cost: Arc<dyn CostModel>,
    options: EngineOptions,
    events: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(answerer: Arc<dyn Answerer>) -> Self {
        Self {
            answerer,
            transcriber: None,
            cost: Arc::new(CharCostModel::default()),
            options: EngineOptions::default(),
            events: Arc::new(EventBus::default()),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_cost_model(mut self, cost: Arc<dyn CostModel>) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// The event bus this orchestrator publishes to.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Process a full template against a media bundle and re-key the result
    /// to the template's labels.
    pub async fn process(
        &self,
        template: &Template,
        bundle: &MediaBundle,
    ) -> Vec<(String, String)> {
        let specs: Vec<FieldSpec> = template.fields().cloned().collect();
        let results = self.process_fields(&specs, bundle).await;
        template.remap_to_labels(&results)
    }

    /// Process field specs against a media bundle.
    ///
    /// The result contains every declared key, each with a merged value or
    /// "N/A". Groups that cannot run (no media, no transcript) default
    /// wholesale.
    pub async fn process_fields(
        &self,
        specs: &[FieldSpec],
        bundle: &MediaBundle,
    ) -> BTreeMap<String, String> {
        let ratios = Ratios::compute(bundle, &self.options.baseline_method);
        let mut results = BTreeMap::new();

        for group in group_fields(specs) {
            let images = self.collect_images(&group, bundle);
            let transcript = self.collect_transcript(&group, bundle).await;

            match self.process_group(&group, images, transcript, &ratios).await {
                Ok(merged) => results.extend(merged),
                Err(e) => {
                    warn!(group = %group.signature, error = %e, "Skipping field group");
                    for key in group.keys() {
                        results.insert(key, NOT_AVAILABLE.to_string());
                    }
                }
            }
        }

        info!(fields = results.len(), "Run complete");
        results
    }

    /// Process one field-group: primary pass, optional retry pass, merge.
    pub async fn process_group(
        &self,
        group: &FieldGroup,
        images: Vec<FrameRef>,
        transcript: Vec<String>,
        ratios: &Ratios,
    ) -> Result<BTreeMap<String, String>, EngineError> {
        let group_name = group.signature.to_string();
        if images.is_empty() && transcript.is_empty() {
            return Err(EngineError::NoInput { group: group_name });
        }

        let primary = SplitParams {
            budget: self.options.primary_budget,
            max_images_per_chunk: self.options.max_images_per_chunk,
            max_chunks: self.options.max_chunks,
            split_images: group.signature.splittable,
        };

        let chunks = match split(&group.fields, &images, &transcript, self.cost.as_ref(), primary) {
            SplitOutcome::TooHeavy { needed } => {
                warn!(
                    group = %group_name,
                    needed,
                    max = self.options.max_chunks,
                    "Field group too heavy to split, defaulting all fields"
                );
                self.events.publish(EngineEvent::GroupTooHeavy {
                    group: group_name,
                    needed,
                    max: self.options.max_chunks,
                    timestamp: Utc::now(),
                });
                return Ok(group
                    .keys()
                    .into_iter()
                    .map(|k| (k, NOT_AVAILABLE.to_string()))
                    .collect());
            }
            SplitOutcome::Chunks(chunks) => chunks,
        };

        self.events.publish(EngineEvent::GroupStarted {
            group: group_name.clone(),
            field_count: group.fields.len(),
            chunk_count: chunks.len(),
            timestamp: Utc::now(),
        });

        let mut table = MergeTable::new();
        let mut ever_valid: BTreeSet<String> = BTreeSet::new();
        let mut ever_invalid: BTreeSet<String> = BTreeSet::new();

        // Primary pass: only valid values enter the table.
        for (chunk, validated) in self.answer_pass(&group.fields, &chunks, Pass::Primary, &group_name).await {
            for (key, value) in &validated.valid {
                table.record(key.clone(), value.clone(), chunk.weight);
                ever_valid.insert(key.clone());
            }
            for key in validated.invalid.keys() {
                ever_invalid.insert(key.clone());
            }
        }

        let retry_keys: BTreeSet<&String> = match self.options.retry_policy {
            RetryPolicy::NeverValid => {
                ever_invalid.iter().filter(|k| !ever_valid.contains(*k)).collect()
            }
            RetryPolicy::AnyInvalid => ever_invalid.iter().collect(),
        };

        if !retry_keys.is_empty() {
            let retry_fields: Vec<FieldSpec> = group
                .fields
                .iter()
                .filter(|f| retry_keys.contains(&f.key))
                .cloned()
                .collect();
            self.retry_pass(
                &retry_fields,
                &images,
                &transcript,
                group.signature.splittable,
                &group_name,
                &mut table,
            )
            .await;
        }

        let mut merged = merge(&table, &group.fields, ratios, group.signature.frame_method.as_deref());
        let mut defaulted_count = 0;
        for key in group.keys() {
            merged.entry(key).or_insert_with(|| {
                defaulted_count += 1;
                NOT_AVAILABLE.to_string()
            });
        }

        self.events.publish(EngineEvent::GroupMerged {
            group: group_name,
            field_count: group.fields.len(),
            defaulted_count,
            timestamp: Utc::now(),
        });
        Ok(merged)
    }

    /// One restricted retry pass. Every returned value merges, valid or not.
    async fn retry_pass(
        &self,
        retry_fields: &[FieldSpec],
        images: &[FrameRef],
        transcript: &[String],
        split_images: bool,
        group_name: &str,
        table: &mut MergeTable,
    ) {
        let params = SplitParams {
            budget: self.options.retry_budget,
            max_images_per_chunk: self.options.max_images_per_chunk,
            max_chunks: self.options.retry_max_chunks,
            split_images,
        };

        let chunks = match split(retry_fields, images, transcript, self.cost.as_ref(), params) {
            SplitOutcome::TooHeavy { needed } => {
                warn!(group = group_name, needed, "Retry pass too heavy, skipping retry");
                return;
            }
            SplitOutcome::Chunks(chunks) => chunks,
        };

        self.events.publish(EngineEvent::RetryScheduled {
            group: group_name.to_string(),
            field_count: retry_fields.len(),
            chunk_count: chunks.len(),
            timestamp: Utc::now(),
        });

        for (chunk, validated) in self.answer_pass(retry_fields, &chunks, Pass::Retry, group_name).await {
            for (key, value) in validated.valid.iter().chain(validated.invalid.iter()) {
                table.record(key.clone(), value.clone(), chunk.weight);
            }
        }
    }

    /// Answer every chunk of one pass with bounded concurrency.
    ///
    /// Results are re-ordered by chunk index after the pass settles, so
    /// accumulation is deterministic regardless of completion order. Failed
    /// chunks are dropped here; their fields simply contribute nothing.
    async fn answer_pass<'a>(
        &self,
        fields: &[FieldSpec],
        chunks: &'a [Chunk],
        pass: Pass,
        group_name: &str,
    ) -> Vec<(&'a Chunk, ValidatedAnswer)> {
        let concurrency = self.options.concurrency.max(1);

        let mut settled: Vec<(usize, &Chunk, Option<ValidatedAnswer>)> =
            stream::iter(chunks.iter().enumerate())
                .map(|(index, chunk)| {
                    let subset: Vec<FieldSpec> = fields
                        .iter()
                        .filter(|f| chunk.fields.contains(&f.key))
                        .cloned()
                        .collect();
                    async move {
                        let started = Instant::now();
                        let outcome = self
                            .answerer
                            .answer(&subset, &chunk.images, &chunk.transcript)
                            .await;
                        let duration_ms = started.elapsed().as_millis() as u64;

                        match outcome {
                            Ok(text) => {
                                let raw = parse_answer(&text);
                                let validated = validate(&raw, &subset);
                                self.events.publish(EngineEvent::ChunkAnswered {
                                    group: group_name.to_string(),
                                    pass,
                                    chunk_index: index,
                                    field_count: subset.len(),
                                    image_count: chunk.images.len(),
                                    estimated_tokens: estimate_call(
                                        self.cost.as_ref(),
                                        &subset,
                                        chunk.images.len(),
                                        &chunk.transcript,
                                    ),
                                    valid_count: validated.valid.len(),
                                    invalid_count: validated.invalid.len(),
                                    duration_ms,
                                    timestamp: Utc::now(),
                                });
                                (index, chunk, Some(validated))
                            }
                            Err(e) => {
                                warn!(
                                    group = group_name,
                                    %pass,
                                    chunk = index,
                                    error = %e,
                                    "Answerer call failed, chunk contributes nothing"
                                );
                                self.events.publish(EngineEvent::ChunkFailed {
                                    group: group_name.to_string(),
                                    pass,
                                    chunk_index: index,
                                    error: e.to_string(),
                                    duration_ms,
                                    timestamp: Utc::now(),
                                });
                                (index, chunk, None)
                            }
                        }
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        settled.sort_by_key(|(index, _, _)| *index);
        settled
            .into_iter()
            .filter_map(|(_, chunk, validated)| validated.map(|v| (chunk, v)))
            .collect()
    }

    fn collect_images(&self, group: &FieldGroup, bundle: &MediaBundle) -> Vec<FrameRef> {
        let Some(method) = &group.signature.frame_method else {
            return Vec::new();
        };
        let Some(frames) = bundle.frames_for(method) else {
            warn!(method, "No frames extracted for sampling method");
            return Vec::new();
        };
        let policy = group.signature.frame_policy.unwrap_or(FramePolicy::All);
        select_frames(frames, policy)
    }

    async fn collect_transcript(&self, group: &FieldGroup, bundle: &MediaBundle) -> Vec<String> {
        let Some(audio_key) = &group.signature.audio_key else {
            return Vec::new();
        };
        let Some(paths) = bundle.audio_for(audio_key) else {
            warn!(audio_key, "No audio files for key");
            return Vec::new();
        };
        let Some(transcriber) = &self.transcriber else {
            warn!(audio_key, "Audio declared but no transcriber configured");
            return Vec::new();
        };

        let mut lines = Vec::new();
        for path in paths {
            match transcriber.transcribe(path).await {
                Ok(text) => lines.push(text),
                Err(e) => {
                    warn!(audio_key, path = %path.display(), error = %e, "Transcription failed, skipping file");
                    self.events.publish(EngineEvent::TranscriptionFailed {
                        audio_key: audio_key.clone(),
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }
        lines
    }
}
