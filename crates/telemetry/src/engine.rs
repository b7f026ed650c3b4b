//! Thread-safe run recorder fed by the engine's event stream.

use crate::model::{CallSpan, GroupTrace, RunSummary};
use cliplens_core::event::{EngineEvent, EventBus};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Collects engine events into per-group traces and run totals.
///
/// Thread-safe via `RwLock`. Feed it events directly with [`record`],
/// or attach it to an [`EventBus`] with [`spawn_listener`] and let a
/// background task drain the stream.
///
/// [`record`]: RunRecorder::record
/// [`spawn_listener`]: RunRecorder::spawn_listener
pub struct RunRecorder {
    /// One trace per field-group, in first-observation order.
    traces: RwLock<Vec<GroupTrace>>,
    /// Audio files that could not be transcribed.
    transcription_failures: RwLock<usize>,
}

impl RunRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            traces: RwLock::new(Vec::new()),
            transcription_failures: RwLock::new(0),
        }
    }

    /// Subscribe to the bus and record every event until it closes.
    pub fn spawn_listener(self: &Arc<Self>, bus: &EventBus) -> tokio::task::JoinHandle<()> {
        let recorder = Arc::clone(self);
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => recorder.record(&event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Run recorder lagged behind the event stream");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Record a single engine event.
    pub fn record(&self, event: &EngineEvent) {
        match event {
            EngineEvent::GroupStarted {
                group,
                field_count,
                chunk_count,
                ..
            } => {
                let mut traces = self.traces.write().unwrap();
                let trace = Self::trace_mut(&mut traces, group);
                trace.field_count = *field_count;
                trace.chunk_count = *chunk_count;
            }

            EngineEvent::GroupTooHeavy { group, .. } => {
                let mut traces = self.traces.write().unwrap();
                let trace = Self::trace_mut(&mut traces, group);
                trace.too_heavy = true;
                trace.end();
            }

            EngineEvent::ChunkAnswered {
                group,
                pass,
                chunk_index,
                field_count,
                image_count,
                estimated_tokens,
                valid_count,
                invalid_count,
                duration_ms,
                timestamp,
            } => {
                let mut traces = self.traces.write().unwrap();
                let trace = Self::trace_mut(&mut traces, group);
                trace.add_span(CallSpan {
                    group: group.clone(),
                    pass: *pass,
                    chunk_index: *chunk_index,
                    field_count: *field_count,
                    image_count: *image_count,
                    estimated_tokens: *estimated_tokens,
                    valid_count: *valid_count,
                    invalid_count: *invalid_count,
                    duration_ms: *duration_ms,
                    success: true,
                    error: None,
                    timestamp: *timestamp,
                });
            }

            EngineEvent::ChunkFailed {
                group,
                pass,
                chunk_index,
                error,
                duration_ms,
                timestamp,
            } => {
                let mut traces = self.traces.write().unwrap();
                let trace = Self::trace_mut(&mut traces, group);
                trace.add_span(CallSpan {
                    group: group.clone(),
                    pass: *pass,
                    chunk_index: *chunk_index,
                    field_count: 0,
                    image_count: 0,
                    estimated_tokens: 0,
                    valid_count: 0,
                    invalid_count: 0,
                    duration_ms: *duration_ms,
                    success: false,
                    error: Some(error.clone()),
                    timestamp: *timestamp,
                });
            }

            EngineEvent::RetryScheduled {
                group, field_count, ..
            } => {
                let mut traces = self.traces.write().unwrap();
                let trace = Self::trace_mut(&mut traces, group);
                trace.retried_fields += field_count;
            }

            EngineEvent::GroupMerged {
                group,
                defaulted_count,
                ..
            } => {
                let mut traces = self.traces.write().unwrap();
                let trace = Self::trace_mut(&mut traces, group);
                trace.defaulted_fields = *defaulted_count;
                trace.end();
            }

            EngineEvent::TranscriptionFailed { .. } => {
                *self.transcription_failures.write().unwrap() += 1;
            }
        }
    }

    fn trace_mut<'a>(traces: &'a mut Vec<GroupTrace>, group: &str) -> &'a mut GroupTrace {
        if let Some(i) = traces.iter().position(|t| t.group == group) {
            return &mut traces[i];
        }
        traces.push(GroupTrace::new(group));
        traces.last_mut().unwrap()
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// All recorded traces, in first-observation order.
    pub fn traces(&self) -> Vec<GroupTrace> {
        self.traces.read().unwrap().clone()
    }

    /// The trace for one group signature, if observed.
    pub fn group_trace(&self, group: &str) -> Option<GroupTrace> {
        self.traces
            .read()
            .unwrap()
            .iter()
            .find(|t| t.group == group)
            .cloned()
    }

    /// Aggregate the run so far.
    pub fn summary(&self) -> RunSummary {
        let traces = self.traces.read().unwrap();
        RunSummary {
            groups: traces.len(),
            too_heavy_groups: traces.iter().filter(|t| t.too_heavy).count(),
            calls: traces.iter().map(GroupTrace::call_count).sum(),
            failures: traces.iter().map(GroupTrace::failure_count).sum(),
            retried_fields: traces.iter().map(|t| t.retried_fields).sum(),
            defaulted_fields: traces.iter().map(|t| t.defaulted_fields).sum(),
            estimated_tokens: traces.iter().map(GroupTrace::total_estimated_tokens).sum(),
            transcription_failures: *self.transcription_failures.read().unwrap(),
        }
    }
}

impl Default for RunRecorder {
    fn default() -> Self {
        Self::new()
    }
}
