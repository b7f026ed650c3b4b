//! Data model for run traces: call spans, group traces, and summaries.

use chrono::{DateTime, Utc};
use cliplens_core::event::Pass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── CallSpan ──────────────────────────────────────────────────────────────

/// One answerer call observed during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSpan {
    /// Group signature this call belonged to.
    pub group: String,
    /// Which answering pass issued the call.
    pub pass: Pass,
    /// Chunk index within the pass.
    pub chunk_index: usize,
    /// Number of fields asked in this call.
    pub field_count: usize,
    /// Number of images attached.
    pub image_count: usize,
    /// Estimated prompt tokens for the call.
    pub estimated_tokens: usize,
    /// Values that passed validation.
    pub valid_count: usize,
    /// Values that failed validation.
    pub invalid_count: usize,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Whether the call returned a response at all.
    pub success: bool,
    /// The failure message, when `success` is false.
    pub error: Option<String>,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
}

// ── GroupTrace ────────────────────────────────────────────────────────────

/// Everything observed for one field-group, from planning to merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTrace {
    /// Unique trace id.
    pub id: String,
    /// Group signature (e.g. "regular_1s/-").
    pub group: String,
    /// Fields declared in the group.
    pub field_count: usize,
    /// Chunks planned for the primary pass.
    pub chunk_count: usize,
    /// Whether the chunk ceiling was exceeded (group resolved to defaults).
    pub too_heavy: bool,
    /// All answerer calls made for this group.
    pub spans: Vec<CallSpan>,
    /// Fields that were queued for a retry pass.
    pub retried_fields: usize,
    /// Fields that fell back to the default value at merge time.
    pub defaulted_fields: usize,
    /// When the group was first observed.
    pub started_at: DateTime<Utc>,
    /// When the group's merge completed.
    pub ended_at: Option<DateTime<Utc>>,
}

impl GroupTrace {
    /// Create a new trace for a group signature.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            group: group.into(),
            field_count: 0,
            chunk_count: 0,
            too_heavy: false,
            spans: Vec::new(),
            retried_fields: 0,
            defaulted_fields: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Add a call span to this trace.
    pub fn add_span(&mut self, span: CallSpan) {
        self.spans.push(span);
    }

    /// Mark the trace as complete.
    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Number of answerer calls made.
    pub fn call_count(&self) -> usize {
        self.spans.len()
    }

    /// Number of calls that failed.
    pub fn failure_count(&self) -> usize {
        self.spans.iter().filter(|s| !s.success).count()
    }

    /// Estimated prompt tokens across all calls.
    pub fn total_estimated_tokens(&self) -> usize {
        self.spans.iter().map(|s| s.estimated_tokens).sum()
    }

    /// Total wall-clock milliseconds spent in answerer calls.
    pub fn total_duration_ms(&self) -> u64 {
        self.spans.iter().map(|s| s.duration_ms).sum()
    }
}

// ── RunSummary ────────────────────────────────────────────────────────────

/// Aggregate view of one processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Field-groups processed.
    pub groups: usize,
    /// Groups that exceeded the chunk ceiling.
    pub too_heavy_groups: usize,
    /// Answerer calls made across all groups and passes.
    pub calls: usize,
    /// Calls that failed.
    pub failures: usize,
    /// Fields that went through a retry pass.
    pub retried_fields: usize,
    /// Fields that fell back to the default value.
    pub defaulted_fields: usize,
    /// Estimated prompt tokens across the run.
    pub estimated_tokens: usize,
    /// Audio files that could not be transcribed.
    pub transcription_failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(success: bool, tokens: usize) -> CallSpan {
        CallSpan {
            group: "regular_1s/-".into(),
            pass: Pass::Primary,
            chunk_index: 0,
            field_count: 2,
            image_count: 5,
            estimated_tokens: tokens,
            valid_count: 2,
            invalid_count: 0,
            duration_ms: 40,
            success,
            error: if success { None } else { Some("network".into()) },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn trace_aggregates_spans() {
        let mut trace = GroupTrace::new("regular_1s/-");
        trace.add_span(span(true, 1200));
        trace.add_span(span(false, 800));
        trace.add_span(span(true, 400));
        trace.end();

        assert_eq!(trace.call_count(), 3);
        assert_eq!(trace.failure_count(), 1);
        assert_eq!(trace.total_estimated_tokens(), 2400);
        assert_eq!(trace.total_duration_ms(), 120);
        assert!(trace.ended_at.is_some());
    }

    #[test]
    fn new_trace_starts_empty() {
        let trace = GroupTrace::new("-/main_audio");
        assert_eq!(trace.call_count(), 0);
        assert_eq!(trace.failure_count(), 0);
        assert!(!trace.too_heavy);
        assert!(trace.ended_at.is_none());
    }

    #[test]
    fn trace_serialization_roundtrip() {
        let mut trace = GroupTrace::new("regular_1s/-");
        trace.field_count = 4;
        trace.add_span(span(true, 100));
        trace.end();

        let json = serde_json::to_string(&trace).unwrap();
        let roundtrip: GroupTrace = serde_json::from_str(&json).unwrap();

        assert_eq!(roundtrip.group, "regular_1s/-");
        assert_eq!(roundtrip.field_count, 4);
        assert_eq!(roundtrip.spans.len(), 1);
        assert_eq!(roundtrip.spans[0].pass, Pass::Primary);
    }
}
