//! Engine event system — structured progress reporting.
//!
//! Events are published as the engine plans, answers, retries, and merges,
//! keyed by group and chunk identifiers. Observability sinks (telemetry,
//! CLI progress) subscribe without coupling to the engine internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Which answering pass a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Primary,
    Retry,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Retry => write!(f, "retry"),
        }
    }
}

/// All engine events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A field-group's primary pass was planned
    GroupStarted {
        group: String,
        field_count: usize,
        chunk_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Splitting exceeded the chunk ceiling; the group resolves to "N/A"
    GroupTooHeavy {
        group: String,
        needed: usize,
        max: usize,
        timestamp: DateTime<Utc>,
    },

    /// One chunk was answered and validated
    ChunkAnswered {
        group: String,
        pass: Pass,
        chunk_index: usize,
        field_count: usize,
        image_count: usize,
        estimated_tokens: usize,
        valid_count: usize,
        invalid_count: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// One chunk's answerer call failed; its fields contribute nothing
    ChunkFailed {
        group: String,
        pass: Pass,
        chunk_index: usize,
        error: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Fields that never validated in the primary pass were queued
    RetryScheduled {
        group: String,
        field_count: usize,
        chunk_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A group's merge completed
    GroupMerged {
        group: String,
        field_count: usize,
        defaulted_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// An audio file could not be transcribed; it is skipped
    TranscriptionFailed {
        audio_key: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for engine events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they
/// care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<EngineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: EngineEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EngineEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(EngineEvent::GroupTooHeavy {
            group: "regular_1s/-".into(),
            needed: 22,
            max: 15,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            EngineEvent::GroupTooHeavy { needed, max, .. } => {
                assert_eq!(*needed, 22);
                assert_eq!(*max, 15);
            }
            _ => panic!("Expected GroupTooHeavy event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(EngineEvent::RetryScheduled {
            group: "-/main_audio".into(),
            field_count: 3,
            chunk_count: 1,
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn pass_display() {
        assert_eq!(Pass::Primary.to_string(), "primary");
        assert_eq!(Pass::Retry.to_string(), "retry");
    }
}
