//! Scripted in-memory answerer and transcriber.
//!
//! Replays a queue of canned responses in order, then falls back to
//! synthesizing an all-`N/A` object for whatever fields were asked. Used
//! by integration tests and by dry runs that exercise the full pipeline
//! without touching a network.

use async_trait::async_trait;
use cliplens_core::answerer::{Answerer, Transcriber};
use cliplens_core::error::AnswererError;
use cliplens_core::field::FieldSpec;
use cliplens_core::media::FrameRef;
use cliplens_core::NOT_AVAILABLE;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

/// An answerer that replays queued responses.
pub struct ScriptedAnswerer {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl ScriptedAnswerer {
    /// Create an answerer that replays `responses` in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(0),
        }
    }

    /// Create an answerer with no queued responses; every call synthesizes
    /// an all-`N/A` object.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// How many times `answer` has been called.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn synthesize(fields: &[FieldSpec]) -> String {
        let mut object = serde_json::Map::new();
        for field in fields {
            object.insert(field.key.clone(), NOT_AVAILABLE.into());
        }
        serde_json::Value::Object(object).to_string()
    }
}

#[async_trait]
impl Answerer for ScriptedAnswerer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn answer(
        &self,
        fields: &[FieldSpec],
        _images: &[FrameRef],
        _transcript: &[String],
    ) -> std::result::Result<String, AnswererError> {
        *self.calls.lock().unwrap() += 1;
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| Self::synthesize(fields)))
    }
}

/// A transcriber that returns a fixed transcript for every file.
pub struct ScriptedTranscriber {
    text: String,
}

impl ScriptedTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn transcribe(&self, _audio: &Path) -> std::result::Result<String, AnswererError> {
        Ok(self.text.clone())
    }
}
