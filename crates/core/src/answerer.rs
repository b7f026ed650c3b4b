//! Answerer trait — the abstraction over multimodal model backends.
//!
//! An Answerer turns a field subset plus a media window into raw text.
//! It models network/model latency and failure; the engine catches its
//! errors per chunk and never retries transport failures itself.
//!
//! Implementations: OpenAI-compatible vision endpoints, scripted stubs.

use crate::error::AnswererError;
use crate::field::FieldSpec;
use crate::media::FrameRef;
use async_trait::async_trait;
use std::path::Path;

/// The external capability that answers one chunk.
#[async_trait]
pub trait Answerer: Send + Sync {
    /// A human-readable name for this answerer (e.g. "openai", "scripted").
    fn name(&self) -> &str;

    /// Convert a field subset and a media window into raw response text.
    ///
    /// The text is expected to contain a JSON object mapping field keys to
    /// values, but callers must tolerate anything.
    async fn answer(
        &self,
        fields: &[FieldSpec],
        images: &[FrameRef],
        transcript: &[String],
    ) -> std::result::Result<String, AnswererError>;

    /// Health check — can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, AnswererError> {
        Ok(true)
    }
}

/// The external capability that turns audio files into transcript text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// A human-readable name for this transcriber.
    fn name(&self) -> &str;

    /// Transcribe one audio file.
    async fn transcribe(&self, audio: &Path) -> std::result::Result<String, AnswererError>;
}
