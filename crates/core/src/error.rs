//! Error types for the Cliplens domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Cliplens operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Engine errors ---
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // --- Answerer errors ---
    #[error("Answerer error: {0}")]
    Answerer(#[from] AnswererError),

    // --- Template errors ---
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised by the batching/reconciliation engine itself.
///
/// Only `NoInput` is fatal for a field-group; everything else the engine
/// encounters degrades gracefully at field granularity.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("No images and no transcript supplied for group '{group}'")]
    NoInput { group: String },

    #[error("Field group needs {needed} chunks but the ceiling is {max}")]
    SpecTooHeavy { needed: usize, max: usize },
}

/// Errors from the external multimodal answerer / transcriber.
#[derive(Debug, Clone, Error)]
pub enum AnswererError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Answerer not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),
}

/// Errors raised while loading or interpreting a field template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse template at {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unsupported frame policy: {0}")]
    UnknownFramePolicy(String),

    #[error("Template entry '{label}' has no key")]
    MissingKey { label: String },
}
