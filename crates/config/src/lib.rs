//! Configuration loading, validation, and management for Cliplens.
//!
//! Loads configuration from `~/.cliplens/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use cliplens_engine::{CharCostModel, EngineOptions, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.cliplens/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the answerer and transcriber endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Vision model used to answer chunks
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used to transcribe audio
    #[serde(default = "default_transcript_model")]
    pub transcript_model: String,

    /// Completion token cap per answerer call
    #[serde(default = "default_max_answer_tokens")]
    pub max_answer_tokens: u32,

    /// Batching engine limits
    #[serde(default)]
    pub engine: EngineSection,

    /// Media handling settings
    #[serde(default)]
    pub media: MediaSection,

    /// Run tracing settings
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_transcript_model() -> String {
    "gpt-4o-transcribe".into()
}
fn default_max_answer_tokens() -> u32 {
    8000
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("transcript_model", &self.transcript_model)
            .field("max_answer_tokens", &self.max_answer_tokens)
            .field("engine", &self.engine)
            .field("media", &self.media)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

/// Batching engine limits, `[engine]` in the TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Per-call token budget for the primary pass
    #[serde(default = "default_primary_budget")]
    pub primary_budget: usize,

    /// Smaller per-call budget for the retry pass
    #[serde(default = "default_retry_budget")]
    pub retry_budget: usize,

    /// Largest image window per chunk
    #[serde(default = "default_max_images_per_chunk")]
    pub max_images_per_chunk: usize,

    /// Chunk ceiling for the primary pass
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Chunk ceiling for the retry pass
    #[serde(default = "default_retry_max_chunks")]
    pub retry_max_chunks: usize,

    /// Flat token cost assumed per attached image
    #[serde(default = "default_image_token_cost")]
    pub image_token_cost: usize,

    /// Concurrent answerer calls within a pass
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retry eligibility: "never_valid" or "any_invalid"
    #[serde(default = "default_retry_policy")]
    pub retry_policy: RetryPolicy,
}

fn default_primary_budget() -> usize {
    8000
}
fn default_retry_budget() -> usize {
    6000
}
fn default_max_images_per_chunk() -> usize {
    10
}
fn default_max_chunks() -> usize {
    15
}
fn default_retry_max_chunks() -> usize {
    10
}
fn default_image_token_cost() -> usize {
    100
}
fn default_concurrency() -> usize {
    4
}
fn default_retry_policy() -> RetryPolicy {
    RetryPolicy::NeverValid
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            primary_budget: default_primary_budget(),
            retry_budget: default_retry_budget(),
            max_images_per_chunk: default_max_images_per_chunk(),
            max_chunks: default_max_chunks(),
            retry_max_chunks: default_retry_max_chunks(),
            image_token_cost: default_image_token_cost(),
            concurrency: default_concurrency(),
            retry_policy: default_retry_policy(),
        }
    }
}

/// Media handling settings, `[media]` in the TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSection {
    /// Reference sampling method for density ratios
    #[serde(default = "default_baseline_method")]
    pub baseline_method: String,
}

fn default_baseline_method() -> String {
    "regular_1s".into()
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            baseline_method: default_baseline_method(),
        }
    }
}

/// Run tracing settings, `[telemetry]` in the TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySection {
    /// Whether the run recorder is attached
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.cliplens/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CLIPLENS_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `CLIPLENS_MODEL` overrides the vision model
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("CLIPLENS_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("CLIPLENS_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".cliplens")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.primary_budget == 0 || self.engine.retry_budget == 0 {
            return Err(ConfigError::ValidationError(
                "engine budgets must be greater than zero".into(),
            ));
        }

        if self.engine.max_images_per_chunk == 0 {
            return Err(ConfigError::ValidationError(
                "max_images_per_chunk must be at least 1".into(),
            ));
        }

        if self.engine.max_chunks == 0 || self.engine.retry_max_chunks == 0 {
            return Err(ConfigError::ValidationError(
                "chunk ceilings must be at least 1".into(),
            ));
        }

        if self.engine.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "concurrency must be at least 1".into(),
            ));
        }

        if self.api_url.is_empty() {
            return Err(ConfigError::ValidationError("api_url must not be empty".into()));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build engine options from the `[engine]` and `[media]` sections.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            primary_budget: self.engine.primary_budget,
            retry_budget: self.engine.retry_budget,
            max_images_per_chunk: self.engine.max_images_per_chunk,
            max_chunks: self.engine.max_chunks,
            retry_max_chunks: self.engine.retry_max_chunks,
            concurrency: self.engine.concurrency,
            retry_policy: self.engine.retry_policy,
            baseline_method: self.media.baseline_method.clone(),
        }
    }

    /// Build the token cost model from the `[engine]` section.
    pub fn cost_model(&self) -> CharCostModel {
        CharCostModel::new(self.engine.image_token_cost)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            transcript_model: default_transcript_model(),
            max_answer_tokens: default_max_answer_tokens(),
            engine: EngineSection::default(),
            media: MediaSection::default(),
            telemetry: TelemetrySection::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
