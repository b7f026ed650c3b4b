//! # Cliplens Core
//!
//! Domain types, traits, and error definitions for the Cliplens video
//! extraction engine. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability (the multimodal answerer, the transcriber) is
//! defined as a trait here. Implementations live in their respective crates.
//! This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod answerer;
pub mod chunk;
pub mod error;
pub mod event;
pub mod field;
pub mod media;
pub mod prompt;
pub mod template;

// Re-export key types at crate root for ergonomics
pub use answerer::{Answerer, Transcriber};
pub use chunk::{Chunk, MergeTable, RawAnswer, ValidatedAnswer, WeightedValue};
pub use error::{AnswererError, EngineError, Error, Result, TemplateError};
pub use event::{EngineEvent, EventBus};
pub use field::{AcceptedSpec, AggKind, FieldSpec, FramePolicy, GroupSignature, MediaRequirement};
pub use media::{FrameRef, MediaBundle, Ratios};
pub use template::Template;

/// The sentinel value for "no identifiable answer".
///
/// Accepted by every field schema and used as the default for any field
/// that was never answered.
pub const NOT_AVAILABLE: &str = "N/A";
