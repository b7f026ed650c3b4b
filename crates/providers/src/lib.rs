//! # Cliplens Providers
//!
//! Implementations of the core `Answerer` and `Transcriber` traits:
//!
//! - `OpenAiVisionAnswerer` / `OpenAiTranscriber` — OpenAI-compatible
//!   endpoints (OpenAI, OpenRouter, vLLM, Ollama, any `/v1` clone)
//! - `ScriptedAnswerer` — in-memory replay for tests and dry runs

pub mod openai_compat;
pub mod scripted;

pub use openai_compat::{OpenAiTranscriber, OpenAiVisionAnswerer};
pub use scripted::{ScriptedAnswerer, ScriptedTranscriber};
