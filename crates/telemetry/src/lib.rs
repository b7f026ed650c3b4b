//! Run tracing for the Cliplens engine.
//!
//! Records per-call spans and per-group traces from the engine's event
//! stream and aggregates them into a run summary. The CLI attaches a
//! [`RunRecorder`] to the orchestrator's event bus and prints the summary
//! after processing.

pub mod engine;
pub mod model;

pub use engine::RunRecorder;
pub use model::{CallSpan, GroupTrace, RunSummary};
