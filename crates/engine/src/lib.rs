//! # Cliplens Engine
//!
//! The adaptive batching and reconciliation engine. Given a set of field
//! declarations and a media bundle, it:
//!
//! 1. Groups fields by shared media requirement
//! 2. Splits each group into calls that fit a token budget (greedy
//!    first-fit over image windows × field subsets)
//! 3. Validates each call's answers against per-field schemas
//! 4. Retries only the fields that failed validation (one retry pass)
//! 5. Merges weighted partial answers via per-field aggregation semantics
//!
//! The answerer is injected as a trait object; this crate never talks to
//! the network itself.

pub mod estimate;
pub mod group;
pub mod merge;
pub mod orchestrator;
pub mod parse;
pub mod split;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use estimate::{CharCostModel, CostModel};
pub use group::{group_fields, FieldGroup};
pub use merge::merge;
pub use orchestrator::{EngineOptions, Orchestrator, RetryPolicy};
pub use parse::parse_answer;
pub use split::{split, SplitOutcome, SplitParams};
pub use validate::validate;
