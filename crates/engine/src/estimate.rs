//! Token estimation for planned calls.
//!
//! Uses a character-based heuristic: ~4 characters per token, accurate
//! within ~10% for BPE tokenizers on English text. Images cost a fixed
//! constant each. The estimator renders the exact prompt text the
//! providers send, so the splitter's budget checks track the wire.

use cliplens_core::field::FieldSpec;
use cliplens_core::prompt::render_system_prompt;

/// Injected cost function for prompt text and images.
pub trait CostModel: Send + Sync {
    /// Estimated token count for a piece of prompt text.
    fn text_tokens(&self, text: &str) -> usize;

    /// Estimated token count for one attached image.
    fn image_tokens(&self) -> usize;
}

/// The default heuristic: 1 token ≈ 4 characters, rounded up, plus a
/// fixed per-image constant.
#[derive(Debug, Clone, Copy)]
pub struct CharCostModel {
    image_cost: usize,
}

impl CharCostModel {
    pub fn new(image_cost: usize) -> Self {
        Self { image_cost }
    }
}

impl Default for CharCostModel {
    fn default() -> Self {
        Self { image_cost: 100 }
    }
}

impl CostModel for CharCostModel {
    fn text_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.len() + 3) / 4
    }

    fn image_tokens(&self) -> usize {
        self.image_cost
    }
}

/// Estimate the total cost of one planned call: the rendered prompt for
/// this field subset and transcript, plus `image_count` images.
pub fn estimate_call(
    cost: &dyn CostModel,
    fields: &[FieldSpec],
    image_count: usize,
    transcript: &[String],
) -> usize {
    let prompt = render_system_prompt(fields, transcript, image_count > 0);
    cost.text_tokens(&prompt) + image_count * cost.image_tokens()
}
