//! Chunk splitting — two-level greedy first-fit packing.
//!
//! Level one partitions the image list into order-preserving windows of
//! bounded size. Level two packs fields into each window under the token
//! budget, in declared order. The result is a partition: every
//! (field, window) pair lands in exactly one chunk per pass.
//!
//! Packing is greedy and local; it never reorders fields to improve fit.

use crate::estimate::{estimate_call, CostModel};
use cliplens_core::chunk::Chunk;
use cliplens_core::field::FieldSpec;
use cliplens_core::media::FrameRef;
use tracing::debug;

/// Limits for one splitting pass.
#[derive(Debug, Clone, Copy)]
pub struct SplitParams {
    /// Per-call token budget.
    pub budget: usize,

    /// Largest image window.
    pub max_images_per_chunk: usize,

    /// Ceiling on total chunks per group and pass.
    pub max_chunks: usize,

    /// Whether the image list may be windowed at all.
    pub split_images: bool,
}

/// The result of one splitting pass.
#[derive(Debug, Clone)]
pub enum SplitOutcome {
    /// The group fits: a partition of (field × window) into bounded calls.
    Chunks(Vec<Chunk>),

    /// The group would need more chunks than the ceiling allows.
    TooHeavy { needed: usize },
}

/// Split a field group over its media into budget-bounded chunks.
///
/// Fields whose lone cost already exceeds the budget are still emitted as
/// single-field chunks; the budget bounds packing, not admission.
pub fn split(
    fields: &[FieldSpec],
    images: &[FrameRef],
    transcript: &[String],
    cost: &dyn CostModel,
    params: SplitParams,
) -> SplitOutcome {
    if fields.is_empty() {
        return SplitOutcome::Chunks(Vec::new());
    }

    let windows = image_windows(images, params);
    let mut chunks = Vec::new();

    for window in &windows {
        pack_window(fields, window, transcript, cost, params.budget, &mut chunks);
    }

    if chunks.len() > params.max_chunks {
        return SplitOutcome::TooHeavy { needed: chunks.len() };
    }

    debug!(
        chunks = chunks.len(),
        windows = windows.len(),
        fields = fields.len(),
        "Split field group"
    );
    SplitOutcome::Chunks(chunks)
}

/// Partition the image list into order-preserving windows.
///
/// No images means a single empty window (audio/text-only groups still get
/// exactly one call per field subset). Non-splittable media is one window
/// regardless of size.
fn image_windows(images: &[FrameRef], params: SplitParams) -> Vec<Vec<FrameRef>> {
    if images.is_empty() {
        return vec![Vec::new()];
    }
    if !params.split_images {
        return vec![images.to_vec()];
    }
    images
        .chunks(params.max_images_per_chunk.max(1))
        .map(<[FrameRef]>::to_vec)
        .collect()
}

/// Greedy first-fit packing of fields into one window.
fn pack_window(
    fields: &[FieldSpec],
    window: &[FrameRef],
    transcript: &[String],
    cost: &dyn CostModel,
    budget: usize,
    chunks: &mut Vec<Chunk>,
) {
    let mut current: Vec<FieldSpec> = Vec::new();

    for field in fields {
        current.push(field.clone());
        let estimated = estimate_call(cost, &current, window.len(), transcript);
        if estimated > budget && current.len() > 1 {
            let overflow = current.pop().unwrap_or_else(|| field.clone());
            chunks.push(make_chunk(&current, window, transcript));
            current = vec![overflow];
        }
    }

    if !current.is_empty() {
        chunks.push(make_chunk(&current, window, transcript));
    }
}

fn make_chunk(fields: &[FieldSpec], window: &[FrameRef], transcript: &[String]) -> Chunk {
    Chunk::new(
        fields.iter().map(|f| f.key.clone()).collect(),
        window.to_vec(),
        transcript.to_vec(),
    )
}
