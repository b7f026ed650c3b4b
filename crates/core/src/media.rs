//! Media references — ordered frame lists, audio sources, and sampling
//! density ratios.
//!
//! The engine only ever consumes counts and ordered references; pixel data
//! and decoding live outside this workspace. A `FrameRef` carries the
//! already-encoded JPEG payload the answerer expects.

use crate::field::FramePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// One ordered media item: an encoded frame ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    /// Where the frame came from, when known (diagnostics only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    /// Base64-encoded JPEG payload.
    pub jpeg_b64: String,
}

impl FrameRef {
    pub fn from_b64(jpeg_b64: impl Into<String>) -> Self {
        Self { source: None, jpeg_b64: jpeg_b64.into() }
    }

    pub fn from_path(source: impl Into<PathBuf>, jpeg_b64: impl Into<String>) -> Self {
        Self { source: Some(source.into()), jpeg_b64: jpeg_b64.into() }
    }
}

/// Everything extracted from one video, keyed by sampling method / audio key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaBundle {
    /// Ordered frame lists per sampling method (e.g. "regular_1s").
    #[serde(default)]
    pub frames: HashMap<String, Vec<FrameRef>>,

    /// Audio file paths per audio key (e.g. "main_audio").
    #[serde(default)]
    pub audio: HashMap<String, Vec<PathBuf>>,
}

impl MediaBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_for(&self, method: &str) -> Option<&[FrameRef]> {
        self.frames.get(method).map(Vec::as_slice)
    }

    pub fn audio_for(&self, key: &str) -> Option<&[PathBuf]> {
        self.audio.get(key).map(Vec::as_slice)
    }
}

/// Apply a frame policy to a method's ordered frame list.
///
/// `RandomN` samples without replacement but keeps the survivors in their
/// original temporal order.
pub fn select_frames(frames: &[FrameRef], policy: FramePolicy) -> Vec<FrameRef> {
    if frames.is_empty() {
        return Vec::new();
    }
    match policy {
        FramePolicy::All => frames.to_vec(),
        FramePolicy::FirstN(n) => frames[..n.min(frames.len())].to_vec(),
        FramePolicy::LastN(n) => frames[frames.len().saturating_sub(n)..].to_vec(),
        FramePolicy::RandomN(n) => {
            let amount = n.min(frames.len());
            let mut rng = rand::rng();
            let mut picked = rand::seq::index::sample(&mut rng, frames.len(), amount).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|i| frames[i].clone()).collect()
        }
    }
}

/// Sampling-density ratios per frame method, baselined on a reference
/// method. Used to normalize count-based aggregations back to a canonical
/// density. Absent entries default to 1.0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ratios(HashMap<String, f64>);

impl Ratios {
    /// Compute `len(frames[method]) / len(frames[baseline])` for every
    /// method in the bundle. A missing or empty baseline falls back to a
    /// count of 1 so every ratio stays finite.
    pub fn compute(bundle: &MediaBundle, baseline_method: &str) -> Self {
        let baseline = bundle.frames.get(baseline_method).map_or(0, Vec::len);
        let baseline = if baseline == 0 {
            warn!(baseline_method, "No baseline frames found, defaulting ratios to 1");
            1
        } else {
            baseline
        };

        let ratios = bundle
            .frames
            .iter()
            .map(|(method, frames)| (method.clone(), frames.len() as f64 / baseline as f64))
            .collect();
        Self(ratios)
    }

    /// The ratio for `method`, or 1.0 when unknown.
    pub fn ratio_for(&self, method: Option<&str>) -> f64 {
        method.and_then(|m| self.0.get(m)).copied().unwrap_or(1.0)
    }

    /// Build a ratio table from explicit entries.
    pub fn from_entries(entries: &[(&str, f64)]) -> Self {
        Self(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }
}
