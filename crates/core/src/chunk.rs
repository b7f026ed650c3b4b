//! Work units and answer accumulation.
//!
//! A `Chunk` is one bounded unit of work (field subset + media subset) sent
//! to the answerer in a single call. Chunks are created and discarded per
//! splitting pass; the `MergeTable` accumulates weighted answers across the
//! primary and retry passes and is consumed exactly once by the merger.

use crate::media::FrameRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One bounded call to the answerer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Field keys, in declared order, no duplicates within a pass.
    pub fields: Vec<String>,

    /// The media window this call sees.
    pub images: Vec<FrameRef>,

    /// Transcript lines, shared unsplit across chunks.
    pub transcript: Vec<String>,

    /// Number of image items, or 1 for an audio/text-only chunk.
    /// Used to proportion merge contributions.
    pub weight: u32,
}

impl Chunk {
    pub fn new(fields: Vec<String>, images: Vec<FrameRef>, transcript: Vec<String>) -> Self {
        let weight = if images.is_empty() { 1 } else { images.len() as u32 };
        Self { fields, images, transcript, weight }
    }
}

/// The raw key→value mapping parsed from one answerer response.
///
/// May contain unknown keys; may be empty when the response was unparsable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnswer(BTreeMap<String, String>);

impl RawAnswer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for RawAnswer {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A raw answer split into schema-conforming and rejected values.
#[derive(Debug, Clone, Default)]
pub struct ValidatedAnswer {
    /// Values that satisfy their field's accepted-value schema.
    pub valid: BTreeMap<String, String>,

    /// Values rejected by the schema, kept for retry bookkeeping.
    pub invalid: BTreeMap<String, String>,
}

/// One weighted partial answer for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedValue {
    pub value: String,
    pub weight: u32,
}

/// Per-field accumulation of weighted answers across both passes.
#[derive(Debug, Clone, Default)]
pub struct MergeTable {
    entries: BTreeMap<String, Vec<WeightedValue>>,
}

impl MergeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one weighted value for a field.
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<String>, weight: u32) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(WeightedValue { value: value.into(), weight });
    }

    /// Whether any chunk produced a value for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<WeightedValue>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_weight_is_image_count() {
        let images = vec![FrameRef::from_b64("aaaa"), FrameRef::from_b64("bbbb")];
        let chunk = Chunk::new(vec!["f1".into()], images, vec![]);
        assert_eq!(chunk.weight, 2);
    }

    #[test]
    fn text_only_chunk_weighs_one() {
        let chunk = Chunk::new(vec!["f1".into()], vec![], vec!["a transcript".into()]);
        assert_eq!(chunk.weight, 1);
    }

    #[test]
    fn merge_table_accumulates_per_field() {
        let mut table = MergeTable::new();
        table.record("f", "1", 10);
        table.record("f", "0", 5);
        table.record("g", "42", 1);

        assert!(table.contains("f"));
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].1,
            &vec![
                WeightedValue { value: "1".into(), weight: 10 },
                WeightedValue { value: "0".into(), weight: 5 }
            ]
        );
    }

    #[test]
    fn raw_answer_collects_pairs() {
        let raw: RawAnswer = [("k".to_string(), "v".to_string())].into_iter().collect();
        assert_eq!(raw.get("k"), Some("v"));
        assert_eq!(raw.len(), 1);
    }
}
