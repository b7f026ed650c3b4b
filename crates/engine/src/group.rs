//! Field grouping by shared media requirement.
//!
//! Fields that need the same frames, the same policy, and the same audio
//! are answered together; the group is the unit the orchestrator splits,
//! retries, and merges. Group order follows the first appearance of each
//! signature in the declared field order, as does field order within a
//! group.

use cliplens_core::field::{FieldSpec, GroupSignature};
use std::collections::HashMap;
use tracing::debug;

/// One batch of fields sharing a media requirement.
#[derive(Debug, Clone)]
pub struct FieldGroup {
    pub signature: GroupSignature,
    pub fields: Vec<FieldSpec>,
}

impl FieldGroup {
    /// The field keys in declared order.
    pub fn keys(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.key.clone()).collect()
    }
}

/// Partition fields into groups, preserving first-appearance order.
pub fn group_fields(fields: &[FieldSpec]) -> Vec<FieldGroup> {
    let mut groups: Vec<FieldGroup> = Vec::new();
    let mut index: HashMap<GroupSignature, usize> = HashMap::new();

    for field in fields {
        let signature = field.signature();
        match index.get(&signature) {
            Some(&i) => groups[i].fields.push(field.clone()),
            None => {
                index.insert(signature.clone(), groups.len());
                groups.push(FieldGroup { signature, fields: vec![field.clone()] });
            }
        }
    }

    debug!(groups = groups.len(), fields = fields.len(), "Grouped fields");
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::field;
    use cliplens_core::field::{AcceptedSpec, FramePolicy, MediaRequirement};

    fn media_field(key: &str, method: Option<&str>, audio: Option<&str>, splittable: bool) -> FieldSpec {
        let mut f = field(key, "a question", AcceptedSpec::FreeText);
        f.media = MediaRequirement {
            frame_method: method.map(str::to_string),
            frame_policy: method.map(|_| FramePolicy::All),
            audio_key: audio.map(str::to_string),
            splittable,
        };
        f
    }

    #[test]
    fn same_signature_lands_in_one_group() {
        let fields = vec![
            media_field("a", Some("regular_1s"), None, true),
            media_field("b", Some("regular_1s"), None, true),
        ];
        let groups = group_fields(&fields);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keys(), ["a", "b"]);
    }

    #[test]
    fn differing_requirements_split_groups() {
        let fields = vec![
            media_field("frames_all", Some("regular_1s"), None, true),
            media_field("audio_only", None, Some("main_audio"), false),
            media_field("frames_whole", Some("regular_1s"), None, false),
        ];
        let groups = group_fields(&fields);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn group_order_follows_first_appearance() {
        let fields = vec![
            media_field("a", Some("regular_1s"), None, true),
            media_field("b", None, Some("main_audio"), false),
            media_field("c", Some("regular_1s"), None, true),
        ];
        let groups = group_fields(&fields);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].keys(), ["a", "c"]);
        assert_eq!(groups[1].keys(), ["b"]);
    }

    #[test]
    fn no_fields_no_groups() {
        assert!(group_fields(&[]).is_empty());
    }
}
