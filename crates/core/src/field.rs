//! Field declarations — the extraction questions the engine answers.
//!
//! A `FieldSpec` is declared once per run (parsed from a template) and is
//! read-only thereafter. The accepted-value shape is sniffed a single time
//! at load into a tagged `AcceptedSpec`, never re-derived at validation
//! time.

use crate::error::TemplateError;
use crate::NOT_AVAILABLE;
use serde::{Deserialize, Serialize};

/// One declarative extraction question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Stable machine key, unique within a template.
    pub key: String,

    /// The question sent to the answerer.
    pub description: String,

    /// Schema for acceptable answer values.
    pub accepted: AcceptedSpec,

    /// How partial answers for this field are combined.
    pub aggregation: AggKind,

    /// Which media this field needs.
    pub media: MediaRequirement,
}

impl FieldSpec {
    /// The grouping key: fields sharing a signature are processed together.
    pub fn signature(&self) -> GroupSignature {
        self.media.signature()
    }
}

/// The media a field needs to be answered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRequirement {
    /// Frame sampling method (e.g. "regular_1s"), if frames are needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_method: Option<String>,

    /// Which frames of the method's ordered list to use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_policy: Option<FramePolicy>,

    /// Audio source key (e.g. "main_audio"), if a transcript is needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_key: Option<String>,

    /// Whether the frame list may be windowed across multiple calls.
    #[serde(default)]
    pub splittable: bool,
}

impl MediaRequirement {
    pub fn signature(&self) -> GroupSignature {
        GroupSignature {
            frame_method: self.frame_method.clone(),
            frame_policy: self.frame_policy,
            audio_key: self.audio_key.clone(),
            splittable: self.splittable,
        }
    }
}

/// The shared-media-requirement key used to batch fields into groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupSignature {
    pub frame_method: Option<String>,
    pub frame_policy: Option<FramePolicy>,
    pub audio_key: Option<String>,
    pub splittable: bool,
}

impl std::fmt::Display for GroupSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}",
            self.frame_method.as_deref().unwrap_or("-"),
            self.audio_key.as_deref().unwrap_or("-"),
        )
    }
}

/// Which slice of a method's ordered frame list a field uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePolicy {
    /// Every frame.
    All,
    /// The first `n` frames.
    FirstN(usize),
    /// The last `n` frames.
    LastN(usize),
    /// A random sample of up to `n` frames.
    RandomN(usize),
}

impl FramePolicy {
    /// Parse the template notation: `all`, `6_first`, `5_last`, `random_10`.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        if raw == "all" {
            return Ok(Self::All);
        }
        if let Some(n) = raw.strip_prefix("random_") {
            if let Ok(n) = n.parse() {
                return Ok(Self::RandomN(n));
            }
        }
        if let Some((n, kind)) = raw.split_once('_') {
            if let Ok(n) = n.parse() {
                match kind {
                    "first" => return Ok(Self::FirstN(n)),
                    "last" => return Ok(Self::LastN(n)),
                    _ => {}
                }
            }
        }
        Err(TemplateError::UnknownFramePolicy(raw.to_string()))
    }
}

/// How weighted partial answers for one field are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggKind {
    /// "1" if any value is "1".
    Or,
    /// "1" iff every value is "1".
    And,
    /// Sum of numeric values, clamped to 100.
    Add,
    /// Weighted average, rounded.
    Mean,
    /// 100 × sum / total weight, rounded.
    CountMean,
    /// Mean scaled by the sampling-density ratio.
    MeanTotal,
    /// Count-mean scaled by the sampling-density ratio.
    CountMeanTotal,
    /// First observed value, verbatim (also the fallback for
    /// unrecognized declarations).
    #[serde(other)]
    First,
}

impl std::fmt::Display for AggKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Add => "add",
            Self::Mean => "mean",
            Self::CountMean => "count-mean",
            Self::MeanTotal => "mean-total",
            Self::CountMeanTotal => "count-mean-total",
            Self::First => "first",
        };
        write!(f, "{s}")
    }
}

/// Schema for a field's acceptable answers, parsed once at template load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AcceptedSpec {
    /// Any string is acceptable.
    FreeText,
    /// Exact membership in a closed set.
    Enum { values: Vec<String> },
    /// Integer membership in at least one inclusive `low-high` bound.
    Ranges { bounds: Vec<(i64, i64)> },
}

impl AcceptedSpec {
    /// Sniff the raw accepted-values declaration.
    ///
    /// Any `low-high` digit entries make the spec a range schema (membership
    /// in ANY declared range suffices); a plain string list is an enum; an
    /// empty declaration accepts free text.
    pub fn parse(raw: &[String]) -> Self {
        if raw.is_empty() {
            return Self::FreeText;
        }
        let bounds: Vec<(i64, i64)> = raw.iter().filter_map(|s| parse_bound(s)).collect();
        if !bounds.is_empty() {
            return Self::Ranges { bounds };
        }
        Self::Enum { values: raw.to_vec() }
    }

    /// Whether `value` satisfies this schema. `"N/A"` is always legal.
    pub fn accepts(&self, value: &str) -> bool {
        if value == NOT_AVAILABLE {
            return true;
        }
        match self {
            Self::FreeText => true,
            Self::Enum { values } => values.iter().any(|v| v == value),
            Self::Ranges { bounds } => match value.parse::<i64>() {
                Ok(n) => bounds.iter().any(|&(low, high)| low <= n && n <= high),
                Err(_) => false,
            },
        }
    }
}

/// Parse a `low-high` entry where both sides are plain digit runs.
fn parse_bound(s: &str) -> Option<(i64, i64)> {
    let (low, high) = s.split_once('-')?;
    if low.is_empty() || high.is_empty() {
        return None;
    }
    if !low.chars().all(|c| c.is_ascii_digit()) || !high.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((low.parse().ok()?, high.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_declaration_is_free_text() {
        let spec = AcceptedSpec::parse(&[]);
        assert_eq!(spec, AcceptedSpec::FreeText);
        assert!(spec.accepts("anything at all"));
    }

    #[test]
    fn plain_list_is_enum() {
        let spec = AcceptedSpec::parse(&strings(&["yes", "no"]));
        assert!(spec.accepts("yes"));
        assert!(!spec.accepts("maybe"));
    }

    #[test]
    fn range_entry_is_ranges() {
        let spec = AcceptedSpec::parse(&strings(&["0-100"]));
        assert!(spec.accepts("57"));
        assert!(!spec.accepts("150"));
        assert!(!spec.accepts("several"));
    }

    #[test]
    fn membership_in_any_range_suffices() {
        let spec = AcceptedSpec::parse(&strings(&["0-10", "90-100"]));
        assert!(spec.accepts("5"));
        assert!(spec.accepts("95"));
        assert!(!spec.accepts("50"));
    }

    #[test]
    fn not_available_is_always_legal() {
        assert!(AcceptedSpec::FreeText.accepts("N/A"));
        assert!(AcceptedSpec::parse(&strings(&["yes", "no"])).accepts("N/A"));
        assert!(AcceptedSpec::parse(&strings(&["0-100"])).accepts("N/A"));
    }

    #[test]
    fn bounds_are_inclusive() {
        let spec = AcceptedSpec::parse(&strings(&["0-100"]));
        assert!(spec.accepts("0"));
        assert!(spec.accepts("100"));
    }

    #[test]
    fn non_range_dash_entries_stay_enum() {
        let spec = AcceptedSpec::parse(&strings(&["semi-dry", "sweet"]));
        assert!(matches!(spec, AcceptedSpec::Enum { .. }));
        assert!(spec.accepts("semi-dry"));
    }

    #[test]
    fn frame_policy_notation() {
        assert_eq!(FramePolicy::parse("all").unwrap(), FramePolicy::All);
        assert_eq!(FramePolicy::parse("6_first").unwrap(), FramePolicy::FirstN(6));
        assert_eq!(FramePolicy::parse("5_last").unwrap(), FramePolicy::LastN(5));
        assert_eq!(FramePolicy::parse("random_10").unwrap(), FramePolicy::RandomN(10));
        assert!(FramePolicy::parse("7_middle").is_err());
    }

    #[test]
    fn agg_kind_from_template_strings() {
        let kind: AggKind = serde_json::from_str("\"count-mean-total\"").unwrap();
        assert_eq!(kind, AggKind::CountMeanTotal);
        let fallback: AggKind = serde_json::from_str("\"no-such-logic\"").unwrap();
        assert_eq!(fallback, AggKind::First);
    }

    #[test]
    fn signature_groups_identical_requirements() {
        let a = MediaRequirement {
            frame_method: Some("regular_1s".into()),
            frame_policy: Some(FramePolicy::All),
            audio_key: None,
            splittable: true,
        };
        let b = a.clone();
        assert_eq!(a.signature(), b.signature());
    }
}
