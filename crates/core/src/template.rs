//! Field template loading.
//!
//! A template is a JSON document mapping human-readable labels to field
//! declarations. It is parsed once per run into immutable `FieldSpec`s;
//! accepted-value shapes and aggregation kinds are resolved here, never
//! re-derived later.
//!
//! An optional brand-knowledge file (label-independent context snippets)
//! can be folded into field descriptions at load time.

use crate::error::TemplateError;
use crate::field::{AcceptedSpec, AggKind, FieldSpec, FramePolicy, MediaRequirement};
use crate::NOT_AVAILABLE;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// One template row: the output label plus the parsed field spec.
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    /// Human-readable label used in the final output.
    pub label: String,

    /// The parsed, immutable field declaration.
    pub spec: FieldSpec,
}

/// A parsed template, preserving declaration order.
#[derive(Debug, Clone, Default)]
pub struct Template {
    entries: Vec<TemplateEntry>,
}

/// The raw JSON shape of one template entry.
#[derive(Debug, Deserialize)]
struct RawEntry {
    key: Option<String>,

    #[serde(default)]
    prompt_ai: String,

    /// Anything other than a list of strings means "accept free text".
    #[serde(default)]
    accepted_values: serde_json::Value,

    #[serde(default)]
    split_logic: Option<String>,

    #[serde(default)]
    frame_method: Option<String>,

    #[serde(default)]
    frames_used: Option<String>,

    #[serde(default)]
    split_possible: bool,

    #[serde(default)]
    audio: Option<String>,

    /// Brand-knowledge key whose text is prefixed onto the description.
    #[serde(default)]
    prompt_additional: Option<String>,
}

impl Template {
    /// Load a template, optionally enriched with brand knowledge.
    ///
    /// A missing or unreadable brand-knowledge file downgrades to the plain
    /// template with a warning, matching the tolerant loading contract.
    pub fn load(path: &Path, brand_knowledge: Option<&Path>) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| TemplateError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let brand = brand_knowledge.and_then(load_brand_knowledge);
        Self::from_raw(raw, path, brand.as_ref())
    }

    fn from_raw(
        raw: serde_json::Map<String, serde_json::Value>,
        path: &Path,
        brand: Option<&HashMap<String, String>>,
    ) -> Result<Self, TemplateError> {
        let mut entries = Vec::with_capacity(raw.len());

        for (label, value) in raw {
            let entry: RawEntry =
                serde_json::from_value(value).map_err(|e| TemplateError::Parse {
                    path: path.to_path_buf(),
                    reason: format!("entry '{label}': {e}"),
                })?;

            let key = entry.key.ok_or_else(|| TemplateError::MissingKey {
                label: label.clone(),
            })?;

            let mut description = entry.prompt_ai.trim().to_string();
            if let (Some(brand), Some(extra_key)) = (brand, &entry.prompt_additional) {
                if let Some(info) = brand.get(extra_key) {
                    description = format!("Brand context: {}. Then, {}", info.trim(), description);
                }
            }

            let frame_policy = entry
                .frames_used
                .as_deref()
                .map(FramePolicy::parse)
                .transpose()?;

            entries.push(TemplateEntry {
                label,
                spec: FieldSpec {
                    key,
                    description,
                    accepted: parse_accepted(&entry.accepted_values),
                    aggregation: parse_aggregation(entry.split_logic.as_deref()),
                    media: MediaRequirement {
                        frame_method: entry.frame_method,
                        frame_policy,
                        audio_key: entry.audio,
                        splittable: entry.split_possible,
                    },
                },
            });
        }

        debug!(fields = entries.len(), "Loaded template");
        Ok(Self { entries })
    }

    /// The parsed field specs, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.entries.iter().map(|e| &e.spec)
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-key a field→value result mapping to the template's labels, in
    /// declaration order. Fields the engine never answered surface as "N/A".
    pub fn remap_to_labels(&self, results: &BTreeMap<String, String>) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| {
                let value = results
                    .get(&e.spec.key)
                    .cloned()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                (e.label.clone(), value)
            })
            .collect()
    }
}

fn parse_accepted(raw: &serde_json::Value) -> AcceptedSpec {
    match raw.as_array() {
        Some(items) => {
            let strings: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if strings.len() == items.len() {
                AcceptedSpec::parse(&strings)
            } else {
                AcceptedSpec::FreeText
            }
        }
        None => AcceptedSpec::FreeText,
    }
}

fn parse_aggregation(raw: Option<&str>) -> AggKind {
    match raw {
        // Missing declarations default to "or", the most common logic.
        None => AggKind::Or,
        Some(s) => serde_json::from_value(serde_json::Value::String(s.to_string()))
            .unwrap_or(AggKind::First),
    }
}

fn load_brand_knowledge(path: &Path) -> Option<HashMap<String, String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), "Failed to read brand knowledge: {e}");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(map) => Some(map),
        Err(e) => {
            warn!(path = %path.display(), "Failed to parse brand knowledge: {e}");
            None
        }
    }
}
