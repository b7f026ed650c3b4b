//! Weighted reconciliation of partial answers.
//!
//! Each field's accumulated (value, weight) pairs collapse to one final
//! string according to the field's aggregation kind. A numeric
//! contribution is a value that is all ASCII digits and parses as `i64`;
//! everything else is ignored by the numeric aggregations. Arithmetic
//! overflow resolves the field to "N/A" instead of propagating.
//!
//! Rounding rule: nearest integer, ties away from zero (`f64::round`).

use cliplens_core::chunk::{MergeTable, WeightedValue};
use cliplens_core::field::{AggKind, FieldSpec};
use cliplens_core::media::Ratios;
use cliplens_core::NOT_AVAILABLE;
use std::collections::BTreeMap;
use tracing::debug;

/// Collapse the merge table into one value per answered field.
///
/// Fields with no table entry are absent from the result; the orchestrator
/// defaults those afterwards.
pub fn merge(
    table: &MergeTable,
    specs: &[FieldSpec],
    ratios: &Ratios,
    current_method: Option<&str>,
) -> BTreeMap<String, String> {
    let ratio = ratios.ratio_for(current_method);
    let mut out = BTreeMap::new();

    for (key, pairs) in table.iter() {
        let Some(spec) = specs.iter().find(|f| &f.key == key) else {
            debug!(key, "No declaration for accumulated key, skipping");
            continue;
        };
        out.insert(key.clone(), collapse(pairs, spec.aggregation, ratio));
    }

    out
}

fn collapse(pairs: &[WeightedValue], aggregation: AggKind, ratio: f64) -> String {
    match aggregation {
        AggKind::Or => {
            if pairs.iter().any(|p| p.value == "1") {
                "1".into()
            } else {
                "0".into()
            }
        }
        AggKind::And => {
            if pairs.iter().all(|p| p.value == "1") {
                "1".into()
            } else {
                "0".into()
            }
        }
        AggKind::Add => add(pairs),
        AggKind::Mean => weighted_mean(pairs, 1.0),
        AggKind::MeanTotal => weighted_mean(pairs, ratio),
        AggKind::CountMean => count_mean(pairs, 1.0),
        AggKind::CountMeanTotal => count_mean(pairs, ratio),
        AggKind::First => pairs.first().map_or_else(|| NOT_AVAILABLE.into(), |p| p.value.clone()),
    }
}

/// Sum of numeric values, clamped to 100.
fn add(pairs: &[WeightedValue]) -> String {
    let mut total: i64 = 0;
    for value in pairs.iter().filter_map(|p| numeric(&p.value)) {
        let Some(next) = total.checked_add(value) else {
            return NOT_AVAILABLE.into();
        };
        total = next;
    }
    total.min(100).to_string()
}

/// Weight-proportional average of numeric values, scaled then rounded.
fn weighted_mean(pairs: &[WeightedValue], ratio: f64) -> String {
    let mut weighted_sum: i64 = 0;
    let mut weight_total: i64 = 0;

    for pair in pairs {
        let Some(value) = numeric(&pair.value) else {
            continue;
        };
        let weight = i64::from(pair.weight);
        let Some(contribution) = value.checked_mul(weight) else {
            return NOT_AVAILABLE.into();
        };
        let Some(sum) = weighted_sum.checked_add(contribution) else {
            return NOT_AVAILABLE.into();
        };
        weighted_sum = sum;
        weight_total += weight;
    }

    if weight_total == 0 {
        return "0".to_string();
    }
    let avg = weighted_sum as f64 / weight_total as f64 * ratio;
    round(avg)
}

/// `100 × Σ(numeric values) / Σ(all weights)`, scaled then rounded.
///
/// The denominator counts every weight in the table, numeric or not: a
/// chunk that answered garbage still observed its frames.
fn count_mean(pairs: &[WeightedValue], ratio: f64) -> String {
    let mut count: i64 = 0;
    for value in pairs.iter().filter_map(|p| numeric(&p.value)) {
        let Some(next) = count.checked_add(value) else {
            return NOT_AVAILABLE.into();
        };
        count = next;
    }

    let frames: i64 = pairs.iter().map(|p| i64::from(p.weight)).sum();
    if frames == 0 {
        return "0".to_string();
    }
    let percent = 100.0 * count as f64 / frames as f64 * ratio;
    round(percent)
}

/// Nearest integer, ties away from zero.
fn round(x: f64) -> String {
    (x.round() as i64).to_string()
}

/// A numeric contribution: all ASCII digits, parseable as `i64`.
fn numeric(value: &str) -> Option<i64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
