//! Score vector to ranked label list.
//!
//! Scores are ranked exactly as the model produced them. No softmax or other
//! rescaling is applied, so a model whose last layer is not a probability
//! distribution yields raw logits here.

use std::cmp::Ordering;

use serde::Serialize;

use crate::errors::{PlantClassifierError, Result};
use crate::labels::LabelTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPrediction {
    pub label: String,
    pub score: f32,
}

impl RankedPrediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Every prediction of one classification call, highest score first.
pub type RankedPredictionList = Vec<RankedPrediction>;

/// Higher scores first. NaN sorts after every number.
fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// Pairs `scores[i]` with `labels[i]` and sorts by score, descending.
///
/// The sort is stable: equal scores keep their table order. A length
/// mismatch is reported, never patched over.
pub fn rank(scores: &[f32], labels: &LabelTable) -> Result<RankedPredictionList> {
    if scores.len() != labels.len() {
        return Err(PlantClassifierError::TableMismatch {
            artifact: labels.artifact().to_string(),
            expected: labels.len(),
            actual: scores.len(),
        });
    }

    let mut ranked: RankedPredictionList = labels
        .iter()
        .zip(scores)
        .map(|(label, &score)| RankedPrediction::new(label, score))
        .collect();
    ranked.sort_by(|a, b| descending(a.score, b.score));
    Ok(ranked)
}

/// First `k` entries of a ranked list.
pub fn top_k(ranked: &[RankedPrediction], k: usize) -> &[RankedPrediction] {
    &ranked[..k.min(ranked.len())]
}

/// Index of the highest score; the first one wins a tie.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .reduce(|best, candidate| {
            if descending(*candidate.1, *best.1) == Ordering::Less {
                candidate
            } else {
                best
            }
        })
        .map(|(index, _)| index)
}
