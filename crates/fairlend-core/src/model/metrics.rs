use core::fmt;

use serde::Serialize;

use crate::model::item::{Item, Label};

/// Fraction of actually-positive items that are predicted positive.
///
/// A group with no positive items reports a rate of exactly 1.0:
/// vacuously perfect by convention, so constrained searches over such
/// a group stay well defined.
pub fn true_positive_rate(items: &[Item]) -> f64 {
    let mut positives = 0u32;
    let mut predicted_positives = 0u32;
    for item in items {
        positives += item.outcome.indicator();
        predicted_positives += item.outcome.indicator() * item.predicted().indicator();
    }

    if positives == 0 {
        return 1.0;
    }

    f64::from(predicted_positives) / f64::from(positives)
}

/// Fraction of all items predicted positive. An empty collection has
/// no meaningful rate and is rejected outright.
pub fn positive_rate(items: &[Item]) -> Result<f64, MetricsError> {
    if items.is_empty() {
        return Err(MetricsError::EmptyPopulation);
    }

    let predicted: u32 = items.iter().map(|item| item.predicted().indicator()).sum();
    Ok(f64::from(predicted) / items.len() as f64)
}

/// Aggregate payoff: every predicted-positive item contributes
/// `tpr_value` when its outcome is positive and `fpr_value` otherwise.
/// Predicted-negative items contribute nothing regardless of outcome.
pub fn profit(items: &[Item], tpr_value: f64, fpr_value: f64) -> f64 {
    items
        .iter()
        .filter(|item| item.predicted().is_positive())
        .map(|item| {
            if item.outcome.is_positive() {
                tpr_value
            } else {
                fpr_value
            }
        })
        .sum()
}

/// Count of items matching an exact (outcome, predicted) pair.
pub fn count_matches(items: &[Item], outcome: Label, predicted: Label) -> usize {
    items
        .iter()
        .filter(|item| item.outcome == outcome && item.predicted() == predicted)
        .count()
}

/// 2×2 confusion aggregate for the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl ConfusionCounts {
    pub fn from_items(items: &[Item]) -> Self {
        let mut counts = Self {
            true_positives: 0,
            false_positives: 0,
            false_negatives: 0,
            true_negatives: 0,
        };

        for item in items {
            match (item.outcome, item.predicted()) {
                (Label::Positive, Label::Positive) => counts.true_positives += 1,
                (Label::Negative, Label::Positive) => counts.false_positives += 1,
                (Label::Positive, Label::Negative) => counts.false_negatives += 1,
                (Label::Negative, Label::Negative) => counts.true_negatives += 1,
            }
        }

        counts
    }

    pub const fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsError {
    EmptyPopulation,
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::EmptyPopulation => {
                write!(f, "rates are undefined for an empty population")
            }
        }
    }
}

impl std::error::Error for MetricsError {}
