use fairlend_core::model::group::GroupModel;
use fairlend_core::model::item::Item;

/// Metrics a group would have at a candidate threshold. Computed by
/// [`GroupEvaluator`] without touching the group's shared state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdMetrics {
    pub tpr: f64,
    pub positive_rate: f64,
    pub profit: f64,
}

/// Inclusive threshold range searched for one group: the observed
/// score range with the upper bound extended by one step, so a
/// threshold above every score (classify everyone negative) stays
/// reachable. Grid points are derived by index, not by accumulated
/// addition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRange {
    pub min: f64,
    pub max: f64,
}

impl SearchRange {
    pub fn from_items(items: &[Item], step: f64) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for item in items {
            min = min.min(item.score);
            max = max.max(item.score);
        }

        Self {
            min,
            max: max + step,
        }
    }

    /// Index of the last grid point inside the range.
    pub fn last_index(&self, step: f64) -> usize {
        ((self.max - self.min) / step).floor() as usize
    }

    pub fn at(&self, index: usize, step: f64) -> f64 {
        self.min + index as f64 * step
    }

    pub fn thresholds(&self, step: f64) -> impl Iterator<Item = f64> {
        let min = self.min;
        (0..=self.last_index(step)).map(move |index| min + index as f64 * step)
    }
}

/// Sorted-score view of one group, precomputed once so every candidate
/// threshold evaluates in O(log n) instead of reclassifying the model.
/// Values match [`GroupModel::classify`] followed by reading the
/// model's metrics, including the vacuous TPR of 1.0 for a group with
/// no positive items.
#[derive(Debug, Clone)]
pub struct GroupEvaluator {
    scores: Vec<f64>,
    positive_prefix: Vec<u32>,
    total_positives: u32,
    tpr_value: f64,
    fpr_value: f64,
}

impl GroupEvaluator {
    pub fn new(model: &GroupModel) -> Self {
        let mut scored: Vec<(f64, bool)> = model
            .items()
            .iter()
            .map(|item| (item.score, item.outcome.is_positive()))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut scores = Vec::with_capacity(scored.len());
        let mut positive_prefix = Vec::with_capacity(scored.len() + 1);
        positive_prefix.push(0);
        let mut running = 0u32;
        for (score, positive) in scored {
            scores.push(score);
            if positive {
                running += 1;
            }
            positive_prefix.push(running);
        }

        Self {
            scores,
            positive_prefix,
            total_positives: running,
            tpr_value: model.tpr_value(),
            fpr_value: model.fpr_value(),
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn evaluate(&self, threshold: f64) -> ThresholdMetrics {
        // Items at indices >= first are scored at or above the
        // threshold and would be predicted positive.
        let first = self.scores.partition_point(|score| *score < threshold);
        let predicted_positive = self.scores.len() - first;
        let positives_selected = self.total_positives - self.positive_prefix[first];
        let false_positives = predicted_positive - positives_selected as usize;

        let tpr = if self.total_positives == 0 {
            1.0
        } else {
            f64::from(positives_selected) / f64::from(self.total_positives)
        };
        let positive_rate = predicted_positive as f64 / self.scores.len() as f64;
        let profit =
            f64::from(positives_selected) * self.tpr_value + false_positives as f64 * self.fpr_value;

        ThresholdMetrics {
            tpr,
            positive_rate,
            profit,
        }
    }
}
