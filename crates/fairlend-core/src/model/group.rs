use core::fmt;

use serde::Serialize;

use crate::model::event::ModelEvent;
use crate::model::item::{Item, Label};
use crate::model::metrics::{self, ConfusionCounts, MetricsError};

/// Observer callback registered with [`GroupModel::add_listener`].
/// Listeners run synchronously, in registration order, and receive the
/// event tag plus a value snapshot of the freshly computed metrics.
pub type Listener = Box<dyn FnMut(ModelEvent, &GroupSnapshot)>;

/// Read-only view of a model's cached metrics at one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub threshold: f64,
    pub tpr: f64,
    pub positive_rate: f64,
    pub profit: f64,
}

/// A group of items under one decision threshold, with the payoff per
/// true positive and per false positive. All mutation goes through
/// [`GroupModel::classify`], which keeps the cached metrics consistent
/// with the items' predictions at every point a caller can observe.
pub struct GroupModel {
    items: Vec<Item>,
    tpr_value: f64,
    fpr_value: f64,
    threshold: f64,
    tpr: f64,
    positive_rate: f64,
    profit: f64,
    listeners: Vec<Listener>,
}

impl GroupModel {
    /// Build a model over a non-empty item collection. The model is
    /// classified at threshold 0.0 immediately so its metrics are
    /// never observable in an undefined state.
    pub fn new(items: Vec<Item>, tpr_value: f64, fpr_value: f64) -> Result<Self, MetricsError> {
        if items.is_empty() {
            return Err(MetricsError::EmptyPopulation);
        }

        let mut model = Self {
            items,
            tpr_value,
            fpr_value,
            threshold: 0.0,
            tpr: 0.0,
            positive_rate: 0.0,
            profit: 0.0,
            listeners: Vec::new(),
        };
        model.classify(0.0);
        Ok(model)
    }

    /// Re-predict every item against `threshold` (an item scoring
    /// exactly at the threshold is predicted positive) and recompute
    /// the cached rates and profit. Idempotent.
    pub fn classify(&mut self, threshold: f64) {
        self.threshold = threshold;
        for item in &mut self.items {
            let predicted = if item.score >= threshold {
                Label::Positive
            } else {
                Label::Negative
            };
            item.set_predicted(predicted);
        }

        self.tpr = metrics::true_positive_rate(&self.items);
        self.positive_rate = metrics::positive_rate(&self.items)
            .expect("group models are non-empty by construction");
        self.profit = metrics::profit(&self.items, self.tpr_value, self.fpr_value);
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub const fn tpr_value(&self) -> f64 {
        self.tpr_value
    }

    pub const fn fpr_value(&self) -> f64 {
        self.fpr_value
    }

    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    pub const fn tpr(&self) -> f64 {
        self.tpr
    }

    pub const fn positive_rate(&self) -> f64 {
        self.positive_rate
    }

    pub const fn profit(&self) -> f64 {
        self.profit
    }

    pub fn confusion(&self) -> ConfusionCounts {
        ConfusionCounts::from_items(&self.items)
    }

    pub const fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            threshold: self.threshold,
            tpr: self.tpr,
            positive_rate: self.positive_rate,
            profit: self.profit,
        }
    }

    /// Register an observer. Registration order is notification order;
    /// repeated registrations are kept as-is and there is no
    /// unsubscribe operation.
    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Notify every listener of `event`, synchronously and in
    /// registration order. Each callback runs to completion before the
    /// next starts.
    pub fn notify_listeners(&mut self, event: ModelEvent) {
        let snapshot = self.snapshot();
        for listener in &mut self.listeners {
            listener(event, &snapshot);
        }
    }
}

impl fmt::Debug for GroupModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupModel")
            .field("items", &self.items.len())
            .field("tpr_value", &self.tpr_value)
            .field("fpr_value", &self.fpr_value)
            .field("threshold", &self.threshold)
            .field("tpr", &self.tpr)
            .field("positive_rate", &self.positive_rate)
            .field("profit", &self.profit)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
