use core::fmt;
use serde::{Deserialize, Serialize};

/// Binary ground-truth or predicted label. `Positive` is the
/// "good"/granted side of the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    /// 0/1 value used in rate sums.
    pub const fn indicator(self) -> u32 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }

    pub const fn is_positive(self) -> bool {
        matches!(self, Label::Positive)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Negative => write!(f, "negative"),
            Label::Positive => write!(f, "positive"),
        }
    }
}

/// A single scored individual. `category` tags the sub-population the
/// item belongs to and is never read by the classification math;
/// `outcome` and `score` are fixed at construction. The prediction is
/// rewritten whenever a threshold is applied and starts out equal to
/// the true outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub category: u8,
    pub outcome: Label,
    pub score: f64,
    predicted: Label,
}

impl Item {
    pub const fn new(category: u8, outcome: Label, score: f64) -> Self {
        Self {
            category,
            outcome,
            score,
            predicted: outcome,
        }
    }

    pub const fn predicted(&self) -> Label {
        self.predicted
    }

    pub(crate) fn set_predicted(&mut self, predicted: Label) {
        self.predicted = predicted;
    }
}

#[cfg(test)]
mod tests {
    use super::{Item, Label};

    #[test]
    fn fresh_item_predicts_its_outcome() {
        let item = Item::new(0, Label::Positive, 72.0);
        assert_eq!(item.predicted(), Label::Positive);

        let item = Item::new(1, Label::Negative, 18.0);
        assert_eq!(item.predicted(), Label::Negative);
    }

    #[test]
    fn indicator_maps_to_zero_one() {
        assert_eq!(Label::Negative.indicator(), 0);
        assert_eq!(Label::Positive.indicator(), 1);
    }

    #[test]
    fn labels_serialize_lowercase() {
        let json = serde_json::to_string(&Label::Positive).expect("serialize label");
        assert_eq!(json, "\"positive\"");
    }
}
