use core::fmt;

use serde::Serialize;

/// The four threshold-selection strategies the optimizer can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    MaxProfit,
    GroupUnaware,
    DemographicParity,
    EqualOpportunity,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::MaxProfit,
        StrategyKind::GroupUnaware,
        StrategyKind::DemographicParity,
        StrategyKind::EqualOpportunity,
    ];

    /// Canonical tag used in annotations and telemetry.
    pub const fn label(self) -> &'static str {
        match self {
            StrategyKind::MaxProfit => "max-profit",
            StrategyKind::GroupUnaware => "group-unaware",
            StrategyKind::DemographicParity => "demographic-parity",
            StrategyKind::EqualOpportunity => "equal-opportunity",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.label() == value)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Why a group model changed. Listeners receive this tag so an
/// annotation layer can tell a direct threshold adjustment apart from
/// an optimizer commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    ThresholdSet,
    Optimized(StrategyKind),
}

impl ModelEvent {
    pub const fn strategy(self) -> Option<StrategyKind> {
        match self {
            ModelEvent::ThresholdSet => None,
            ModelEvent::Optimized(kind) => Some(kind),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ModelEvent::ThresholdSet => "threshold-set",
            ModelEvent::Optimized(kind) => kind.label(),
        }
    }
}
