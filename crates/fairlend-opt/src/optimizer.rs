use core::fmt;

use tracing::{Level, event};

use fairlend_core::model::event::{ModelEvent, StrategyKind};
use fairlend_core::model::group::GroupModel;

use crate::evaluate::{GroupEvaluator, SearchRange, ThresholdMetrics};

/// Two rates are considered equal when they agree to the nearest whole
/// percentage point, the same coarseness as two-decimal display
/// rounding. `f64::round` rounds half away from zero; rates are
/// non-negative here, so half-way cases land on the same side as
/// conventional round-half-up.
pub fn approximately_equal(x: f64, y: f64) -> bool {
    (100.0 * x).round() == (100.0 * y).round()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constraint {
    Unconstrained,
    EqualThreshold,
    MatchedPositiveRate,
    MatchedTruePositiveRate,
}

impl Constraint {
    fn is_satisfied(
        self,
        t0: f64,
        t1: f64,
        m0: &ThresholdMetrics,
        m1: &ThresholdMetrics,
    ) -> bool {
        match self {
            Constraint::Unconstrained => true,
            Constraint::EqualThreshold => t0 == t1,
            Constraint::MatchedPositiveRate => {
                approximately_equal(m0.positive_rate, m1.positive_rate)
            }
            Constraint::MatchedTruePositiveRate => approximately_equal(m0.tpr, m1.tpr),
        }
    }
}

/// Result of a successful constrained search, already committed into
/// both models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationOutcome {
    pub strategy: StrategyKind,
    pub threshold0: f64,
    pub threshold1: f64,
    pub total_profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizeError {
    InvalidStep(f64),
    Infeasible { strategy: StrategyKind },
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizeError::InvalidStep(step) => {
                write!(f, "step size must be finite and positive, got {step}")
            }
            OptimizeError::Infeasible { strategy } => {
                write!(f, "no feasible threshold pair satisfies {strategy}")
            }
        }
    }
}

impl std::error::Error for OptimizeError {}

/// Grid-search optimizer over a pair of group models. Holds both
/// models exclusively for its lifetime, so nothing else can mutate
/// them while a search is in flight. Candidate pairs are scored
/// through [`GroupEvaluator`] copies; the models themselves are only
/// written when a winner is committed.
pub struct Optimizer<'m> {
    model0: &'m mut GroupModel,
    model1: &'m mut GroupModel,
    step: f64,
    range0: SearchRange,
    range1: SearchRange,
    eval0: GroupEvaluator,
    eval1: GroupEvaluator,
}

impl<'m> Optimizer<'m> {
    pub fn new(
        model0: &'m mut GroupModel,
        model1: &'m mut GroupModel,
        step: f64,
    ) -> Result<Self, OptimizeError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(OptimizeError::InvalidStep(step));
        }

        let range0 = SearchRange::from_items(model0.items(), step);
        let range1 = SearchRange::from_items(model1.items(), step);
        let eval0 = GroupEvaluator::new(model0);
        let eval1 = GroupEvaluator::new(model1);

        Ok(Self {
            model0,
            model1,
            step,
            range0,
            range1,
            eval0,
            eval1,
        })
    }

    pub fn model0(&self) -> &GroupModel {
        self.model0
    }

    pub fn model1(&self) -> &GroupModel {
        self.model1
    }

    /// Maximize total profit with no constraint on the two thresholds.
    pub fn maximize_profit(&mut self) -> Result<OptimizationOutcome, OptimizeError> {
        self.maximize_with(Constraint::Unconstrained, StrategyKind::MaxProfit)
    }

    /// Group unaware: both groups share a single threshold.
    pub fn group_unaware(&mut self) -> Result<OptimizationOutcome, OptimizeError> {
        self.maximize_with(Constraint::EqualThreshold, StrategyKind::GroupUnaware)
    }

    /// Demographic parity: the groups' positive rates must agree to
    /// the nearest percentage point.
    pub fn demographic_parity(&mut self) -> Result<OptimizationOutcome, OptimizeError> {
        self.maximize_with(
            Constraint::MatchedPositiveRate,
            StrategyKind::DemographicParity,
        )
    }

    /// Equal opportunity: the groups' true positive rates must agree
    /// to the nearest percentage point.
    pub fn equal_opportunity(&mut self) -> Result<OptimizationOutcome, OptimizeError> {
        self.maximize_with(
            Constraint::MatchedTruePositiveRate,
            StrategyKind::EqualOpportunity,
        )
    }

    /// Dispatch by strategy tag.
    pub fn run(&mut self, strategy: StrategyKind) -> Result<OptimizationOutcome, OptimizeError> {
        match strategy {
            StrategyKind::MaxProfit => self.maximize_profit(),
            StrategyKind::GroupUnaware => self.group_unaware(),
            StrategyKind::DemographicParity => self.demographic_parity(),
            StrategyKind::EqualOpportunity => self.equal_opportunity(),
        }
    }

    fn maximize_with(
        &mut self,
        constraint: Constraint,
        strategy: StrategyKind,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        let mut best: Option<(f64, f64, f64)> = None;

        for i0 in 0..=self.range0.last_index(self.step) {
            let t0 = self.range0.at(i0, self.step);
            let m0 = self.eval0.evaluate(t0);

            for i1 in 0..=self.range1.last_index(self.step) {
                let t1 = self.range1.at(i1, self.step);
                let m1 = self.eval1.evaluate(t1);

                if !constraint.is_satisfied(t0, t1, &m0, &m1) {
                    continue;
                }

                let total = m0.profit + m1.profit;
                // Strict improvement only: the first maximal pair in
                // loop order wins ties.
                if best.is_none_or(|(_, _, profit)| total > profit) {
                    best = Some((t0, t1, total));
                }
            }
        }

        let (t0, t1, total_profit) = best.ok_or(OptimizeError::Infeasible { strategy })?;

        self.model0.classify(t0);
        self.model1.classify(t1);
        self.model0.notify_listeners(ModelEvent::Optimized(strategy));
        self.model1.notify_listeners(ModelEvent::Optimized(strategy));

        event!(
            target: "fairlend_opt::search",
            Level::DEBUG,
            strategy = %strategy,
            threshold0 = t0,
            threshold1 = t1,
            total_profit,
        );

        Ok(OptimizationOutcome {
            strategy,
            threshold0: t0,
            threshold1: t1,
            total_profit,
        })
    }
}
