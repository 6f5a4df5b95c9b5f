use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use fairlend_core::model::event::{ModelEvent, StrategyKind};
use fairlend_core::model::group::GroupModel;
use fairlend_core::model::item::{Item, Label};
use fairlend_core::model::metrics::{ConfusionCounts, MetricsError};
use fairlend_core::population::{PopulationError, PopulationSpec, normal_items};
use fairlend_opt::evaluate::{GroupEvaluator, SearchRange};
use fairlend_opt::optimizer::{OptimizeError, Optimizer};

use crate::config::{GroupConfig, ScenarioConfig};

/// Primary entry point: builds the two group models from the config
/// and runs every strategy through one optimizer.
pub struct ScenarioRunner {
    config: ScenarioConfig,
}

/// Everything a run produces, ready for the report writers.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub run_id: String,
    pub group_names: [String; 2],
    pub records: Vec<StrategyRecord>,
    pub curves: Vec<ProfitCurve>,
}

/// One strategy's result row.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRecord {
    pub strategy: StrategyKind,
    pub feasible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_profit: Option<f64>,
    pub groups: Vec<GroupOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupOutcome {
    pub name: String,
    pub threshold: f64,
    pub tpr: f64,
    pub positive_rate: f64,
    pub profit: f64,
    pub confusion: ConfusionCounts,
}

impl GroupOutcome {
    fn from_model(name: &str, model: &GroupModel) -> Self {
        Self {
            name: name.to_string(),
            threshold: model.threshold(),
            tpr: model.tpr(),
            positive_rate: model.positive_rate(),
            profit: model.profit(),
            confusion: model.confusion(),
        }
    }
}

/// Profit as a function of threshold for one group, sampled over the
/// search grid for the report plot.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitCurve {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl ScenarioRunner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Execute the scenario: generate populations, classify both
    /// groups at the configured starting threshold, then run all four
    /// strategies. Infeasible strategies become explicit records, not
    /// errors.
    pub fn run(&self) -> Result<ScenarioReport, RunnerError> {
        let step = self.config.search.step_size;
        let names = [
            self.config.groups[0].name.clone(),
            self.config.groups[1].name.clone(),
        ];

        let mut model0 = build_group(0, &self.config.groups[0], &self.config)?;
        let mut model1 = build_group(1, &self.config.groups[1], &self.config)?;

        for (name, model) in names.iter().zip([&mut model0, &mut model1]) {
            let group = name.clone();
            model.add_listener(Box::new(move |event, snapshot| {
                event!(
                    target: "fairlend_bench::model",
                    Level::INFO,
                    group = %group,
                    event = event.label(),
                    threshold = snapshot.threshold,
                    tpr = snapshot.tpr,
                    positive_rate = snapshot.positive_rate,
                    profit = snapshot.profit,
                );
            }));
        }

        let initial = self.config.search.initial_threshold;
        model0.classify(initial);
        model1.classify(initial);
        model0.notify_listeners(ModelEvent::ThresholdSet);
        model1.notify_listeners(ModelEvent::ThresholdSet);

        let curves = vec![
            profit_curve(&names[0], &model0, step),
            profit_curve(&names[1], &model1, step),
        ];

        let mut records = Vec::with_capacity(StrategyKind::ALL.len());
        let mut optimizer = Optimizer::new(&mut model0, &mut model1, step)?;
        for strategy in StrategyKind::ALL {
            match optimizer.run(strategy) {
                Ok(outcome) => records.push(StrategyRecord {
                    strategy,
                    feasible: true,
                    total_profit: Some(outcome.total_profit),
                    groups: vec![
                        GroupOutcome::from_model(&names[0], optimizer.model0()),
                        GroupOutcome::from_model(&names[1], optimizer.model1()),
                    ],
                }),
                Err(OptimizeError::Infeasible { strategy }) => {
                    event!(
                        target: "fairlend_bench::scenario",
                        Level::WARN,
                        strategy = %strategy,
                        "no feasible threshold pair"
                    );
                    records.push(StrategyRecord {
                        strategy,
                        feasible: false,
                        total_profit: None,
                        groups: Vec::new(),
                    });
                }
                Err(err @ OptimizeError::InvalidStep(_)) => return Err(err.into()),
            }
        }

        Ok(ScenarioReport {
            run_id: self.config.run_id.clone(),
            group_names: names,
            records,
            curves,
        })
    }
}

fn build_group(
    index: u8,
    group: &GroupConfig,
    config: &ScenarioConfig,
) -> Result<GroupModel, RunnerError> {
    let mut items = generate(index, Label::Positive, group, &group.name)?;
    items.extend(generate(index, Label::Negative, group, &group.name)?);

    GroupModel::new(items, config.payoff.tpr_value, config.payoff.fpr_value).map_err(|source| {
        RunnerError::Model {
            group: group.name.clone(),
            source,
        }
    })
}

fn generate(
    category: u8,
    outcome: Label,
    group: &GroupConfig,
    name: &str,
) -> Result<Vec<Item>, RunnerError> {
    let distribution = match outcome {
        Label::Positive => &group.positives,
        Label::Negative => &group.negatives,
    };
    let spec = PopulationSpec {
        category,
        outcome,
        count: distribution.count,
        mean: distribution.mean,
        std_dev: distribution.std_dev,
    };
    normal_items(&spec).map_err(|source| RunnerError::Population {
        group: name.to_string(),
        source,
    })
}

fn profit_curve(name: &str, model: &GroupModel, step: f64) -> ProfitCurve {
    let evaluator = GroupEvaluator::new(model);
    let range = SearchRange::from_items(model.items(), step);
    let points = range
        .thresholds(step)
        .map(|threshold| (threshold, evaluator.evaluate(threshold).profit))
        .collect();

    ProfitCurve {
        name: name.to_string(),
        points,
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to generate population for group '{group}': {source}")]
    Population {
        group: String,
        source: PopulationError,
    },
    #[error("failed to build model for group '{group}': {source}")]
    Model { group: String, source: MetricsError },
    #[error(transparent)]
    Search(#[from] OptimizeError),
}

#[cfg(test)]
mod tests {
    use super::ScenarioRunner;
    use crate::config::ScenarioConfig;
    use fairlend_core::model::event::StrategyKind;

    fn demo_config() -> ScenarioConfig {
        let yaml = r#"
run_id: "unit"
payoff:
  tpr_value: 300
  fpr_value: -700
groups:
  - name: "blue"
    positives: { count: 100, mean: 63, std_dev: 10 }
    negatives: { count: 100, mean: 47, std_dev: 10 }
  - name: "orange"
    positives: { count: 100, mean: 57, std_dev: 10 }
    negatives: { count: 100, mean: 33, std_dev: 10 }
outputs:
  jsonl: "out/strategies.jsonl"
  summary_md: "out/summary.md"
  plots_dir: "out/plots"
"#;
        let mut cfg: ScenarioConfig = serde_yaml::from_str(yaml).expect("parse");
        cfg.validate().expect("validate");
        cfg
    }

    #[test]
    fn runs_every_strategy_once_in_canonical_order() {
        let report = ScenarioRunner::new(demo_config()).run().expect("run");

        let strategies: Vec<StrategyKind> =
            report.records.iter().map(|record| record.strategy).collect();
        assert_eq!(strategies, StrategyKind::ALL);
        assert!(report.records.iter().all(|record| record.feasible));
    }

    #[test]
    fn feasible_records_carry_both_groups() {
        let report = ScenarioRunner::new(demo_config()).run().expect("run");

        for record in &report.records {
            assert_eq!(record.groups.len(), 2);
            assert_eq!(record.groups[0].name, "blue");
            assert_eq!(record.groups[1].name, "orange");
            let total: f64 = record.groups.iter().map(|group| group.profit).sum();
            assert_eq!(record.total_profit, Some(total));
        }
    }

    #[test]
    fn max_profit_dominates_other_strategies() {
        let report = ScenarioRunner::new(demo_config()).run().expect("run");

        let max_profit = report.records[0].total_profit.expect("feasible");
        for record in &report.records[1..] {
            let total = record.total_profit.expect("feasible");
            assert!(max_profit >= total, "{} beat max-profit", record.strategy);
        }
    }

    #[test]
    fn curves_span_the_search_grid() {
        let report = ScenarioRunner::new(demo_config()).run().expect("run");

        assert_eq!(report.curves.len(), 2);
        for curve in &report.curves {
            assert!(curve.points.len() > 1);
            let (first, _) = curve.points[0];
            let (last, _) = curve.points[curve.points.len() - 1];
            assert!(last > first);
        }
    }
}
