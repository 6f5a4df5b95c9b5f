use std::cell::RefCell;
use std::rc::Rc;

use fairlend_core::model::event::{ModelEvent, StrategyKind};
use fairlend_core::model::group::GroupModel;
use fairlend_core::model::item::{Item, Label};
use fairlend_core::population::{PopulationSpec, normal_items};
use fairlend_opt::{Optimizer, approximately_equal};

/// Ten items with scores 0..=9 and outcomes alternating bad/good.
fn alternating_ladder(category: u8) -> Vec<Item> {
    (0..10)
        .map(|i| {
            let outcome = if i % 2 == 0 {
                Label::Negative
            } else {
                Label::Positive
            };
            Item::new(category, outcome, f64::from(i))
        })
        .collect()
}

fn gaussian_group(category: u8, good_mean: f64, bad_mean: f64) -> Vec<Item> {
    let mut items = normal_items(&PopulationSpec {
        category,
        outcome: Label::Positive,
        count: 100,
        mean: good_mean,
        std_dev: 10.0,
    })
    .expect("valid spec");
    items.extend(
        normal_items(&PopulationSpec {
            category,
            outcome: Label::Negative,
            count: 100,
            mean: bad_mean,
            std_dev: 10.0,
        })
        .expect("valid spec"),
    );
    items
}

#[test]
fn ladder_scenario_runs_all_four_strategies_consistently() {
    let mut totals = Vec::new();

    for strategy in StrategyKind::ALL {
        let mut m0 = GroupModel::new(alternating_ladder(0), 100.0, -50.0).expect("items");
        let mut m1 = GroupModel::new(alternating_ladder(1), 100.0, -50.0).expect("items");

        let outcome = {
            let mut optimizer = Optimizer::new(&mut m0, &mut m1, 1.0).expect("valid step");
            optimizer.run(strategy).expect("feasible")
        };

        assert_eq!(outcome.strategy, strategy);
        assert_eq!(m0.threshold(), outcome.threshold0);
        assert_eq!(m1.threshold(), outcome.threshold1);
        assert_eq!(outcome.total_profit, m0.profit() + m1.profit());

        match strategy {
            StrategyKind::MaxProfit => {}
            StrategyKind::GroupUnaware => {
                assert_eq!(outcome.threshold0, outcome.threshold1);
            }
            StrategyKind::DemographicParity => {
                assert!(approximately_equal(m0.positive_rate(), m1.positive_rate()));
            }
            StrategyKind::EqualOpportunity => {
                assert!(approximately_equal(m0.tpr(), m1.tpr()));
            }
        }

        totals.push((strategy, outcome.total_profit));
    }

    // The ladder has a unique per-group optimum at threshold 1 (grant
    // everyone but the worst item): 5×100 − 4×50 = 300 per group.
    let (_, max_profit_total) = totals[0];
    assert_eq!(max_profit_total, 600.0);

    // The unconstrained optimum dominates every constrained strategy.
    for (strategy, total) in &totals[1..] {
        assert!(
            max_profit_total >= *total,
            "{strategy} beat the unconstrained optimum: {total} > {max_profit_total}"
        );
    }
}

#[test]
fn ladder_max_profit_finds_the_known_optimum() {
    let mut m0 = GroupModel::new(alternating_ladder(0), 100.0, -50.0).expect("items");
    let mut m1 = GroupModel::new(alternating_ladder(1), 100.0, -50.0).expect("items");

    let outcome = {
        let mut optimizer = Optimizer::new(&mut m0, &mut m1, 1.0).expect("valid step");
        optimizer.maximize_profit().expect("feasible")
    };

    assert_eq!((outcome.threshold0, outcome.threshold1), (1.0, 1.0));
    assert_eq!(m0.profit(), 300.0);
    assert_eq!(m1.profit(), 300.0);
}

#[test]
fn gaussian_scenario_max_profit_dominates_constrained_strategies() {
    // Asymmetric groups: the second group's score distribution
    // separates the outcomes more sharply.
    let mut best_total = f64::NEG_INFINITY;
    let mut constrained_totals = Vec::new();

    for strategy in StrategyKind::ALL {
        let mut m0 = GroupModel::new(gaussian_group(0, 63.0, 47.0), 300.0, -700.0).expect("items");
        let mut m1 = GroupModel::new(gaussian_group(1, 57.0, 33.0), 300.0, -700.0).expect("items");

        let outcome = {
            let mut optimizer = Optimizer::new(&mut m0, &mut m1, 1.0).expect("valid step");
            optimizer.run(strategy).expect("feasible")
        };

        match strategy {
            StrategyKind::MaxProfit => best_total = outcome.total_profit,
            StrategyKind::GroupUnaware => {
                assert_eq!(outcome.threshold0, outcome.threshold1);
                constrained_totals.push(outcome.total_profit);
            }
            StrategyKind::DemographicParity => {
                assert!(approximately_equal(m0.positive_rate(), m1.positive_rate()));
                constrained_totals.push(outcome.total_profit);
            }
            StrategyKind::EqualOpportunity => {
                assert!(approximately_equal(m0.tpr(), m1.tpr()));
                constrained_totals.push(outcome.total_profit);
            }
        }
    }

    for total in constrained_totals {
        assert!(best_total >= total);
    }
}

#[test]
fn committed_winner_notifies_both_models_once() {
    let mut m0 = GroupModel::new(alternating_ladder(0), 100.0, -50.0).expect("items");
    let mut m1 = GroupModel::new(alternating_ladder(1), 100.0, -50.0).expect("items");

    let events = Rc::new(RefCell::new(Vec::new()));
    for (name, model) in [("group0", &mut m0), ("group1", &mut m1)] {
        let events = Rc::clone(&events);
        model.add_listener(Box::new(move |event, snapshot| {
            events.borrow_mut().push((name, event, snapshot.threshold));
        }));
    }

    {
        let mut optimizer = Optimizer::new(&mut m0, &mut m1, 1.0).expect("valid step");
        optimizer.equal_opportunity().expect("feasible");
    }

    let events = events.borrow();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        (
            "group0",
            ModelEvent::Optimized(StrategyKind::EqualOpportunity),
            m0.threshold()
        )
    );
    assert_eq!(
        events[1],
        (
            "group1",
            ModelEvent::Optimized(StrategyKind::EqualOpportunity),
            m1.threshold()
        )
    );
}
