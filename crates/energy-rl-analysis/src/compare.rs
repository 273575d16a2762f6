//! Strategy comparison on a shared starting state

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use energy_rl_core::{DiscreteAction, Environment, Result};
use energy_rl_env::{EnergyAction, HouseholdEnv, HouseholdState};

use crate::strategy::{strategy_action, HouseholdAgent, Strategy};

/// What happened during one hour of a strategy run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Action taken
    pub action: EnergyAction,
    /// Cost paid for the hour
    pub cost: f64,
    /// Battery level after the hour
    pub battery: f64,
    /// Energy drawn into the battery
    pub charge: f64,
    /// Energy released from the battery
    pub discharge: f64,
    /// Energy from the backup generator
    pub generate: f64,
    /// Grid balance: positive exports, negative imports
    pub trade: f64,
}

/// Mean, spread and extremes of the per-step cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// Mean step cost
    pub mean: f64,
    /// Sample standard deviation of the step cost
    pub std_dev: f64,
    /// Cheapest step
    pub min: f64,
    /// Most expensive step
    pub max: f64,
}

/// One strategy replayed over the comparison horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRun {
    /// Strategy that chose the actions
    pub strategy: Strategy,
    /// One record per hour
    pub steps: Vec<StepRecord>,
}

impl StrategyRun {
    /// Per-step costs
    #[must_use]
    pub fn costs(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.cost).collect()
    }

    /// Running total of the step costs
    #[must_use]
    pub fn cumulative_cost(&self) -> Vec<f64> {
        self.steps
            .iter()
            .scan(0.0, |total, s| {
                *total += s.cost;
                Some(*total)
            })
            .collect()
    }

    /// Sum of the step costs
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.steps.iter().map(|s| s.cost).sum()
    }

    /// Statistics of the step costs
    #[must_use]
    pub fn summary(&self) -> CostSummary {
        let costs = self.costs();
        // sample deviation is undefined below two steps
        let std_dev = if costs.len() < 2 {
            0.0
        } else {
            Statistics::std_dev(&costs)
        };
        CostSummary {
            mean: Statistics::mean(&costs),
            std_dev,
            min: Statistics::min(&costs),
            max: Statistics::max(&costs),
        }
    }

    /// Action indices over time
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn action_trace(&self) -> Vec<f64> {
        self.steps
            .iter()
            .map(|s| s.action.index() as f64)
            .collect()
    }
}

/// Exogenous inputs over the comparison horizon, shared by every strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExogenousTrace {
    /// Household consumption
    pub consumption: Vec<f64>,
    /// Solar production
    pub production: Vec<f64>,
    /// Grid price
    pub price: Vec<f64>,
}

/// Result of replaying every strategy from the same state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Number of hours replayed
    pub horizon: usize,
    /// State every strategy starts from
    pub initial_state: HouseholdState,
    /// Consumption, production and price seen after each hour
    pub exogenous: ExogenousTrace,
    /// Runs in comparison order
    pub runs: IndexMap<Strategy, StrategyRun>,
    /// Q-value of every action along the DQN run, when a model was given
    pub q_values: Option<IndexMap<EnergyAction, Vec<f64>>>,
}

impl ComparisonReport {
    /// `(strategy, total cost)` pairs, cheapest first
    #[must_use]
    pub fn ranking(&self) -> Vec<(Strategy, f64)> {
        let mut totals: Vec<_> = self
            .runs
            .iter()
            .map(|(strategy, run)| (*strategy, run.total_cost()))
            .collect();
        totals.sort_by(|a, b| a.1.total_cmp(&b.1));
        totals
    }
}

/// Replay every strategy for `horizon` hours from one freshly generated state
///
/// The environment series is regenerated with length `horizon`. `Dqn` is
/// only replayed when `model` is given.
pub fn compare_strategies<R: Rng + ?Sized>(
    env: &mut HouseholdEnv,
    horizon: usize,
    model: Option<&HouseholdAgent>,
    rng: &mut R,
) -> Result<ComparisonReport> {
    let initial_state = env.reset_with_horizon(horizon)?;

    let mut exogenous = ExogenousTrace::default();
    for i in 1..=horizon {
        let (production, consumption, price) = env.series().at(initial_state.step + i);
        exogenous.production.push(production);
        exogenous.consumption.push(consumption);
        exogenous.price.push(price);
    }

    let mut runs = IndexMap::new();
    let mut q_values: Option<IndexMap<EnergyAction, Vec<f64>>> = None;

    for strategy in Strategy::ALL {
        if strategy == Strategy::Dqn && model.is_none() {
            continue;
        }

        env.restore(initial_state.clone())?;
        let mut steps = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let state = env.current_state().clone();

            if let (Strategy::Dqn, Some(agent)) = (strategy, model) {
                let trace = q_values.get_or_insert_with(|| {
                    EnergyAction::ALL.into_iter().map(|a| (a, Vec::with_capacity(horizon))).collect()
                });
                for (action, q) in EnergyAction::ALL.into_iter().zip(agent.q_values(&state)?) {
                    trace.entry(action).or_default().push(q);
                }
            }

            let action = strategy_action(strategy, &state, model, rng)?;
            let step = env.step(action)?;
            steps.push(StepRecord {
                action,
                cost: step.cost,
                battery: step.state.battery,
                charge: step.state.charge,
                discharge: step.state.discharge,
                generate: step.state.generate,
                trade: step.state.trade,
            });
        }

        let run = StrategyRun { strategy, steps };
        tracing::debug!(%strategy, total_cost = run.total_cost(), "strategy replayed");
        runs.insert(strategy, run);
    }

    Ok(ComparisonReport {
        horizon,
        initial_state,
        exogenous,
        runs,
        q_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use energy_rl_agent::DqnConfig;
    use energy_rl_env::HouseholdConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn env(sell_price_ratio: f64) -> HouseholdEnv {
        HouseholdEnv::new(HouseholdConfig {
            sell_price_ratio,
            seed: Some(12),
            ..HouseholdConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_baselines_run_without_model() {
        let mut env = env(0.5);
        let report = compare_strategies(&mut env, 48, None, &mut StdRng::seed_from_u64(1)).unwrap();
        let order: Vec<_> = report.runs.keys().copied().collect();
        assert_eq!(order, Strategy::ALL[..6].to_vec());
        assert!(report.q_values.is_none());
        assert_eq!(report.exogenous.price.len(), 48);
        for run in report.runs.values() {
            assert_eq!(run.steps.len(), 48);
        }
    }

    #[test]
    fn test_cumulative_cost_never_drops_without_export_revenue() {
        let mut env = env(0.0);
        let report = compare_strategies(&mut env, 72, None, &mut StdRng::seed_from_u64(2)).unwrap();
        for run in report.runs.values() {
            let cumulative = run.cumulative_cost();
            assert!(cumulative.windows(2).all(|w| w[1] >= w[0]), "{}", run.strategy);
            assert_relative_eq!(*cumulative.last().unwrap(), run.total_cost(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_strategies_share_the_initial_state() {
        let mut env = env(0.5);
        let report = compare_strategies(&mut env, 24, None, &mut StdRng::seed_from_u64(3)).unwrap();
        let trade = &report.runs[&Strategy::Trade];
        assert!(trade
            .steps
            .iter()
            .all(|s| (s.battery - report.initial_state.battery).abs() < 1e-12));
        assert!(trade.steps.iter().all(|s| s.action == EnergyAction::Trade));
    }

    #[test]
    fn test_dqn_run_records_q_values() {
        let agent = HouseholdAgent::new(DqnConfig {
            seed: Some(9),
            ..DqnConfig::default()
        })
        .unwrap();
        let mut env = env(0.5);
        let report = compare_strategies(&mut env, 24, Some(&agent), &mut StdRng::seed_from_u64(4)).unwrap();

        assert_eq!(report.runs.len(), 7);
        let q_values = report.q_values.as_ref().unwrap();
        assert_eq!(q_values.len(), 3);
        assert!(q_values.values().all(|trace| trace.len() == 24));

        let dqn = &report.runs[&Strategy::Dqn];
        for (i, step) in dqn.steps.iter().enumerate() {
            let best = EnergyAction::ALL
                .into_iter()
                .max_by(|a, b| q_values[a][i].total_cmp(&q_values[b][i]))
                .unwrap();
            assert_relative_eq!(q_values[&step.action][i], q_values[&best][i]);
        }
    }

    #[test]
    fn test_summary_and_ranking() {
        let run = StrategyRun {
            strategy: Strategy::Trade,
            steps: [1.0, 3.0, 2.0]
                .into_iter()
                .map(|cost| StepRecord {
                    action: EnergyAction::Trade,
                    cost,
                    battery: 0.0,
                    charge: 0.0,
                    discharge: 0.0,
                    generate: 0.0,
                    trade: 0.0,
                })
                .collect(),
        };
        let summary = run.summary();
        assert_relative_eq!(summary.mean, 2.0);
        assert_relative_eq!(summary.std_dev, 1.0);
        assert_relative_eq!(summary.min, 1.0);
        assert_relative_eq!(summary.max, 3.0);
        assert_eq!(run.cumulative_cost(), vec![1.0, 4.0, 6.0]);
    }

    #[test]
    fn test_single_step_summary_has_zero_spread() {
        let mut env = env(0.5);
        let report = compare_strategies(&mut env, 1, None, &mut StdRng::seed_from_u64(6)).unwrap();
        for run in report.runs.values() {
            let summary = run.summary();
            assert_relative_eq!(summary.std_dev, 0.0);
            assert_relative_eq!(summary.mean, run.total_cost());
        }
    }

    #[test]
    fn test_report_serializes_with_strategy_names() {
        let mut env = env(0.5);
        let report = compare_strategies(&mut env, 6, None, &mut StdRng::seed_from_u64(5)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["runs"]["SmartBattery2"]["steps"].is_array());

        let text = serde_json::to_string(&report).unwrap();
        let back: ComparisonReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, report);
    }
}
