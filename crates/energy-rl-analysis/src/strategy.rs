//! Named control strategies

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use energy_rl_agent::DqnAgent;
use energy_rl_core::{ActionSpace, DiscreteSpace, RLError, Result};
use energy_rl_env::{EnergyAction, HouseholdState};

/// DQN agent specialised to the household environment
pub type HouseholdAgent = DqnAgent<HouseholdState, EnergyAction>;

/// Share of capacity above which the battery counts as full
const FULL_BATTERY: f64 = 0.9999;

/// Baseline heuristics and the learned policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Uniformly random action
    Random,
    /// Only ever discharge, never charging the battery
    Nothing,
    /// Leave the battery alone and trade the whole balance
    Trade,
    /// Random choice between charging and discharging
    RandomBattery,
    /// Charge on surplus, discharge otherwise
    SmartBattery,
    /// Like `SmartBattery`, but trade the surplus once the battery is full
    SmartBattery2,
    /// Greedy action of a trained Q-network
    #[serde(rename = "DQN")]
    Dqn,
}

impl Strategy {
    /// Every strategy, in comparison order
    pub const ALL: [Strategy; 7] = [
        Self::Random,
        Self::Nothing,
        Self::Trade,
        Self::RandomBattery,
        Self::SmartBattery,
        Self::SmartBattery2,
        Self::Dqn,
    ];

    /// Display name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::Nothing => "Nothing",
            Self::Trade => "Trade",
            Self::RandomBattery => "RandomBattery",
            Self::SmartBattery => "SmartBattery",
            Self::SmartBattery2 => "SmartBattery2",
            Self::Dqn => "DQN",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RLError::Config(format!("unknown strategy `{s}`")))
    }
}

/// Action `strategy` takes in `state`
///
/// `Dqn` needs a `model`; without one it falls back to `Charge` and logs a
/// warning.
pub fn strategy_action<R: Rng + ?Sized>(
    strategy: Strategy,
    state: &HouseholdState,
    model: Option<&HouseholdAgent>,
    rng: &mut R,
) -> Result<EnergyAction> {
    let surplus = state.panel_prod > state.consumption;
    match strategy {
        Strategy::Random => DiscreteSpace::<EnergyAction>::full().sample(rng),
        Strategy::Nothing => Ok(EnergyAction::Discharge),
        Strategy::Trade => Ok(EnergyAction::Trade),
        Strategy::RandomBattery => {
            DiscreteSpace::subset(&[EnergyAction::Charge, EnergyAction::Discharge]).sample(rng)
        }
        Strategy::SmartBattery => Ok(if surplus {
            EnergyAction::Charge
        } else {
            EnergyAction::Discharge
        }),
        Strategy::SmartBattery2 => Ok(
            if surplus && state.battery < state.battery_capacity * FULL_BATTERY {
                EnergyAction::Charge
            } else if surplus {
                EnergyAction::Trade
            } else {
                EnergyAction::Discharge
            },
        ),
        Strategy::Dqn => match model {
            Some(agent) => agent.greedy_action(state),
            None => {
                tracing::warn!("no DQN model given, falling back to {}", EnergyAction::Charge);
                Ok(EnergyAction::Charge)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use energy_rl_agent::DqnConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state(battery: f64, prod: f64, cons: f64) -> HouseholdState {
        HouseholdState {
            step: 12,
            battery,
            battery_capacity: 10.0,
            panel_prod: prod,
            consumption: cons,
            price: 0.2,
            charge: 0.0,
            discharge: 0.0,
            generate: 0.0,
            trade: 0.0,
            prev_panel_prod: prod,
            prev_consumption: cons,
            prev_price: 0.2,
        }
    }

    fn act(strategy: Strategy, s: &HouseholdState) -> EnergyAction {
        strategy_action(strategy, s, None, &mut StdRng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn test_fixed_strategies() {
        let s = state(5.0, 1.0, 2.0);
        assert_eq!(act(Strategy::Nothing, &s), EnergyAction::Discharge);
        assert_eq!(act(Strategy::Trade, &s), EnergyAction::Trade);
    }

    #[test]
    fn test_smart_battery_follows_surplus() {
        assert_eq!(act(Strategy::SmartBattery, &state(10.0, 3.0, 1.0)), EnergyAction::Charge);
        assert_eq!(act(Strategy::SmartBattery, &state(10.0, 1.0, 3.0)), EnergyAction::Discharge);
    }

    #[test]
    fn test_smart_battery2_trades_when_full() {
        assert_eq!(act(Strategy::SmartBattery2, &state(9.9995, 3.0, 1.0)), EnergyAction::Trade);
        assert_eq!(act(Strategy::SmartBattery2, &state(10.0, 3.0, 1.0)), EnergyAction::Trade);
        assert_eq!(act(Strategy::SmartBattery2, &state(9.99, 3.0, 1.0)), EnergyAction::Charge);
        assert_eq!(act(Strategy::SmartBattery2, &state(10.0, 1.0, 3.0)), EnergyAction::Discharge);
    }

    #[test]
    fn test_random_battery_never_trades() {
        let s = state(5.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let action = strategy_action(Strategy::RandomBattery, &s, None, &mut rng).unwrap();
            assert_ne!(action, EnergyAction::Trade);
        }
    }

    #[test]
    fn test_random_covers_every_action() {
        let s = state(5.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(4);
        let seen: std::collections::HashSet<_> = (0..200)
            .map(|_| strategy_action(Strategy::Random, &s, None, &mut rng).unwrap())
            .collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_dqn_without_model_charges() {
        assert_eq!(act(Strategy::Dqn, &state(5.0, 0.0, 1.0)), EnergyAction::Charge);
    }

    #[test]
    fn test_dqn_with_model_is_greedy() {
        let agent = HouseholdAgent::new(DqnConfig {
            seed: Some(5),
            ..DqnConfig::default()
        })
        .unwrap();
        let s = state(5.0, 2.0, 1.0);
        let action = strategy_action(Strategy::Dqn, &s, Some(&agent), &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(action, agent.greedy_action(&s).unwrap());
    }

    #[test]
    fn test_names_roundtrip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("dqn".parse::<Strategy>().unwrap(), Strategy::Dqn);
        assert!("Hoard".parse::<Strategy>().is_err());
    }
}
