//! Household energy environment

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use energy_rl_core::{Environment, RLError, Result, Reward, Step};

use crate::action::EnergyAction;
use crate::config::HouseholdConfig;
use crate::series::EnergySeries;
use crate::state::HouseholdState;

/// Solar-plus-battery household settling its balance with the grid
///
/// One step is one hour. The exogenous series are generated once per
/// horizon and indexed by [`HouseholdState::step`], so restoring a saved
/// state replays exactly the same production, consumption and prices.
#[derive(Debug, Clone)]
pub struct HouseholdEnv {
    config: HouseholdConfig,
    series: EnergySeries,
    state: HouseholdState,
    rng: StdRng,
}

impl HouseholdEnv {
    /// Create a new household environment
    pub fn new(config: HouseholdConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let series = EnergySeries::generate(&config.series, config.horizon, &mut rng)?;
        let mut env = Self {
            state: HouseholdState {
                step: 0,
                battery: 0.0,
                battery_capacity: config.battery.capacity,
                panel_prod: 0.0,
                consumption: 0.0,
                price: 0.0,
                charge: 0.0,
                discharge: 0.0,
                generate: 0.0,
                trade: 0.0,
                prev_panel_prod: 0.0,
                prev_consumption: 0.0,
                prev_price: 0.0,
            },
            config,
            series,
            rng,
        };
        env.state = env.initial_state(0);
        Ok(env)
    }

    /// Environment configuration
    #[must_use]
    pub fn config(&self) -> &HouseholdConfig {
        &self.config
    }

    /// Exogenous series the environment currently steps through
    #[must_use]
    pub fn series(&self) -> &EnergySeries {
        &self.series
    }

    /// Regenerate the series with `horizon` hours and start at its first hour
    pub fn reset_with_horizon(&mut self, horizon: usize) -> Result<HouseholdState> {
        if horizon == 0 {
            return Err(RLError::Config("horizon must be non-zero".into()));
        }
        self.config.horizon = horizon;
        self.series = EnergySeries::generate(&self.config.series, horizon, &mut self.rng)?;
        self.state = self.initial_state(0);
        Ok(self.state.clone())
    }

    fn initial_state(&mut self, step: usize) -> HouseholdState {
        let capacity = self.config.battery.capacity;
        let battery = self
            .config
            .battery
            .initial_level
            .unwrap_or_else(|| self.rng.gen_range(0.0..=capacity));
        let (panel_prod, consumption, price) = self.series.at(step);
        let (prev_panel_prod, prev_consumption, prev_price) =
            self.series.at(step + self.series.len() - 1);

        HouseholdState {
            step,
            battery,
            battery_capacity: capacity,
            panel_prod,
            consumption,
            price,
            charge: 0.0,
            discharge: 0.0,
            generate: 0.0,
            trade: 0.0,
            prev_panel_prod,
            prev_consumption,
            prev_price,
        }
    }

    /// Apply `action` to `state` without touching the environment
    ///
    /// Returns the next state and the cost paid during the hour.
    pub fn transition(&self, state: &HouseholdState, action: EnergyAction) -> Result<(HouseholdState, f64)> {
        let battery_cfg = &self.config.battery;
        let capacity = battery_cfg.capacity;
        if !(0.0..=capacity + 1e-9).contains(&state.battery) {
            return Err(RLError::InvalidState(format!(
                "battery level {} outside [0, {capacity}]",
                state.battery
            )));
        }

        let surplus = state.surplus();
        let mut battery = state.battery;
        let mut charge = 0.0;
        let mut discharge = 0.0;
        let mut generate = 0.0;

        let trade = match action {
            EnergyAction::Charge => {
                let room = ((capacity - battery) / battery_cfg.efficiency).max(0.0);
                charge = battery_cfg.max_charge_rate.min(room);
                battery = (battery + charge * battery_cfg.efficiency).min(capacity);
                surplus - charge
            }
            EnergyAction::Discharge => {
                let deficit = (-surplus).max(0.0);
                discharge = battery_cfg.max_discharge_rate.min(battery).min(deficit);
                battery -= discharge;

                let remaining = deficit - discharge;
                let generator = &self.config.generator;
                if remaining > 0.0 && state.price > generator.cost_per_kwh {
                    generate = generator.capacity.min(remaining);
                }
                surplus + discharge + generate
            }
            EnergyAction::Trade => surplus,
        };

        let grid_cost = if trade < 0.0 {
            -trade * state.price
        } else {
            -trade * state.price * self.config.sell_price_ratio
        };
        let cost = grid_cost + generate * self.config.generator.cost_per_kwh;

        let step = (state.step + 1) % self.series.len();
        let (panel_prod, consumption, price) = self.series.at(step);
        let next = HouseholdState {
            step,
            battery,
            battery_capacity: capacity,
            panel_prod,
            consumption,
            price,
            charge,
            discharge,
            generate,
            trade,
            prev_panel_prod: state.panel_prod,
            prev_consumption: state.consumption,
            prev_price: state.price,
        };
        Ok((next, cost))
    }
}

impl Environment for HouseholdEnv {
    type State = HouseholdState;
    type Action = EnergyAction;

    fn reset(&mut self) -> Result<HouseholdState> {
        let start = self.rng.gen_range(0..self.series.len());
        self.state = self.initial_state(start);
        Ok(self.state.clone())
    }

    fn step(&mut self, action: EnergyAction) -> Result<Step<HouseholdState>> {
        let (next, cost) = self.transition(&self.state, action)?;
        self.state = next.clone();
        Ok(Step {
            state: next,
            reward: Reward::from_cost(cost),
            cost,
            done: false,
        })
    }

    fn current_state(&self) -> &HouseholdState {
        &self.state
    }

    fn restore(&mut self, state: HouseholdState) -> Result<()> {
        if state.step >= self.series.len() {
            return Err(RLError::InvalidState(format!(
                "step {} beyond series of {} hours",
                state.step,
                self.series.len()
            )));
        }
        if !(0.0..=self.config.battery.capacity).contains(&state.battery) {
            return Err(RLError::InvalidState(format!(
                "battery level {} outside [0, {}]",
                state.battery, self.config.battery.capacity
            )));
        }
        self.state = state;
        Ok(())
    }
}
