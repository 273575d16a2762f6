//! Household state snapshot

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use energy_rl_core::State;

/// Hours in one simulated day
pub const HOURS_PER_DAY: usize = 24;

/// Snapshot of the household at the start of one hour
///
/// The flow fields (`charge`, `discharge`, `generate`, `trade`) describe the
/// transition that led into this state; they are zero for an initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdState {
    /// Index into the exogenous series
    pub step: usize,
    /// Stored energy (kWh)
    pub battery: f64,
    /// Usable battery capacity (kWh)
    pub battery_capacity: f64,
    /// Solar production this hour (kWh)
    pub panel_prod: f64,
    /// Household consumption this hour (kWh)
    pub consumption: f64,
    /// Grid price this hour (per kWh)
    pub price: f64,
    /// Energy drawn into the battery
    pub charge: f64,
    /// Energy released from the battery
    pub discharge: f64,
    /// Energy produced by the backup generator
    pub generate: f64,
    /// Grid balance: positive exports, negative imports
    pub trade: f64,
    /// Solar production of the previous hour
    pub prev_panel_prod: f64,
    /// Consumption of the previous hour
    pub prev_consumption: f64,
    /// Grid price of the previous hour
    pub prev_price: f64,
}

impl HouseholdState {
    /// Hour of day, 0..24
    #[must_use]
    pub fn hour(&self) -> usize {
        self.step % HOURS_PER_DAY
    }

    /// Production minus consumption
    #[must_use]
    pub fn surplus(&self) -> f64 {
        self.panel_prod - self.consumption
    }

    /// Stored energy as a share of capacity
    #[must_use]
    pub fn battery_fraction(&self) -> f64 {
        if self.battery_capacity > 0.0 {
            self.battery / self.battery_capacity
        } else {
            0.0
        }
    }
}

impl State for HouseholdState {
    const FEATURE_DIM: usize = 15;

    fn features(&self) -> Vec<f64> {
        #[allow(clippy::cast_precision_loss)]
        let phase = TAU * self.hour() as f64 / HOURS_PER_DAY as f64;
        vec![
            self.battery,
            self.battery_fraction(),
            self.panel_prod,
            self.consumption,
            self.price,
            self.charge,
            self.discharge,
            self.generate,
            self.trade,
            self.consumption - self.panel_prod,
            phase.sin(),
            phase.cos(),
            self.prev_panel_prod,
            self.prev_consumption,
            self.prev_price,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_state() -> HouseholdState {
        HouseholdState {
            step: 30,
            battery: 2.5,
            battery_capacity: 10.0,
            panel_prod: 1.5,
            consumption: 0.75,
            price: 0.2,
            charge: 0.0,
            discharge: 0.0,
            generate: 0.0,
            trade: 0.0,
            prev_panel_prod: 1.0,
            prev_consumption: 0.5,
            prev_price: 0.18,
        }
    }

    #[test]
    fn test_feature_vector_has_declared_width() {
        assert_eq!(sample_state().features().len(), HouseholdState::FEATURE_DIM);
    }

    #[test]
    fn test_derived_quantities() {
        let state = sample_state();
        assert_eq!(state.hour(), 6);
        assert_relative_eq!(state.surplus(), 0.75);
        assert_relative_eq!(state.battery_fraction(), 0.25);

        let features = state.features();
        assert_relative_eq!(features[9], -0.75);
        assert_relative_eq!(features[10], 1.0, epsilon = 1e-12);
    }
}
