//! Household energy environment for reinforcement learning
//!
//! A single household with solar panels, a battery and a backup generator
//! settles its hourly energy balance with the grid. Production, consumption
//! and prices come from seeded synthetic series, so every run can be
//! replayed exactly.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod config;
pub mod household;
pub mod series;
pub mod state;

pub use action::EnergyAction;
pub use config::{BatteryConfig, GeneratorConfig, HouseholdConfig, SeriesConfig};
pub use household::HouseholdEnv;
pub use series::EnergySeries;
pub use state::{HouseholdState, HOURS_PER_DAY};

// Re-export core types
pub use energy_rl_core::{DiscreteAction, Environment, Reward, State, Step};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{EnergyAction, HouseholdConfig, HouseholdEnv, HouseholdState};
    pub use energy_rl_core::prelude::*;
}
