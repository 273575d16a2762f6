//! Battery control actions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use energy_rl_core::{DiscreteAction, RLError};

/// What the household does with its battery during one hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyAction {
    /// Store energy, importing from the grid when the panels fall short
    Charge,
    /// Cover the household deficit from the battery
    Discharge,
    /// Leave the battery alone and settle the balance with the grid
    Trade,
}

impl EnergyAction {
    /// Every action, in index order
    pub const ALL: [EnergyAction; 3] = [Self::Charge, Self::Discharge, Self::Trade];

    /// Lowercase name used in configs, reports and plots
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Discharge => "discharge",
            Self::Trade => "trade",
        }
    }
}

impl DiscreteAction for EnergyAction {
    const COUNT: usize = 3;

    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn index(self) -> usize {
        match self {
            Self::Charge => 0,
            Self::Discharge => 1,
            Self::Trade => 2,
        }
    }
}

impl fmt::Display for EnergyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EnergyAction {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RLError::InvalidAction(s.to_string()))
    }
}
