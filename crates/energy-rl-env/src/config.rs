//! Household environment configuration

use serde::{Deserialize, Serialize};

use energy_rl_core::{RLError, Result};

/// Battery storage parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// Usable capacity (kWh)
    pub capacity: f64,
    /// Maximum energy drawn into the battery per hour (kWh)
    pub max_charge_rate: f64,
    /// Maximum energy released per hour (kWh)
    pub max_discharge_rate: f64,
    /// Share of charged energy that ends up stored
    pub efficiency: f64,
    /// Charge level at the start of an episode; random when unset
    pub initial_level: Option<f64>,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity: 10.0,
            max_charge_rate: 3.0,
            max_discharge_rate: 3.0,
            efficiency: 0.95,
            initial_level: None,
        }
    }
}

/// Backup generator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Maximum output per hour (kWh); zero disables the generator
    pub capacity: f64,
    /// Fuel cost per generated kWh
    pub cost_per_kwh: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            capacity: 1.0,
            cost_per_kwh: 0.30,
        }
    }
}

/// Parameters of the synthetic production, consumption and price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    /// Clear-sky solar output at solar noon (kWh)
    pub peak_production: f64,
    /// Lower bound of the daily cloud factor
    pub min_cloud_factor: f64,
    /// Always-on household load (kWh)
    pub base_consumption: f64,
    /// Height of the morning consumption bump (kWh)
    pub morning_peak: f64,
    /// Height of the evening consumption bump (kWh)
    pub evening_peak: f64,
    /// Standard deviation of the consumption noise
    pub consumption_noise: f64,
    /// Consumption floor (kWh)
    pub min_consumption: f64,
    /// Tariff between 22:00 and 06:00
    pub night_price: f64,
    /// Daytime tariff
    pub day_price: f64,
    /// Tariff between 17:00 and 21:00
    pub peak_price: f64,
    /// Standard deviation of the price noise
    pub price_noise: f64,
    /// Price floor
    pub min_price: f64,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            peak_production: 4.0,
            min_cloud_factor: 0.3,
            base_consumption: 0.5,
            morning_peak: 1.2,
            evening_peak: 2.0,
            consumption_noise: 0.15,
            min_consumption: 0.1,
            night_price: 0.12,
            day_price: 0.22,
            peak_price: 0.35,
            price_noise: 0.02,
            min_price: 0.01,
        }
    }
}

/// Configuration for [`crate::HouseholdEnv`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdConfig {
    /// Battery storage
    pub battery: BatteryConfig,
    /// Backup generator
    pub generator: GeneratorConfig,
    /// Share of the grid price paid for exported energy
    pub sell_price_ratio: f64,
    /// Length of the generated series (hours); stepping wraps around
    pub horizon: usize,
    /// Exogenous series parameters
    pub series: SeriesConfig,
    /// Random seed
    pub seed: Option<u64>,
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            battery: BatteryConfig::default(),
            generator: GeneratorConfig::default(),
            sell_price_ratio: 0.5,
            horizon: 24 * 14,
            series: SeriesConfig::default(),
            seed: None,
        }
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(RLError::Config(message()))
    }
}

impl HouseholdConfig {
    /// Reject physically meaningless settings
    pub fn validate(&self) -> Result<()> {
        let battery = &self.battery;
        ensure(battery.capacity > 0.0, || {
            format!("battery capacity must be positive, got {}", battery.capacity)
        })?;
        ensure(
            battery.max_charge_rate >= 0.0 && battery.max_discharge_rate >= 0.0,
            || "battery rates must be non-negative".to_string(),
        )?;
        ensure(battery.efficiency > 0.0 && battery.efficiency <= 1.0, || {
            format!("battery efficiency must lie in (0, 1], got {}", battery.efficiency)
        })?;
        if let Some(level) = battery.initial_level {
            ensure((0.0..=battery.capacity).contains(&level), || {
                format!("initial battery level {level} outside [0, {}]", battery.capacity)
            })?;
        }
        ensure(
            self.generator.capacity >= 0.0 && self.generator.cost_per_kwh >= 0.0,
            || "generator capacity and cost must be non-negative".to_string(),
        )?;
        ensure((0.0..=1.0).contains(&self.sell_price_ratio), || {
            format!("sell_price_ratio must lie in [0, 1], got {}", self.sell_price_ratio)
        })?;
        ensure(self.horizon > 0, || "horizon must be non-zero".to_string())?;

        let series = &self.series;
        ensure(
            (0.0..=1.0).contains(&series.min_cloud_factor),
            || format!("min_cloud_factor must lie in [0, 1], got {}", series.min_cloud_factor),
        )?;
        ensure(
            series.consumption_noise >= 0.0 && series.price_noise >= 0.0,
            || "noise levels must be non-negative".to_string(),
        )?;
        ensure(
            series.min_consumption >= 0.0 && series.min_price >= 0.0,
            || "consumption and price floors must be non-negative".to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        HouseholdConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_battery() {
        let mut config = HouseholdConfig::default();
        config.battery.capacity = 0.0;
        assert!(config.validate().is_err());

        let mut config = HouseholdConfig::default();
        config.battery.efficiency = 1.5;
        assert!(config.validate().is_err());

        let mut config = HouseholdConfig::default();
        config.battery.initial_level = Some(11.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_horizon() {
        let config = HouseholdConfig {
            horizon: 0,
            ..HouseholdConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HouseholdConfig =
            serde_json::from_str(r#"{"battery": {"capacity": 5.0}, "seed": 3}"#).unwrap();
        assert!((config.battery.capacity - 5.0).abs() < f64::EPSILON);
        assert!((config.battery.max_charge_rate - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.horizon, 336);
    }
}
