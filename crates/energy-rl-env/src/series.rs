//! Synthetic hourly production, consumption and price series

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use energy_rl_core::{RLError, Result};

use crate::config::SeriesConfig;
use crate::state::HOURS_PER_DAY;

const SUNRISE: f64 = 6.0;
const SUNSET: f64 = 20.0;

/// Exogenous inputs of the household, one entry per hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySeries {
    /// Solar production (kWh)
    pub production: Vec<f64>,
    /// Household consumption (kWh)
    pub consumption: Vec<f64>,
    /// Grid price (per kWh)
    pub price: Vec<f64>,
}

/// Clear-sky share of peak output at the middle of `hour`
fn daylight(hour: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let h = hour as f64 + 0.5;
    if (SUNRISE..SUNSET).contains(&h) {
        (PI * (h - SUNRISE) / (SUNSET - SUNRISE)).sin()
    } else {
        0.0
    }
}

fn bump(hour: usize, center: f64, width: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let z = (hour as f64 + 0.5 - center) / width;
    (-0.5 * z * z).exp()
}

fn tariff(config: &SeriesConfig, hour: usize) -> f64 {
    match hour {
        0..=5 | 22..=23 => config.night_price,
        17..=20 => config.peak_price,
        _ => config.day_price,
    }
}

fn normal(std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std_dev).map_err(|e| RLError::Config(format!("invalid noise level: {e}")))
}

impl EnergySeries {
    /// Generate `len` hours starting at midnight
    pub fn generate<R: Rng + ?Sized>(config: &SeriesConfig, len: usize, rng: &mut R) -> Result<Self> {
        if len == 0 {
            return Err(RLError::Config("series length must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&config.min_cloud_factor) {
            return Err(RLError::Config(format!(
                "min_cloud_factor must lie in [0, 1], got {}",
                config.min_cloud_factor
            )));
        }
        let consumption_noise = normal(config.consumption_noise)?;
        let price_noise = normal(config.price_noise)?;
        let clouds = Uniform::new_inclusive(config.min_cloud_factor, 1.0);

        let mut production = Vec::with_capacity(len);
        let mut consumption = Vec::with_capacity(len);
        let mut price = Vec::with_capacity(len);
        let mut cloud_factor = 1.0;

        for t in 0..len {
            let hour = t % HOURS_PER_DAY;
            if hour == 0 {
                cloud_factor = clouds.sample(rng);
            }

            production.push(config.peak_production * daylight(hour) * cloud_factor);

            let load = config.base_consumption
                + config.morning_peak * bump(hour, 7.5, 1.0)
                + config.evening_peak * bump(hour, 19.5, 1.5)
                + consumption_noise.sample(rng);
            consumption.push(load.max(config.min_consumption));

            let p = tariff(config, hour) + price_noise.sample(rng);
            price.push(p.max(config.min_price));
        }

        tracing::debug!(hours = len, "generated household series");
        Ok(Self {
            production,
            consumption,
            price,
        })
    }

    /// Number of hours in the series
    #[must_use]
    pub fn len(&self) -> usize {
        self.price.len()
    }

    /// Whether the series is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.price.is_empty()
    }

    /// `(production, consumption, price)` at `step`, wrapping around the end
    #[must_use]
    pub fn at(&self, step: usize) -> (f64, f64, f64) {
        let i = step % self.len();
        (self.production[i], self.consumption[i], self.price[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_same_seed_same_series() {
        let config = SeriesConfig::default();
        let a = EnergySeries::generate(&config, 72, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = EnergySeries::generate(&config, 72, &mut StdRng::seed_from_u64(5)).unwrap();
        let c = EnergySeries::generate(&config, 72, &mut StdRng::seed_from_u64(6)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_no_sun_at_night_and_floors_hold() {
        let config = SeriesConfig::default();
        let series = EnergySeries::generate(&config, 24 * 5, &mut StdRng::seed_from_u64(1)).unwrap();
        for t in 0..series.len() {
            let (prod, cons, price) = series.at(t);
            let hour = t % HOURS_PER_DAY;
            if !(6..20).contains(&hour) {
                assert_relative_eq!(prod, 0.0);
            }
            assert!(prod >= 0.0 && prod <= config.peak_production);
            assert!(cons >= config.min_consumption);
            assert!(price >= config.min_price);
        }
    }

    #[test]
    fn test_noise_free_series_follows_tariff() {
        let config = SeriesConfig {
            price_noise: 0.0,
            consumption_noise: 0.0,
            ..SeriesConfig::default()
        };
        let series = EnergySeries::generate(&config, 24, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_relative_eq!(series.price[3], config.night_price);
        assert_relative_eq!(series.price[12], config.day_price);
        assert_relative_eq!(series.price[18], config.peak_price);
        assert!(series.consumption[19] > series.consumption[3]);
    }

    #[test]
    fn test_indexing_wraps() {
        let series = EnergySeries::generate(&SeriesConfig::default(), 24, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(series.at(25), series.at(1));
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(EnergySeries::generate(&SeriesConfig::default(), 0, &mut StdRng::seed_from_u64(2)).is_err());
    }
}
