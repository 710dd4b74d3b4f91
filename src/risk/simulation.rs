//! Terminal price simulation.
//!
//! Each volatility in the sample produces one terminal price
//! `S * (1 + r)` with `r ~ N(0, vol * sqrt(horizon_days / trading_days_per_year))`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Length of the simulated move in trading days.
    pub horizon_days: f64,
    /// Trading days per year used to de-annualize volatilities.
    pub trading_days_per_year: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_days: 1.0,
            trading_days_per_year: 252.0,
            seed: 7,
        }
    }
}

impl SimulationConfig {
    /// Factor turning an annualized volatility into a horizon return sd.
    pub fn horizon_scale(&self) -> f64 {
        (self.horizon_days / self.trading_days_per_year).sqrt()
    }
}

/// Seeded simulator of terminal underlying prices.
pub struct PriceSimulator {
    config: SimulationConfig,
    rng: StdRng,
}

impl PriceSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// One terminal price per annualized volatility, in sample order.
    pub fn terminal_prices(&mut self, spot: f64, vols: &[f64]) -> Vec<f64> {
        let scale = self.config.horizon_scale();
        vols.iter()
            .map(|vol| {
                let z: f64 = self.rng.sample(StandardNormal);
                spot * (1.0 + vol * scale * z)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statrs::statistics::Statistics;

    #[test]
    fn test_seeded_runs_repeat() {
        let vols = vec![0.2; 100];
        let a = PriceSimulator::new(SimulationConfig::default()).terminal_prices(100.0, &vols);
        let b = PriceSimulator::new(SimulationConfig::default()).terminal_prices(100.0, &vols);
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
    }

    #[test]
    fn test_zero_vol_keeps_spot() {
        let mut sim = PriceSimulator::new(SimulationConfig::default());
        let prices = sim.terminal_prices(4106.62, &[0.0, 0.0]);
        assert_eq!(prices, vec![4106.62, 4106.62]);
    }

    #[test]
    fn test_return_dispersion_matches_scaled_vol() {
        let config = SimulationConfig {
            horizon_days: 5.0,
            ..Default::default()
        };
        let expected_sd = 0.3 * (5.0f64 / 252.0).sqrt();

        let mut sim = PriceSimulator::new(config);
        let prices = sim.terminal_prices(100.0, &vec![0.3; 50_000]);
        let returns: Vec<f64> = prices.iter().map(|p| p / 100.0 - 1.0).collect();

        assert_relative_eq!(returns.clone().mean(), 0.0, epsilon = 3e-3);
        assert_relative_eq!(returns.std_dev(), expected_sd, max_relative = 0.03);
    }
}
