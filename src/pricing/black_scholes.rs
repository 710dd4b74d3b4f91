//! Black-Scholes pricing for European options on a non-dividend-paying
//! underlying.
//!
//! Time is in years and the rate is continuously compounded over the same
//! unit. Inputs are expected to be strictly positive; use
//! [`BlackScholes::validate`] before pricing values that come from data.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;
use thiserror::Error;

use crate::data::OptionType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Invalid {name}: {value} (must be finite and positive)")]
    InvalidInput { name: &'static str, value: f64 },
}

/// Black-Scholes calculator.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Risk-free rate, annualized
    pub rate: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self { rate: 0.0 }
    }
}

impl BlackScholes {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Check that every input is finite and strictly positive.
    pub fn validate(spot: f64, strike: f64, time: f64, vol: f64) -> Result<(), PricingError> {
        for (name, value) in [
            ("spot", spot),
            ("strike", strike),
            ("time", time),
            ("volatility", vol),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PricingError::InvalidInput { name, value });
            }
        }
        Ok(())
    }

    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        ((spot / strike).ln() + (self.rate + 0.5 * vol * vol) * time) / (vol * time.sqrt())
    }

    /// Standard normal CDF.
    fn norm_cdf(x: f64) -> f64 {
        0.5 * erfc(-x / SQRT_2)
    }

    pub fn call_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let d1 = self.d1(spot, strike, time, vol);
        let d2 = d1 - vol * time.sqrt();

        spot * Self::norm_cdf(d1) - strike * (-self.rate * time).exp() * Self::norm_cdf(d2)
    }

    pub fn put_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let d1 = self.d1(spot, strike, time, vol);
        let d2 = d1 - vol * time.sqrt();

        strike * (-self.rate * time).exp() * Self::norm_cdf(-d2) - spot * Self::norm_cdf(-d1)
    }

    pub fn price(&self, right: OptionType, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        match right {
            OptionType::Call => self.call_price(spot, strike, time, vol),
            OptionType::Put => self.put_price(spot, strike, time, vol),
        }
    }
}
