//! Kelly criterion sizing over sampled outcomes.
//!
//! Given normalized per-unit outcomes `x_i`, finds the fraction `f` that
//! maximizes expected log growth `mean(ln(1 + f * x_i))`. The search is a
//! one-dimensional Brent minimization of the negated objective over the
//! interval where every `1 + f * x_i` stays positive. `max_leverage` only
//! bounds a side the sample leaves open, e.g. the long side when no outcome
//! is a loss.

use argmin::core::{CostFunction, Error, Executor};
use argmin::solver::brent::BrentOpt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KellyError {
    #[error("No outcomes to size against")]
    EmptySample,

    #[error("Non-finite outcome at index {0}")]
    NonFinite(usize),

    #[error("Solver failed: {0}")]
    Solver(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KellyConfig {
    /// Bound on a side with no feasibility limit.
    pub max_leverage: f64,
    /// Maximum Brent iterations.
    pub max_iterations: u64,
    /// Relative pull-back from a feasibility boundary, where ln(0) lives.
    pub boundary_shrink: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            max_leverage: 1.0,
            max_iterations: 100,
            boundary_shrink: 1e-6,
        }
    }
}

/// Result of a Kelly optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KellyEstimate {
    /// Optimal fraction.
    pub fraction: f64,
    /// Expected log growth at `fraction`.
    pub expected_log_growth: f64,
    /// Search interval.
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Solver iterations used.
    pub iterations: u64,
}

/// Negated expected log growth.
struct NegLogGrowth {
    outcomes: Vec<f64>,
}

impl NegLogGrowth {
    fn value(&self, fraction: f64) -> f64 {
        let mut total = 0.0;
        for x in &self.outcomes {
            let wealth = 1.0 + fraction * x;
            if wealth <= 0.0 {
                return f64::INFINITY;
            }
            total += wealth.ln();
        }
        -total / self.outcomes.len() as f64
    }
}

impl CostFunction for NegLogGrowth {
    type Param = f64;
    type Output = f64;

    fn cost(&self, fraction: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.value(*fraction))
    }
}

/// Brent-based Kelly optimizer.
#[derive(Debug, Clone, Default)]
pub struct KellyOptimizer {
    config: KellyConfig,
}

impl KellyOptimizer {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    /// Search interval for the given outcomes.
    ///
    /// Each side is the feasibility limit set by the largest win (lower) or
    /// the worst loss (upper). A side without one falls back to
    /// `max_leverage`.
    pub fn search_interval(&self, outcomes: &[f64]) -> (f64, f64) {
        let keep = 1.0 - self.config.boundary_shrink;
        let cap = self.config.max_leverage.abs();

        let best_win = outcomes.iter().copied().filter(|&x| x > 0.0).reduce(f64::max);
        let worst_loss = outcomes.iter().copied().filter(|&x| x < 0.0).reduce(f64::min);

        let lower = best_win.map_or(-cap, |x| -keep / x);
        let upper = worst_loss.map_or(cap, |x| -keep / x);
        (lower, upper)
    }

    /// Maximize expected log growth over `outcomes`.
    ///
    /// A sample of all zeros returns a fraction of 0.
    pub fn optimize(&self, outcomes: &[f64]) -> Result<KellyEstimate, KellyError> {
        if outcomes.is_empty() {
            return Err(KellyError::EmptySample);
        }
        if let Some(idx) = outcomes.iter().position(|x| !x.is_finite()) {
            return Err(KellyError::NonFinite(idx));
        }

        let (lower, upper) = self.search_interval(outcomes);

        if outcomes.iter().all(|&x| x == 0.0) || upper - lower <= f64::EPSILON {
            return Ok(KellyEstimate {
                fraction: 0.0,
                expected_log_growth: 0.0,
                lower_bound: lower,
                upper_bound: upper,
                iterations: 0,
            });
        }

        let problem = NegLogGrowth {
            outcomes: outcomes.to_vec(),
        };
        let objective = NegLogGrowth {
            outcomes: outcomes.to_vec(),
        };

        let result = Executor::new(problem, BrentOpt::new(lower, upper))
            .configure(|state| state.max_iters(self.config.max_iterations))
            .run()
            .map_err(|e| KellyError::Solver(e.to_string()))?;

        let state = result.state();
        let solved = state
            .best_param
            .ok_or_else(|| KellyError::Solver("no solution found".to_string()))?;

        // Brent never evaluates the endpoints; monotone objectives peak there
        let fraction = [solved, lower, upper]
            .into_iter()
            .min_by(|a, b| objective.value(*a).total_cmp(&objective.value(*b)))
            .unwrap_or(solved);

        debug!(
            "Kelly: f={:.4} in [{:.4}, {:.4}] after {} iterations",
            fraction, lower, upper, state.iter
        );

        Ok(KellyEstimate {
            fraction,
            expected_log_growth: -objective.value(fraction),
            lower_bound: lower,
            upper_bound: upper,
            iterations: state.iter,
        })
    }
}

/// Two-outcome summary of a normalized PnL sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Share of strictly positive outcomes.
    pub win_probability: f64,
    /// Mean of positive outcomes.
    pub mean_profit: f64,
    /// Mean magnitude of negative outcomes.
    pub mean_loss: f64,
}

impl OutcomeSummary {
    pub fn from_outcomes(outcomes: &[f64]) -> Option<Self> {
        if outcomes.is_empty() {
            return None;
        }

        let (mut wins, mut win_sum) = (0usize, 0.0);
        let (mut losses, mut loss_sum) = (0usize, 0.0);
        for &x in outcomes {
            if x > 0.0 {
                wins += 1;
                win_sum += x;
            } else if x < 0.0 {
                losses += 1;
                loss_sum -= x;
            }
        }

        let mean = |sum: f64, n: usize| if n > 0 { sum / n as f64 } else { 0.0 };
        Some(Self {
            win_probability: wins as f64 / outcomes.len() as f64,
            mean_profit: mean(win_sum, wins),
            mean_loss: mean(loss_sum, losses),
        })
    }

    /// Closed-form estimate `p / mean_loss - (1 - p) / mean_profit`.
    ///
    /// `None` unless the sample has both wins and losses.
    pub fn closed_form_fraction(&self) -> Option<f64> {
        if self.mean_loss > 0.0 && self.mean_profit > 0.0 {
            let p = self.win_probability;
            Some(p / self.mean_loss - (1.0 - p) / self.mean_profit)
        } else {
            None
        }
    }
}
