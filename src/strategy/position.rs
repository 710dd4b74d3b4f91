//! Option chain evaluation and Kelly sizing for a short Iron Condor.
//!
//! Pipeline:
//! 1. Price every contract with Black-Scholes at the ATM implied vol
//! 2. Skew premium = mid - model value
//! 3. Select the condor legs
//! 4. Simulate terminal prices from the volatility sample
//! 5. Size with the Kelly criterion over normalized PnL

use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::{debug, info};

use crate::data::OptionsChain;
use crate::pricing::BlackScholes;
use crate::risk::{
    KellyError, KellyEstimate, KellyOptimizer, OutcomeSummary, PriceSimulator, SimulationConfig,
};

use super::iron_condor::{CondorConfig, CondorSummary, ShortIronCondor};
use super::selection::{select_legs, SelectionError};

/// Per-share PnL divided by this gives return on $1000 of margin
/// (100 shares per contract, $10 wide wings).
const PNL_NORMALIZER: f64 = 10.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PositionError {
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Numeric error: {0}")]
    Numeric(String),

    #[error("Kelly error: {0}")]
    Kelly(#[from] KellyError),

    #[error("Volatility sample is empty")]
    EmptyVolSample,
}

/// Model value and skew premium of one contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractValuation {
    pub model_value: f64,
    pub mid: Decimal,
    pub skew_premium: f64,
}

/// Valuation of every contract in a chain, in chain order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainValuation {
    pub atm_index: usize,
    pub atm_vol: f64,
    pub contracts: Vec<ContractValuation>,
}

impl ChainValuation {
    pub fn skew_premiums(&self) -> Vec<f64> {
        self.contracts.iter().map(|c| c.skew_premium).collect()
    }
}

/// Output of a sizing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingReport {
    pub underlying_price: f64,
    pub atm_vol: f64,
    pub condor: CondorSummary,
    pub kelly: KellyEstimate,
    /// `p / mean_loss - (1 - p) / mean_profit`, when defined.
    pub closed_form_kelly: Option<f64>,
    pub outcomes: OutcomeSummary,
    pub vol_mean: f64,
    /// Sample standard deviation; 0 for a single draw.
    pub vol_std: f64,
    pub paths: usize,
}

/// A chain snapshot plus everything needed to evaluate it.
pub struct OptionPosition<'a> {
    chain: &'a OptionsChain,
    vols: &'a [f64],
    dte: f64,
    rate: f64,
    config: CondorConfig,
}

impl<'a> OptionPosition<'a> {
    /// `vols` are annualized; `dte` is in trading days; `rate` is annualized.
    pub fn new(
        chain: &'a OptionsChain,
        vols: &'a [f64],
        dte: f64,
        rate: f64,
        config: CondorConfig,
    ) -> Self {
        Self {
            chain,
            vols,
            dte,
            rate,
            config,
        }
    }

    fn time_to_expiry(&self) -> f64 {
        self.dte / self.config.days_per_year
    }

    /// Price the chain at the ATM implied vol.
    pub fn valuation(&self) -> Result<ChainValuation, PositionError> {
        let atm_index = self.chain.atm_index().ok_or(SelectionError::EmptyChain)?;
        let atm_vol = self.chain.contracts[atm_index].implied_vol;
        let time = self.time_to_expiry();
        let pricer = BlackScholes::new(self.rate);

        let contracts = self
            .chain
            .contracts
            .iter()
            .map(|contract| {
                let spot = to_f64(contract.underlying_price);
                let strike = to_f64(contract.strike);
                BlackScholes::validate(spot, strike, time, atm_vol)
                    .map_err(|e| PositionError::Numeric(e.to_string()))?;

                let model_value = pricer.price(contract.right, spot, strike, time, atm_vol);
                let mid = contract.mid();
                Ok(ContractValuation {
                    model_value,
                    mid,
                    skew_premium: to_f64(mid) - model_value,
                })
            })
            .collect::<Result<Vec<_>, PositionError>>()?;

        debug!(
            "Valued {} contracts at ATM vol {:.4} (index {})",
            contracts.len(),
            atm_vol,
            atm_index
        );

        Ok(ChainValuation {
            atm_index,
            atm_vol,
            contracts,
        })
    }

    /// Build the short Iron Condor for this chain.
    pub fn condor(&self) -> Result<ShortIronCondor<'a>, PositionError> {
        self.priced_condor().map(|(_, condor)| condor)
    }

    fn priced_condor(&self) -> Result<(ChainValuation, ShortIronCondor<'a>), PositionError> {
        let valuation = self.valuation()?;
        let chain: &'a OptionsChain = self.chain;
        let legs = select_legs(chain, &valuation.skew_premiums(), self.config.hedge_width)?;
        Ok((
            valuation,
            ShortIronCondor::new(legs, self.config.slippage_haircut),
        ))
    }

    /// Normalized PnL of the condor across simulated terminal prices.
    pub fn simulated_pnl(
        &self,
        condor: &ShortIronCondor<'_>,
        simulation: &SimulationConfig,
    ) -> Result<Vec<f64>, PositionError> {
        if self.vols.is_empty() {
            return Err(PositionError::EmptyVolSample);
        }
        if let Some(bad) = self.vols.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(PositionError::Numeric(format!("invalid volatility {}", bad)));
        }

        let spot = self
            .chain
            .underlying_price()
            .map(to_f64)
            .ok_or(SelectionError::EmptyChain)?;

        let prices = PriceSimulator::new(simulation.clone()).terminal_prices(spot, self.vols);

        Ok(prices
            .par_iter()
            .map(|&price| condor.pnl(price) / PNL_NORMALIZER)
            .collect())
    }

    /// Select, simulate and size.
    pub fn evaluate(
        &self,
        simulation: &SimulationConfig,
        kelly: &KellyOptimizer,
    ) -> Result<SizingReport, PositionError> {
        if self.vols.is_empty() {
            return Err(PositionError::EmptyVolSample);
        }

        let (valuation, condor) = self.priced_condor()?;

        let pnl = self.simulated_pnl(&condor, simulation)?;
        let estimate = kelly.optimize(&pnl)?;
        let outcomes = OutcomeSummary::from_outcomes(&pnl).ok_or(PositionError::EmptyVolSample)?;

        let underlying_price = self.chain.underlying_price().map(to_f64).unwrap_or(f64::NAN);
        let summary = condor.summary();

        info!(
            "Condor {}/{}/{}/{}: premium {} max loss {}, kelly {:.4} (p_win {:.3})",
            summary.hedge_put_strike,
            summary.short_put_strike,
            summary.short_call_strike,
            summary.hedge_call_strike,
            summary.premium,
            summary.max_loss,
            estimate.fraction,
            outcomes.win_probability
        );

        Ok(SizingReport {
            underlying_price,
            atm_vol: valuation.atm_vol,
            condor: summary,
            kelly: estimate,
            closed_form_kelly: outcomes.closed_form_fraction(),
            outcomes,
            vol_mean: self.vols.mean(),
            vol_std: if self.vols.len() > 1 {
                self.vols.std_dev()
            } else {
                0.0
            },
            paths: pnl.len(),
        })
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OptionContract, OptionType};
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    const SPOT: Decimal = dec!(4100);

    /// Chain priced off a single vol, with extra premium on one put.
    fn chain(rich_put: Decimal) -> OptionsChain {
        let pricer = BlackScholes::new(0.0);
        let time = 5.0 / 252.0;
        let vol = 0.18;

        let mut contracts = Vec::new();
        let mut strike = dec!(3950);
        while strike <= dec!(4250) {
            for right in [OptionType::Put, OptionType::Call] {
                let k = to_f64(strike);
                let fair = pricer.price(right, 4100.0, k, time, vol);
                let bump = if right == OptionType::Put && strike == rich_put {
                    0.5
                } else {
                    0.0
                };
                let mid = Decimal::from_f64_retain(fair + bump)
                    .unwrap_or_default()
                    .round_dp(2);
                let d1 = ((4100.0 / k).ln() + 0.5 * vol * vol * time) / (vol * time.sqrt());
                let n_d1 = 0.5 * statrs::function::erf::erfc(-d1 / std::f64::consts::SQRT_2);
                let delta = match right {
                    OptionType::Call => n_d1,
                    OptionType::Put => n_d1 - 1.0,
                };
                contracts.push(OptionContract {
                    right,
                    strike,
                    bid: mid - dec!(0.05),
                    ask: mid + dec!(0.05),
                    delta,
                    implied_vol: vol,
                    underlying_price: SPOT,
                });
            }
            strike += dec!(10);
        }
        OptionsChain::new(contracts)
    }

    #[test]
    fn test_valuation_uses_atm_vol() {
        let chain = chain(dec!(4050));
        let position = OptionPosition::new(&chain, &[0.2], 5.0, 0.0, CondorConfig::default());

        let valuation = position.valuation().unwrap();
        assert_eq!(chain.contracts[valuation.atm_index].strike, SPOT);
        assert_relative_eq!(valuation.atm_vol, 0.18);
        assert_eq!(valuation.contracts.len(), chain.len());

        // Fairly priced contracts carry only rounding noise
        let rich = chain
            .contracts
            .iter()
            .position(|c| c.is_put() && c.strike == dec!(4050))
            .unwrap();
        assert_relative_eq!(valuation.contracts[rich].skew_premium, 0.5, epsilon = 0.01);
        assert!(valuation.contracts[0].skew_premium.abs() < 0.01);
    }

    #[test]
    fn test_condor_sells_richest_put() {
        let chain = chain(dec!(4050));
        let position = OptionPosition::new(&chain, &[0.2], 5.0, 0.0, CondorConfig::default());

        let condor = position.condor().unwrap();
        assert_eq!(condor.legs().short_put.strike, dec!(4050));
        assert_eq!(condor.legs().hedge_put.strike, dec!(4040));
        assert_eq!(
            condor.legs().hedge_call.strike,
            condor.legs().short_call.strike + dec!(10)
        );
        assert!(condor.premium() > Decimal::ZERO);
    }

    #[test]
    fn test_evaluate_report() {
        let chain = chain(dec!(4050));
        let vols: Vec<f64> = (0..2000).map(|i| 0.10 + 0.10 * (i % 10) as f64 / 10.0).collect();
        let position = OptionPosition::new(&chain, &vols, 5.0, 0.0, CondorConfig::default());

        let report = position
            .evaluate(&SimulationConfig::default(), &KellyOptimizer::default())
            .unwrap();

        assert_eq!(report.paths, 2000);
        assert!(report.kelly.fraction >= report.kelly.lower_bound);
        assert!(report.kelly.fraction <= report.kelly.upper_bound);
        assert!(report.outcomes.win_probability > 0.0 && report.outcomes.win_probability <= 1.0);
        assert_relative_eq!(report.vol_mean, 0.145, epsilon = 1e-9);
        assert_relative_eq!(report.underlying_price, 4100.0);

        // Normalized outcomes stay within the condor's payoff range
        let premium = report.condor.premium.to_f64().unwrap() / PNL_NORMALIZER;
        let floor = -report.condor.max_loss.to_f64().unwrap() / PNL_NORMALIZER;
        let pnl = position
            .simulated_pnl(&position.condor().unwrap(), &SimulationConfig::default())
            .unwrap();
        assert!(pnl.iter().all(|x| *x <= premium + 1e-9 && *x >= floor - 1e-9));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let chain = chain(dec!(4050));
        let position = OptionPosition::new(&chain, &[0.2], 5.0, 0.0, CondorConfig::default());

        let first = position.condor().unwrap();
        let second = position.condor().unwrap();
        let (a, b) = (first.legs(), second.legs());

        assert!(std::ptr::eq(a.short_put, b.short_put));
        assert!(std::ptr::eq(a.hedge_put, b.hedge_put));
        assert!(std::ptr::eq(a.short_call, b.short_call));
        assert!(std::ptr::eq(a.hedge_call, b.hedge_call));
        assert_eq!(
            [a.hedge_put.strike, a.short_put.strike, a.short_call.strike, a.hedge_call.strike],
            [b.hedge_put.strike, b.short_put.strike, b.short_call.strike, b.hedge_call.strike]
        );
        assert_eq!(first.premium(), second.premium());
    }

    #[test]
    fn test_single_vol_report_has_zero_spread() {
        let chain = chain(dec!(4050));
        let position = OptionPosition::new(&chain, &[0.2], 5.0, 0.0, CondorConfig::default());

        let report = position
            .evaluate(&SimulationConfig::default(), &KellyOptimizer::default())
            .unwrap();
        assert_eq!(report.paths, 1);
        assert_eq!(report.vol_std, 0.0);
        assert_relative_eq!(report.vol_mean, 0.2);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"vol_std\":0.0"));
    }

    #[test]
    fn test_empty_vol_sample() {
        let chain = chain(dec!(4050));
        let position = OptionPosition::new(&chain, &[], 5.0, 0.0, CondorConfig::default());
        let err = position
            .evaluate(&SimulationConfig::default(), &KellyOptimizer::default())
            .unwrap_err();
        assert_eq!(err, PositionError::EmptyVolSample);
    }

    #[test]
    fn test_zero_dte_is_numeric_error() {
        let chain = chain(dec!(4050));
        let position = OptionPosition::new(&chain, &[0.2], 0.0, 0.0, CondorConfig::default());
        assert!(matches!(
            position.valuation(),
            Err(PositionError::Numeric(_))
        ));
    }

    #[test]
    fn test_empty_chain_is_selection_error() {
        let chain = OptionsChain::default();
        let position = OptionPosition::new(&chain, &[0.2], 5.0, 0.0, CondorConfig::default());
        assert_eq!(
            position.valuation().unwrap_err(),
            PositionError::Selection(SelectionError::EmptyChain)
        );
    }

    #[test]
    fn test_missing_hedge_surfaces() {
        let chain = chain(dec!(3950));
        let position = OptionPosition::new(&chain, &[0.2], 5.0, 0.0, CondorConfig::default());
        assert!(matches!(
            position.condor(),
            Err(PositionError::Selection(SelectionError::MissingHedge { .. }))
        ));
    }
}
