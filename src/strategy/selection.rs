//! Leg selection for a short Iron Condor.
//!
//! 1. Short put: the put with the largest skew premium
//! 2. Hedge put: the put exactly `hedge_width` below the short put
//! 3. Short call: the call whose delta best offsets the short put's delta
//! 4. Hedge call: the call exactly `hedge_width` above the short call
//!
//! Ties go to the first contract in chain order. Missing hedge strikes are
//! reported, never substituted with a nearby strike.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::data::{OptionContract, OptionType, OptionsChain};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Options chain is empty")]
    EmptyChain,

    #[error("No {0} contracts in chain")]
    NoContracts(OptionType),

    #[error("No {right} contract at hedge strike {strike}")]
    MissingHedge { right: OptionType, strike: Decimal },
}

/// The four contracts of a short Iron Condor, borrowed from the chain.
#[derive(Debug, Clone, Copy)]
pub struct CondorLegs<'a> {
    pub short_put: &'a OptionContract,
    pub short_call: &'a OptionContract,
    pub hedge_put: &'a OptionContract,
    pub hedge_call: &'a OptionContract,
}

/// Pick the condor legs.
///
/// `skew_premiums` runs parallel to `chain.contracts`.
pub fn select_legs<'a>(
    chain: &'a OptionsChain,
    skew_premiums: &[f64],
    hedge_width: Decimal,
) -> Result<CondorLegs<'a>, SelectionError> {
    if chain.is_empty() {
        return Err(SelectionError::EmptyChain);
    }

    let mut short_put: Option<(&OptionContract, f64)> = None;
    for (contract, &premium) in chain.contracts.iter().zip(skew_premiums) {
        if !contract.is_put() {
            continue;
        }
        match short_put {
            Some((_, best)) if premium <= best => {}
            _ if premium.is_nan() => {}
            _ => short_put = Some((contract, premium)),
        }
    }
    let (short_put, _) = short_put.ok_or(SelectionError::NoContracts(OptionType::Put))?;

    let hedge_put = find_hedge(chain, OptionType::Put, short_put.strike - hedge_width)?;

    let mut short_call: Option<(&OptionContract, f64)> = None;
    for contract in chain.calls() {
        let imbalance = (contract.delta + short_put.delta).abs();
        match short_call {
            Some((_, best)) if imbalance >= best => {}
            _ if imbalance.is_nan() => {}
            _ => short_call = Some((contract, imbalance)),
        }
    }
    let (short_call, _) = short_call.ok_or(SelectionError::NoContracts(OptionType::Call))?;

    let hedge_call = find_hedge(chain, OptionType::Call, short_call.strike + hedge_width)?;

    Ok(CondorLegs {
        short_put,
        short_call,
        hedge_put,
        hedge_call,
    })
}

fn find_hedge(
    chain: &OptionsChain,
    right: OptionType,
    strike: Decimal,
) -> Result<&OptionContract, SelectionError> {
    chain
        .contract_at(right, strike)
        .ok_or(SelectionError::MissingHedge { right, strike })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract(right: OptionType, strike: Decimal, delta: f64) -> OptionContract {
        OptionContract {
            right,
            strike,
            bid: dec!(1.00),
            ask: dec!(1.20),
            delta,
            implied_vol: 0.2,
            underlying_price: dec!(4100),
        }
    }

    fn chain() -> OptionsChain {
        OptionsChain::new(vec![
            contract(OptionType::Put, dec!(4060), -0.10),
            contract(OptionType::Put, dec!(4070), -0.15),
            contract(OptionType::Put, dec!(4080), -0.22),
            contract(OptionType::Call, dec!(4120), 0.30),
            contract(OptionType::Call, dec!(4130), 0.21),
            contract(OptionType::Call, dec!(4140), 0.12),
            contract(OptionType::Call, dec!(4150), 0.05),
        ])
    }

    #[test]
    fn test_selects_max_skew_put_and_delta_matched_call() {
        let chain = chain();
        let skew = [0.1, 0.3, 0.2, 0.9, 0.9, 0.9, 0.9];

        let legs = select_legs(&chain, &skew, dec!(10)).unwrap();
        assert_eq!(legs.short_put.strike, dec!(4070));
        assert_eq!(legs.hedge_put.strike, dec!(4060));
        // Delta imbalance against the 4070 put: 0.15, 0.06, 0.03, 0.10
        assert_eq!(legs.short_call.strike, dec!(4140));
        assert_eq!(legs.hedge_call.strike, dec!(4150));
        assert!(legs.hedge_put.is_put());
        assert!(legs.hedge_call.is_call());
    }

    #[test]
    fn test_missing_call_hedge() {
        let mut chain = chain();
        chain.contracts.pop();
        let skew = [0.1, 0.3, 0.2, 0.0, 0.0, 0.0];

        // Short call 4140 needs a 4150 hedge
        let err = select_legs(&chain, &skew, dec!(10)).unwrap_err();
        assert_eq!(
            err,
            SelectionError::MissingHedge {
                right: OptionType::Call,
                strike: dec!(4150)
            }
        );
    }

    #[test]
    fn test_missing_put_hedge() {
        let chain = chain();
        // Short put at 4060 has nothing below it
        let skew = [0.5, 0.3, 0.2, 0.0, 0.0, 0.0, 0.0];
        let err = select_legs(&chain, &skew, dec!(10)).unwrap_err();
        assert_eq!(
            err,
            SelectionError::MissingHedge {
                right: OptionType::Put,
                strike: dec!(4050)
            }
        );
    }

    #[test]
    fn test_ties_resolve_to_first() {
        let chain = OptionsChain::new(vec![
            contract(OptionType::Put, dec!(4070), -0.20),
            contract(OptionType::Put, dec!(4080), -0.20),
            contract(OptionType::Put, dec!(4090), -0.20),
            contract(OptionType::Call, dec!(4110), 0.20),
            contract(OptionType::Call, dec!(4120), 0.20),
            contract(OptionType::Call, dec!(4130), 0.20),
        ]);
        let skew = [0.0, 0.4, 0.4, 0.0, 0.0, 0.0];

        let legs = select_legs(&chain, &skew, dec!(10)).unwrap();
        assert_eq!(legs.short_put.strike, dec!(4080));
        assert_eq!(legs.short_call.strike, dec!(4110));
        assert_eq!(legs.hedge_call.strike, dec!(4120));
    }

    #[test]
    fn test_data_availability_errors() {
        let empty = OptionsChain::default();
        assert_eq!(
            select_legs(&empty, &[], dec!(10)).unwrap_err(),
            SelectionError::EmptyChain
        );

        let calls_only = OptionsChain::new(vec![contract(OptionType::Call, dec!(4120), 0.3)]);
        assert_eq!(
            select_legs(&calls_only, &[0.0], dec!(10)).unwrap_err(),
            SelectionError::NoContracts(OptionType::Put)
        );
    }
}
