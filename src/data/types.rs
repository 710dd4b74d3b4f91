//! Core data types for options evaluation.
//!
//! An [`OptionsChain`] is a single-expiration snapshot of contracts for one
//! underlying. Strikes and quotes are kept as `Decimal` so that strike
//! lookups by exact equality are reliable; Greeks and implied volatility
//! stay `f64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of an options chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Put or call.
    pub right: OptionType,

    /// Strike price.
    pub strike: Decimal,

    /// Bid price.
    pub bid: Decimal,

    /// Ask price.
    pub ask: Decimal,

    /// Delta as quoted by the data vendor.
    pub delta: f64,

    /// Implied volatility (annualized).
    pub implied_vol: f64,

    /// Underlying price at quote time.
    pub underlying_price: Decimal,
}

impl OptionContract {
    /// Mid price, the average of bid and ask.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    pub fn is_put(&self) -> bool {
        self.right == OptionType::Put
    }

    pub fn is_call(&self) -> bool {
        self.right == OptionType::Call
    }
}

/// All contracts for one expiration on one trading day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsChain {
    /// Contracts in vendor order.
    pub contracts: Vec<OptionContract>,
}

impl OptionsChain {
    pub fn new(contracts: Vec<OptionContract>) -> Self {
        Self { contracts }
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Underlying price, read from the first row.
    pub fn underlying_price(&self) -> Option<Decimal> {
        self.contracts.first().map(|c| c.underlying_price)
    }

    pub fn puts(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(|c| c.is_put())
    }

    pub fn calls(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(|c| c.is_call())
    }

    /// Find the contract of the given right at exactly `strike`.
    pub fn contract_at(&self, right: OptionType, strike: Decimal) -> Option<&OptionContract> {
        self.contracts
            .iter()
            .find(|c| c.right == right && c.strike == strike)
    }

    /// Index of the contract whose strike is closest to the underlying price.
    ///
    /// Ties resolve to the first row in chain order.
    pub fn atm_index(&self) -> Option<usize> {
        let underlying = self.underlying_price()?;
        let mut best: Option<(usize, Decimal)> = None;

        for (idx, contract) in self.contracts.iter().enumerate() {
            let distance = (contract.strike - underlying).abs();
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((idx, distance)),
            }
        }

        best.map(|(idx, _)| idx)
    }

    /// All strikes in the chain, sorted and deduplicated.
    pub fn strikes(&self) -> Vec<Decimal> {
        let mut strikes: Vec<_> = self.contracts.iter().map(|c| c.strike).collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract(right: OptionType, strike: Decimal) -> OptionContract {
        OptionContract {
            right,
            strike,
            bid: dec!(1.00),
            ask: dec!(1.20),
            delta: 0.0,
            implied_vol: 0.2,
            underlying_price: dec!(4106.62),
        }
    }

    #[test]
    fn test_option_type_parsing() {
        assert_eq!(OptionType::from_str("C"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("P"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("call"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("PUT"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("X"), None);
    }

    #[test]
    fn test_mid_price() {
        assert_eq!(contract(OptionType::Put, dec!(4100)).mid(), dec!(1.10));
    }

    #[test]
    fn test_exact_strike_lookup() {
        let chain = OptionsChain::new(vec![
            contract(OptionType::Put, dec!(4090)),
            contract(OptionType::Put, dec!(4100)),
            contract(OptionType::Call, dec!(4100)),
        ]);

        let found = chain.contract_at(OptionType::Call, dec!(4100)).unwrap();
        assert!(found.is_call());
        assert!(chain.contract_at(OptionType::Call, dec!(4090)).is_none());
        assert!(chain.contract_at(OptionType::Put, dec!(4095)).is_none());
    }

    #[test]
    fn test_atm_index_prefers_first_on_tie() {
        let chain = OptionsChain::new(vec![
            contract(OptionType::Put, dec!(4090)),
            contract(OptionType::Put, dec!(4105)),
            contract(OptionType::Call, dec!(4105)),
            contract(OptionType::Call, dec!(4120)),
        ]);
        assert_eq!(chain.atm_index(), Some(1));
        assert_eq!(OptionsChain::default().atm_index(), None);
    }
}
