//! Short Iron Condor payoff.
//!
//! Sell an out-of-the-money put and call, buy one further out on each side.
//! Premium is the net mid credit after a slippage haircut; the position loses
//! at most the put-side width less that premium.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::selection::CondorLegs;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CondorConfig {
    /// Strike distance between each short leg and its hedge.
    pub hedge_width: Decimal,
    /// Fraction of the mid credit lost to fills.
    pub slippage_haircut: Decimal,
    /// Days per year for time to expiration.
    pub days_per_year: f64,
}

impl Default for CondorConfig {
    fn default() -> Self {
        Self {
            hedge_width: dec!(10),
            slippage_haircut: dec!(0.15),
            days_per_year: 252.0,
        }
    }
}

/// Short Iron Condor built from selected legs.
#[derive(Debug, Clone)]
pub struct ShortIronCondor<'a> {
    legs: CondorLegs<'a>,
    premium: Decimal,
    max_loss: Decimal,
    // f64 copies for the payoff hot path
    put_strike: f64,
    call_strike: f64,
    premium_f64: f64,
    max_loss_f64: f64,
}

impl<'a> ShortIronCondor<'a> {
    pub fn new(legs: CondorLegs<'a>, slippage_haircut: Decimal) -> Self {
        let credit = legs.short_put.mid() + legs.short_call.mid()
            - legs.hedge_put.mid()
            - legs.hedge_call.mid();
        let premium = credit * (Decimal::ONE - slippage_haircut);
        let max_loss = legs.short_put.strike - legs.hedge_put.strike - premium;

        Self {
            legs,
            premium,
            max_loss,
            put_strike: to_f64(legs.short_put.strike),
            call_strike: to_f64(legs.short_call.strike),
            premium_f64: to_f64(premium),
            max_loss_f64: to_f64(max_loss),
        }
    }

    pub fn legs(&self) -> &CondorLegs<'a> {
        &self.legs
    }

    /// Net credit per share after the haircut.
    pub fn premium(&self) -> Decimal {
        self.premium
    }

    /// Worst-case loss per share.
    pub fn max_loss(&self) -> Decimal {
        self.max_loss
    }

    /// Profit and loss per share at expiration.
    pub fn pnl(&self, price: f64) -> f64 {
        if price <= self.put_strike {
            ((price - self.put_strike) + self.premium_f64).max(-self.max_loss_f64)
        } else if price >= self.call_strike {
            ((self.call_strike - price) + self.premium_f64).max(-self.max_loss_f64)
        } else {
            self.premium_f64
        }
    }

    pub fn summary(&self) -> CondorSummary {
        CondorSummary {
            hedge_put_strike: self.legs.hedge_put.strike,
            short_put_strike: self.legs.short_put.strike,
            short_call_strike: self.legs.short_call.strike,
            hedge_call_strike: self.legs.hedge_call.strike,
            premium: self.premium,
            max_loss: self.max_loss,
        }
    }
}

/// Serializable description of a condor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondorSummary {
    pub hedge_put_strike: Decimal,
    pub short_put_strike: Decimal,
    pub short_call_strike: Decimal,
    pub hedge_call_strike: Decimal,
    pub premium: Decimal,
    pub max_loss: Decimal,
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
