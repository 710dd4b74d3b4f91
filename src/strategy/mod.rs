//! Short Iron Condor strategy.
//!
//! Leg selection from a priced options chain, the condor's payoff at
//! expiration, and Kelly sizing against a volatility sample.

pub mod iron_condor;
pub mod position;
pub mod selection;

pub use iron_condor::{CondorConfig, CondorSummary, ShortIronCondor};
pub use position::{ChainValuation, ContractValuation, OptionPosition, PositionError, SizingReport};
pub use selection::{select_legs, CondorLegs, SelectionError};
