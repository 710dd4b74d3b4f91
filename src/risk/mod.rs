//! Risk and sizing module.
//!
//! Provides:
//! - Terminal price simulation from a volatility sample
//! - Kelly criterion sizing over simulated outcomes

pub mod kelly;
pub mod simulation;

pub use kelly::{KellyConfig, KellyError, KellyEstimate, KellyOptimizer, OutcomeSummary};
pub use simulation::{PriceSimulator, SimulationConfig};
