//! Option pricing primitives.

pub mod black_scholes;

pub use black_scholes::{BlackScholes, PricingError};
