pub mod features;
pub mod loader;
pub mod series;
pub mod types;

pub use loader::{DataLoader, LoaderError, CHAIN_COLUMNS};
pub use series::{SeriesError, SeriesView, TimeSeries};
pub use types::{OptionContract, OptionType, OptionsChain};
