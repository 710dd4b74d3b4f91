//! volcondor CLI
//!
//! # Usage
//!
//! ```bash
//! # Walk-forward a volatility model over daily returns
//! volcondor walk-forward --returns spx_returns.parquet --model sv
//!
//! # Score against realized variance from intraday bars and keep the forecasts
//! volcondor walk-forward --returns spx_returns.parquet --model ewma \
//!     --intraday spx_5min.parquet --output forecasts.json
//!
//! # Forecast realized variance directly from its own lags
//! volcondor walk-forward --returns spx_returns.parquet --model lagged-rv \
//!     --intraday spx_5min.parquet
//!
//! # Size a short iron condor from a chain snapshot
//! volcondor size --chain spx_chain.parquet --dte 5 --rate 0.045 --returns spx_returns.parquet
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use volcondor::data::features::{log_returns, realized_variance};
use volcondor::models::{
    EwmaVolatility, LaggedRvRegression, StochasticVolatility, VarianceForecast,
};
use volcondor::risk::KellyOptimizer;
use volcondor::strategy::OptionPosition;
use volcondor::walkforward::{ForecastModel, WalkForwardTester};
use volcondor::{DataLoader, ForecastAccuracy, ResearchConfig, TimeSeries};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "volcondor")]
#[command(about = "Walk-forward volatility forecasting and iron condor sizing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelKind {
    /// Stochastic volatility sampler
    Sv,
    /// EWMA (RiskMetrics) variance
    Ewma,
    /// Lagged log realized-variance regression (requires --intraday)
    LaggedRv,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk-forward a volatility model and report forecast accuracy
    WalkForward {
        /// Parquet file with the daily series
        #[arg(long)]
        returns: PathBuf,

        /// Date column
        #[arg(long, default_value = "date")]
        date_column: String,

        /// Value column
        #[arg(long, default_value = "returns")]
        value_column: String,

        /// Treat the value column as closing prices
        #[arg(long)]
        closes: bool,

        /// Model to evaluate
        #[arg(long, value_enum, default_value = "sv")]
        model: ModelKind,

        /// Out-of-sample block length (overrides config)
        #[arg(long)]
        oos: Option<usize>,

        /// Warmup length (overrides config)
        #[arg(long)]
        warmup: Option<usize>,

        /// Intraday bars to score against realized variance
        #[arg(long)]
        intraday: Option<PathBuf>,

        /// Intraday timestamp column
        #[arg(long, default_value = "timestamp")]
        timestamp_column: String,

        /// Intraday price column
        #[arg(long, default_value = "close")]
        price_column: String,

        /// Write point variance forecasts as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Select and Kelly-size a short iron condor
    Size {
        /// Parquet options chain snapshot
        #[arg(long)]
        chain: PathBuf,

        /// Days to expiration
        #[arg(long)]
        dte: f64,

        /// Annualized risk-free rate
        #[arg(long, default_value_t = 0.0)]
        rate: f64,

        /// Daily returns to fit the volatility sampler on
        #[arg(long)]
        returns: Option<PathBuf>,

        /// Date column of the returns file
        #[arg(long, default_value = "date")]
        date_column: String,

        /// Value column of the returns file
        #[arg(long, default_value = "returns")]
        value_column: String,

        /// Annualized volatility sample, comma-separated (instead of --returns)
        #[arg(long, value_delimiter = ',')]
        vols: Vec<f64>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("volcondor=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ResearchConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ResearchConfig::default(),
    };
    let loader = DataLoader::new(&cli.data_dir);

    match cli.command {
        Commands::WalkForward {
            returns,
            date_column,
            value_column,
            closes,
            model,
            oos,
            warmup,
            intraday,
            timestamp_column,
            price_column,
            output,
        } => {
            let mut series = loader
                .load_series(&returns, &date_column, &value_column)
                .with_context(|| format!("Failed to load {}", returns.display()))?;
            if closes {
                series = log_returns(&series)?;
            }

            let realized = match intraday {
                Some(path) => {
                    let bars = loader
                        .load_intraday(&path, &timestamp_column, &price_column)
                        .with_context(|| format!("Failed to load {}", path.display()))?;
                    Some(realized_variance(&bars)?)
                }
                None => None,
            };

            let mut wf = config.walk_forward.clone();
            if let Some(oos) = oos {
                wf.oos_periods = oos;
            }
            if let Some(warmup) = warmup {
                wf.warmup = warmup;
            }

            println!("{}", SEPARATOR);
            println!(
                "Walk-forward: {} observations, warmup {}, oos {}",
                series.len(),
                wf.warmup,
                wf.oos_periods
            );
            println!("{}", SEPARATOR);

            let forecasts = match model {
                ModelKind::Sv => {
                    let model = StochasticVolatility::new(config.stochastic_vol.clone());
                    run_walk_forward(&series, model, wf.oos_periods, wf.warmup, realized.as_ref())?
                }
                ModelKind::Ewma => {
                    let model = EwmaVolatility::new(config.ewma.clone());
                    run_walk_forward(&series, model, wf.oos_periods, wf.warmup, realized.as_ref())?
                }
                ModelKind::LaggedRv => {
                    let Some(rv) = realized.as_ref() else {
                        bail!("--model lagged-rv needs --intraday bars");
                    };
                    let model = LaggedRvRegression::new(config.lagged_rv.clone());
                    run_walk_forward(rv, model, wf.oos_periods, wf.warmup, Some(rv))?
                }
            };

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&forecasts)?;
                fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote forecasts to {}", path.display());
            }
        }

        Commands::Size {
            chain,
            dte,
            rate,
            returns,
            date_column,
            value_column,
            vols,
            output,
        } => {
            let chain = loader
                .load_chain(&chain)
                .with_context(|| format!("Failed to load chain {}", chain.display()))?;

            let vols = match (returns, vols.is_empty()) {
                (Some(path), _) => {
                    let series = loader
                        .load_series(&path, &date_column, &value_column)
                        .with_context(|| format!("Failed to load {}", path.display()))?;
                    sample_volatilities(&series, &config)?
                }
                (None, false) => vols,
                (None, true) => bail!("Either --returns or --vols is required"),
            };

            info!(
                "Sizing against {} contracts with {} volatility draws",
                chain.len(),
                vols.len()
            );

            let position = OptionPosition::new(&chain, &vols, dte, rate, config.condor.clone());
            let kelly = KellyOptimizer::new(config.kelly.clone());
            let report = position.evaluate(&config.simulation, &kelly)?;

            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

/// Run the tester and print accuracy; returns point variance forecasts.
fn run_walk_forward<M>(
    series: &TimeSeries<NaiveDate, f64>,
    model: M,
    oos_periods: usize,
    warmup: usize,
    realized: Option<&TimeSeries<NaiveDate, f64>>,
) -> Result<volcondor::ForecastMap<NaiveDate, f64>>
where
    M: ForecastModel<NaiveDate, f64>,
    M::Forecast: VarianceForecast,
{
    let mut tester = WalkForwardTester::new(series, model, oos_periods, warmup)?;
    let forecasts = tester.walk_forward()?;

    let accuracy = match realized {
        Some(rv) => ForecastAccuracy::evaluate(forecasts, rv),
        None => ForecastAccuracy::against_squared_returns(forecasts, series),
    };

    println!(
        "Forecasted {} of {} observations",
        forecasts.forecasted_count(),
        forecasts.len()
    );
    if let Some(first) = forecasts.first_forecasted_key() {
        println!("First forecast: {}", first);
    }
    println!("Accuracy: {}", accuracy.summary());

    Ok(forecasts.map(|f| f.variance()))
}

/// Fit the sampler on all returns and draw one step of annualized vols.
fn sample_volatilities(
    returns: &TimeSeries<NaiveDate, f64>,
    config: &ResearchConfig,
) -> Result<Vec<f64>> {
    let mut model = StochasticVolatility::new(config.stochastic_vol.clone());
    let params = *model.fit_returns(returns.values())?;
    info!(
        "Volatility sampler: long-run vol {:.4} (phi {:.3})",
        params.long_run_volatility(),
        params.phi
    );

    let draws = model
        .simulate(1)?
        .next()
        .context("Volatility sampler produced no draws")?;
    Ok(draws.annualized(config.simulation.trading_days_per_year))
}
