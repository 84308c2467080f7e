//! Command-line interface for the rotation backtester.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::analytics::ResultFormatter;
use crate::config::RotationFileConfig;
use crate::data::{load_asset_csv, load_universe, DataConfig};
use crate::engine::RotationEngine;
use crate::error::{KestrelError, Result};
use crate::export;
use crate::signal::LogisticModel;

/// Kestrel - a cross-sectional rotation backtester for ML trading signals.
#[derive(Parser)]
#[command(name = "kestrel")]
#[command(author = "Johan")]
#[command(version = "0.1.0")]
#[command(about = "A cross-sectional rotation backtester for ML trading signals")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline from a configuration file
    Run {
        /// Path to the TOML configuration file
        #[arg(short, long, default_value = "kestrel.toml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init {
        /// Output path for the config file
        #[arg(short, long, default_value = "kestrel.toml")]
        output: PathBuf,
    },

    /// Validate an asset data file
    Validate {
        /// Path to the CSV data file
        #[arg(short, long)]
        data: PathBuf,

        /// Symbol to report the file as
        #[arg(short, long, default_value = "SYMBOL")]
        symbol: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match &cli.command {
        Commands::Run { config } => run_pipeline(config, cli.output),
        Commands::Init { output } => init_config(output),
        Commands::Validate { data, symbol } => validate_data(data, symbol),
    }
}

fn run_pipeline(config_path: &Path, output: OutputFormat) -> Result<()> {
    let file_config = RotationFileConfig::load(config_path)?;
    if file_config.data.tickers.is_empty() {
        return Err(KestrelError::Config(
            "no tickers configured under [data]".to_string(),
        ));
    }

    let data_config = file_config.to_data_config();
    let universe = load_universe(
        Path::new(&file_config.data.dir),
        &file_config.data.tickers,
        &data_config,
    )?;

    let model = LogisticModel::load(&file_config.model.path)?;

    let mut engine = RotationEngine::new(file_config.to_rotation_config());
    for series in universe.into_values() {
        engine.add_series(series);
    }

    let result = engine.run(&model)?;
    export::write_all(Path::new(&file_config.backtest.results_dir), &result)?;

    match output {
        OutputFormat::Text => println!("{}", ResultFormatter::summary(&result)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

fn init_config(output: &Path) -> Result<()> {
    if output.exists() {
        return Err(KestrelError::Config(format!(
            "{} already exists; refusing to overwrite",
            output.display()
        )));
    }
    fs::write(output, RotationFileConfig::example())?;
    println!("Wrote example configuration to {}", output.display());
    Ok(())
}

fn validate_data(path: &Path, symbol: &str) -> Result<()> {
    let series = load_asset_csv(path, symbol, &DataConfig::default())?;

    let labeled = series
        .records()
        .iter()
        .filter(|r| r.forward_return.is_some())
        .count();
    let mut features: Vec<&str> = series
        .records()
        .iter()
        .flat_map(|r| r.features.keys().map(String::as_str))
        .collect();
    features.sort_unstable();
    features.dedup();

    info!("Validated {}", path.display());
    println!("File:      {}", path.display());
    println!("Symbol:    {}", series.symbol);
    println!("Records:   {}", series.len());
    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        println!("Dates:     {} to {}", first, last);
    }
    println!("Features:  {}", features.join(", "));
    println!("Labeled:   {} of {}", labeled, series.len());
    Ok(())
}
