//! Entry point. Wires Loader -> Analyzer / Pre-open filter -> Report.

mod analyzer;
mod config;
mod loader;
mod parser;
mod preopen;
mod report;
mod table;
mod types;
mod utils;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use serde::Serialize;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ConfigError};
use crate::report::{OutputFormat, Report, DEFAULT_EXPORT};
use crate::types::{PriceAggregation, RollConvention};

const DEFAULT_PREOPEN_EXPORT: &str = "filtered_preopen.csv";

#[derive(Parser, Debug)]
#[command(
    name = "fno-futures-analyzer",
    version,
    about = "F&O bhavcopy stock-futures roll analyzer and pre-open filter"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare Current vs Next month futures prices per stock (.zip or .csv bhavcopy)
    Roll(RollArgs),
    /// Filter a pre-open market snapshot by % change bands
    #[command(name = "preopen")]
    PreOpen(PreOpenArgs),
}

#[derive(Args, Debug)]
struct RollArgs {
    /// F&O bhavcopy: .csv, or .zip containing an fo*.csv member
    input: PathBuf,

    /// YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum difference (₹); negative selects Next below Current
    #[arg(long, allow_negative_numbers = true)]
    min_diff: Option<f64>,

    /// Only this underlying (case-insensitive), e.g. INFY
    #[arg(long)]
    stock: Option<String>,

    #[arg(long, value_enum)]
    aggregation: Option<PriceAggregation>,

    #[arg(long, value_enum)]
    convention: Option<RollConvention>,

    /// Export results as CSV (default file: filtered_futures.csv)
    #[arg(short = 'o', long, num_args = 0..=1, default_missing_value = DEFAULT_EXPORT)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct PreOpenArgs {
    /// Pre-open snapshot CSV
    input: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    lower_positive: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    upper_positive: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    lower_negative: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    upper_negative: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    min_prev_close: Option<f64>,

    /// Export results as CSV (default file: filtered_preopen.csv)
    #[arg(short = 'o', long, num_args = 0..=1, default_missing_value = DEFAULT_PREOPEN_EXPORT)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl RollArgs {
    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(v) = self.min_diff {
            cfg.roll.min_diff = Some(v);
        }
        if let Some(s) = &self.stock {
            cfg.roll.selected_stock = Some(s.clone());
        }
        if let Some(a) = self.aggregation {
            cfg.roll.price_aggregation = a;
        }
        if let Some(c) = self.convention {
            cfg.roll.convention = c;
        }
    }
}

impl PreOpenArgs {
    fn apply(&self, cfg: &mut AppConfig) {
        let p = &mut cfg.preopen;
        for (slot, v) in [
            (&mut p.lower_positive, self.lower_positive),
            (&mut p.upper_positive, self.upper_positive),
            (&mut p.lower_negative, self.lower_negative),
            (&mut p.upper_negative, self.upper_negative),
            (&mut p.min_prev_close, self.min_prev_close),
        ] {
            if let Some(v) = v {
                *slot = v;
            }
        }
    }
}

fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let res = match cli.command {
        Command::Roll(args) => run_roll(args),
        Command::PreOpen(args) => run_preopen(args),
    };
    match res {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<ConfigError>() {
                Some(ce) => error!("Invalid configuration: {}", ce),
                None => error!("Unexpected error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run_roll(args: RollArgs) -> anyhow::Result<ExitCode> {
    let mut cfg = load_config(args.config.as_deref())?;
    args.apply(&mut cfg);
    cfg.validate()?;
    let params = cfg.roll.params();

    let Some(table) = loader::load_source(&args.input, &cfg.archive)? else {
        error!("Could not find a valid CSV inside the ZIP file.");
        return Ok(ExitCode::FAILURE);
    };
    info!("File loaded successfully.");
    if table.is_empty() {
        warn!("Loaded file has a header row but no data rows");
    }
    info!(
        "Roll params: min_diff={}, stock={:?}, aggregation={:?}, convention={:?}",
        params.min_diff, params.selected_stock, params.aggregation, params.convention
    );

    let outcome = analyzer::analyze(&table, &cfg.columns, &params);
    if let Some(msg) = &outcome.message {
        warn!("{}", msg);
        return Ok(ExitCode::SUCCESS);
    }
    if outcome.rows.is_empty() {
        info!("No matching data found with the given criteria.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = report::roll_report(&outcome.rows, params.convention);
    emit(
        &report,
        &outcome.rows,
        &report::roll_headline(&params),
        args.format,
    )?;
    if let Some(path) = &args.output {
        export(&report, path)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn run_preopen(args: PreOpenArgs) -> anyhow::Result<ExitCode> {
    let mut cfg = load_config(args.config.as_deref())?;
    args.apply(&mut cfg);
    cfg.validate()?;

    let mut table = loader::load_csv(&args.input)?;
    preopen::normalize_columns(&mut table);

    let outcome = preopen::filter(&table, &cfg.preopen);
    if let Some(msg) = &outcome.message {
        warn!("{}", msg);
        return Ok(ExitCode::SUCCESS);
    }
    if outcome.rows.is_empty() {
        info!("No symbols matched the pre-open filters.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = report::preopen_report(&outcome.rows);
    emit(&report, &outcome.rows, "Filtered Stocks", args.format)?;
    if let Some(path) = &args.output {
        export(&report, path)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let (cfg, used) = AppConfig::resolve(explicit)?;
    match used {
        Some(p) => info!("Using config {}", p.display()),
        None => debug!("No config file found, using defaults"),
    }
    Ok(cfg)
}

fn emit<T: Serialize>(
    report: &Report,
    rows: &T,
    headline: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Table => {
            writeln!(out, "{headline}\n")?;
            out.write_all(report.render_text().as_bytes())?;
        }
        OutputFormat::Csv => report.write_csv(&mut out)?,
        OutputFormat::Json => report::write_json(&mut out, rows)?,
    }
    Ok(())
}

fn export(report: &Report, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    report.write_csv(file)?;
    info!("Exported {} rows to {}", report.records.len(), path.display());
    Ok(())
}
