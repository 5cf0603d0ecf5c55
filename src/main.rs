//! Dimorphic: anthropometric scoring from the command line.
//!
//! Usage:
//!   dimorphic predict measurements.json             # Explanation text
//!   dimorphic predict - --json < measurements.json  # JSON result
//!   dimorphic calibration -o calibration.json       # Dump active table
//!   dimorphic bust measurements.json                # Bust range estimate

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dimorphic::adapters::json::JsonCalibrationFile;
use dimorphic::adapters::sanitize::SanitizingMakeWriter;
use dimorphic::config::{LogMode, Settings};
use dimorphic::domain::estimate_bust_circumference_range;
use dimorphic::{parse_measurements, Measurements, ScoringEngine};

#[derive(Parser, Debug)]
#[command(name = "dimorphic")]
#[command(author, version, about = "Weighted multi-indicator anthropometric scoring", long_about = None)]
struct Cli {
    /// Calibration JSON file (overrides DIMORPHIC_CALIBRATION)
    #[arg(long, global = true)]
    calibration: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict from a JSON object of measurements in centimeters
    Predict {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Output the full result as JSON
        #[arg(short, long)]
        json: bool,

        /// Label calls below this confidence as `uncertain`
        /// (overrides DIMORPHIC_UNCERTAINTY_CUTOFF)
        #[arg(long)]
        uncertain_below: Option<f64>,
    },

    /// Write the active calibration table as JSON
    Calibration {
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Estimate a bust circumference range
    Bust {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
}

fn init_logging(settings: &Settings) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // stdout carries results, so logs go to stderr or a file.
    let (writer, guard) = match settings.log_mode {
        LogMode::File => tracing_appender::non_blocking(open_log_file(&settings.log_file)?),
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading measurements from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn load_measurements(path: &Path) -> Result<Measurements> {
    let text = read_input(path)?;
    let measurements = parse_measurements(&text)?;
    if measurements.is_empty() {
        tracing::warn!("Input contains no recognized measurements");
    }
    Ok(measurements)
}

/// A named calibration file must exist; only an unnamed one falls back to
/// the reference table.
fn build_engine(calibration: Option<&Path>) -> Result<ScoringEngine> {
    match calibration {
        Some(path) => {
            let store = JsonCalibrationFile::new(path);
            ScoringEngine::from_store_strict(&store)
                .with_context(|| format!("loading calibration from {}", path.display()))
        }
        None => Ok(ScoringEngine::with_reference()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env_or_default();
    let _guard = init_logging(&settings)?;

    for entry in &settings.rejected {
        tracing::warn!("Ignoring invalid setting {entry}");
    }

    let calibration_path = cli.calibration.as_deref().or(settings.calibration_path.as_deref());
    let engine = build_engine(calibration_path)?;

    match cli.command {
        Command::Predict {
            input,
            json,
            uncertain_below,
        } => {
            let measurements = load_measurements(&input)?;
            let mut result = engine.predict_sex(&measurements);

            if let Some(policy) = settings.uncertainty_policy(uncertain_below) {
                result = policy.apply(&result);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", engine.explain(&result));
            }
        }
        Command::Calibration { out } => {
            let calibration = engine.calibration();
            match out {
                Some(path) => {
                    engine
                        .save_to(&JsonCalibrationFile::new(&path))
                        .with_context(|| format!("writing {}", path.display()))?;
                }
                None => println!("{}", serde_json::to_string_pretty(&*calibration)?),
            }
            eprintln!("sha256 {}", calibration.fingerprint());
        }
        Command::Bust { input } => {
            let measurements = load_measurements(&input)?;
            match estimate_bust_circumference_range(&measurements) {
                Some(range) => println!("{:.1}-{:.1} cm", range.min_cm, range.max_cm),
                None => println!(
                    "Insufficient data: need shoulder_breadth plus waist_circumference or standing_height"
                ),
            }
        }
    }

    Ok(())
}
