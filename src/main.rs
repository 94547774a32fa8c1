//! CLI entry point for digi-daq.
//!
//! Reads a digitizer configuration file, programs every digitizer in it,
//! reads the settings back and writes the confirmed state to the output file.
//!
//! # Usage
//!
//! ```bash
//! digi-daq -f digitizers.toml -o applied.toml --log-level debug
//! ```

// Global allocator (Microsoft Rust Guidelines: M-MIMALLOC-APPS)
#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use digi_daq::config::ConfigFile;
use digi_daq::logging::{self, parse_log_level, OutputFormat, TracingConfig};
use digi_driver_mock::MockConnector;

#[derive(Parser)]
#[command(name = "digi-daq")]
#[command(about = "Configure digitizers and read back the applied settings", long_about = None)]
struct Cli {
    /// Digitizer configuration file (TOML)
    #[arg(short, long, default_value = "digitizers.toml")]
    file: PathBuf,

    /// Where to write the applied configuration (overrides [daq].output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overrides [daq].log_level
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format, overrides [daq].log_format
    #[arg(long, value_enum)]
    log_format: Option<OutputFormat>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ConfigFile::load(&cli.file)
        .with_context(|| format!("Cannot load configuration from {}", cli.file.display()))?;

    let mut tracing_config =
        TracingConfig::from_app_config(&config.app).map_err(anyhow::Error::msg)?;
    if let Some(level) = &cli.log_level {
        tracing_config.level = parse_log_level(level).map_err(anyhow::Error::msg)?;
    }
    if let Some(format) = cli.log_format {
        tracing_config = tracing_config.with_format(format);
    }
    logging::init(tracing_config).map_err(anyhow::Error::msg)?;

    let output = cli.output.unwrap_or_else(|| config.app.output.clone());
    let connector = MockConnector::with_catalog();

    digi_daq::run(config, &output, &connector)?;
    Ok(())
}
