// Numan Thabit 2025
use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracecorr_cli::config::{CliArgs, Config};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let cli = CliArgs::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cli.log_level)
            .with_context(|| format!("invalid log level: {}", cli.log_level))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_cli(&cli)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let analysis = tracecorr_cli::run(&config, &mut out)?;

    tracing::info!(
        pairs = analysis.correlation.pairs.len(),
        peak_concurrency = analysis.profile.peak,
        "tracecorr finished"
    );
    Ok(())
}
