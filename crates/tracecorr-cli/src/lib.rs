// Numan Thabit 2025
//! Command-line front end for `tracecorr`: configuration, text report and
//! file outputs.

pub mod config;
pub mod metrics;
pub mod output;
pub mod report;

use std::io::Write;

use anyhow::{Context, Result};
use tracecorr::Analysis;
use tracing::info;

use config::Config;
use metrics::ReportMetrics;
use report::Report;

/// Analyze the configured trace, print the text report to `out`, and write
/// any requested output files.
pub fn run<W: Write>(config: &Config, out: &mut W) -> Result<Analysis> {
    let analysis = tracecorr::analyze_path(&config.input, &config.analyzer())
        .with_context(|| format!("failed to analyze {}", config.input.display()))?;

    let report = Report::new(&analysis, config.min_level_duration_ms);
    report.write_text(out).context("failed to write report")?;

    if let Some(path) = &config.series_out {
        output::write_series(
            path,
            config.series_format,
            &analysis.profile,
            &analysis.throughput,
        )?;
        info!(path = %path.display(), format = ?config.series_format, "wrote series");
    }

    if let Some(path) = &config.report_json {
        report::write_json_report(path, &report)?;
        info!(path = %path.display(), "wrote json report");
    }

    if let Some(path) = &config.metrics_out {
        ReportMetrics::from_analysis(&analysis)?.write_to(path)?;
        info!(path = %path.display(), "wrote metrics textfile");
    }

    Ok(analysis)
}
