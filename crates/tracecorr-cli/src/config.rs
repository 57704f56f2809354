// Numan Thabit 2025
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracecorr::AnalyzerConfig;
use tracing::info;

const DEFAULT_INPUT: &str = "input";
const DEFAULT_CONFIG_PATH: &str = "tracecorr.toml";
const DEFAULT_MIN_LEVEL_DURATION_MS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesFormat {
    #[default]
    Json,
    Tsv,
}

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Request/response latency and concurrency profiler for reduced packet traces",
    rename_all = "kebab-case"
)]
pub struct CliArgs {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH", env = "TRACECORR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Reduced trace: `timestamp source_ip dest_ip source_port dest_port` per line.
    #[arg(long, short, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Port the server answers on; packets sent from it are responses.
    #[arg(long)]
    pub server_port: Option<u16>,

    /// Server address. Detected from the first packet when omitted.
    #[arg(long)]
    pub server_ip: Option<String>,

    /// Hide concurrency levels whose aggregate time is at or below this many milliseconds.
    #[arg(long)]
    pub min_level_duration_ms: Option<f64>,

    /// Log every request that arrives while exactly this many requests are open.
    #[arg(long)]
    pub watch_level: Option<usize>,

    /// Write the open-request and throughput series to this file.
    #[arg(long, value_name = "PATH")]
    pub series_out: Option<PathBuf>,

    /// Encoding for --series-out.
    #[arg(long, value_enum)]
    pub series_format: Option<SeriesFormat>,

    /// Write the summary as JSON to this file.
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    /// Write Prometheus text-format metrics to this file.
    #[arg(long, value_name = "PATH")]
    pub metrics_out: Option<PathBuf>,

    /// Logging verbosity when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub server_port: u16,
    pub server_ip: Option<String>,
    pub min_level_duration_ms: f64,
    pub watch_level: Option<usize>,
    pub series_out: Option<PathBuf>,
    pub series_format: SeriesFormat,
    pub report_json: Option<PathBuf>,
    pub metrics_out: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    input: Option<PathBuf>,
    server_port: Option<u16>,
    server_ip: Option<String>,
    min_level_duration_ms: Option<f64>,
    watch_level: Option<usize>,
    series_out: Option<PathBuf>,
    series_format: Option<SeriesFormat>,
    report_json: Option<PathBuf>,
    metrics_out: Option<PathBuf>,
}

impl Config {
    pub fn from_cli(cli: &CliArgs) -> Result<Self> {
        let file_cfg =
            load_file_config(cli.config.as_deref()).context("failed to load config file")?;
        let config = merge(cli, file_cfg)?;
        config.validate()?;
        config.log_summary();
        Ok(config)
    }

    pub fn analyzer(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            server_port: self.server_port.to_string(),
            server_ip: self.server_ip.clone(),
            watch_level: self.watch_level,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            bail!("server_port must be greater than 0");
        }
        if let Some(ip) = &self.server_ip {
            if ip.trim().is_empty() {
                bail!("server_ip must not be empty when specified");
            }
        }
        if !self.min_level_duration_ms.is_finite() || self.min_level_duration_ms < 0.0 {
            bail!("min_level_duration_ms must be a non-negative number");
        }
        if self.watch_level == Some(0) {
            bail!("watch_level must be at least 1");
        }
        Ok(())
    }

    fn log_summary(&self) {
        info!(
            input = %self.input.display(),
            server_port = self.server_port,
            server_ip = ?self.server_ip,
            min_level_duration_ms = self.min_level_duration_ms,
            watch_level = ?self.watch_level,
            series_out = ?self.series_out,
            series_format = ?self.series_format,
            report_json = ?self.report_json,
            metrics_out = ?self.metrics_out,
            config = ?self.config_path,
            "tracecorr configuration"
        );
    }
}

fn merge(cli: &CliArgs, file_cfg: Option<(PathBuf, FileConfig)>) -> Result<Config> {
    let (cfg_path, file_cfg) = file_cfg.unzip();
    let file_cfg = file_cfg.unwrap_or_default();

    let Some(server_port) = cli.server_port.or(file_cfg.server_port) else {
        bail!("server_port is required (pass --server-port or set it in the config file)");
    };

    Ok(Config {
        input: pick(
            cli.input.clone(),
            file_cfg.input,
            PathBuf::from(DEFAULT_INPUT),
        ),
        server_port,
        server_ip: cli.server_ip.clone().or(file_cfg.server_ip),
        min_level_duration_ms: pick(
            cli.min_level_duration_ms,
            file_cfg.min_level_duration_ms,
            DEFAULT_MIN_LEVEL_DURATION_MS,
        ),
        watch_level: cli.watch_level.or(file_cfg.watch_level),
        series_out: cli.series_out.clone().or(file_cfg.series_out),
        series_format: pick(
            cli.series_format,
            file_cfg.series_format,
            SeriesFormat::default(),
        ),
        report_json: cli.report_json.clone().or(file_cfg.report_json),
        metrics_out: cli.metrics_out.clone().or(file_cfg.metrics_out),
        config_path: cfg_path,
    })
}

fn pick<T>(cli: Option<T>, file: Option<T>, default: T) -> T {
    cli.or(file).unwrap_or(default)
}

fn load_file_config(path: Option<&Path>) -> Result<Option<(PathBuf, FileConfig)>> {
    if let Some(path) = path {
        return read_config(path).map(|cfg| Some((path.to_path_buf(), cfg)));
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return read_config(&default_path).map(|cfg| Some((default_path, cfg)));
    }

    Ok(None)
}

fn read_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        bail!("config file {} does not exist", path.display());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&data)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(cfg)
}
