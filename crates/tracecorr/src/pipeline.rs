// Numan Thabit 2025
use std::{
    fs::File,
    io::{BufRead, BufReader},
    panic,
    path::Path,
    thread,
};

use tracing::{debug, info};

use crate::{
    correlate::{Correlation, Correlator},
    error::Result,
    event::EventReader,
    profile::{self, ConcurrencyProfile},
    resolver::ServerRole,
    stats::LatencySummary,
    throughput::{self, Throughput},
};

/// Inputs the engine needs beyond the trace itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub server_port: String,
    /// Known server address; detected from the first event when absent.
    pub server_ip: Option<String>,
    pub watch_level: Option<usize>,
}

impl AnalyzerConfig {
    pub fn new(server_port: impl Into<String>) -> Self {
        Self {
            server_port: server_port.into(),
            server_ip: None,
            watch_level: None,
        }
    }
}

/// Everything derived from one trace.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub role: ServerRole,
    pub correlation: Correlation,
    pub latency: LatencySummary,
    pub profile: ConcurrencyProfile,
    pub throughput: Throughput,
}

/// Run the full pipeline over a trace file.
pub fn analyze_path(path: &Path, config: &AnalyzerConfig) -> Result<Analysis> {
    let file = File::open(path)?;
    analyze(BufReader::new(file), config)
}

/// Parse, correlate and profile a trace in a single pass over `reader`.
pub fn analyze<R: BufRead>(reader: R, config: &AnalyzerConfig) -> Result<Analysis> {
    let mut events = EventReader::new(reader);
    let first = events.next().transpose()?;
    let role = ServerRole::resolve(
        &config.server_port,
        config.server_ip.as_deref(),
        first.as_ref(),
    )?;

    let mut correlator = Correlator::new(role.clone());
    if let Some(first) = first {
        correlator.observe(first);
    }
    for event in events {
        correlator.observe(event?);
    }
    let correlation = correlator.finish();
    info!(
        events = correlation.counters.events,
        pairs = correlation.pairs.len(),
        unanswered = correlation.counters.unanswered_requests,
        "correlation complete"
    );

    analyze_correlation(role, correlation, config.watch_level)
}

/// Run the three independent analyzers over a finished correlation.
pub fn analyze_correlation(
    role: ServerRole,
    correlation: Correlation,
    watch_level: Option<usize>,
) -> Result<Analysis> {
    let max_timestamp = correlation.max_timestamp();
    debug!(max_timestamp, sequence = correlation.sequence.len(), "starting analyzers");

    let (latency, profile, throughput) = thread::scope(|scope| {
        let latency = scope.spawn(|| LatencySummary::from_latencies(correlation.latencies()));
        let profile = scope.spawn(|| {
            profile::profile(&role, &correlation.sequence, max_timestamp, watch_level)
        });
        let throughput = throughput::count(&role, &correlation.sequence, max_timestamp);
        (
            latency.join().unwrap_or_else(|err| panic::resume_unwind(err)),
            profile.join().unwrap_or_else(|err| panic::resume_unwind(err)),
            throughput,
        )
    });

    Ok(Analysis {
        latency: latency?,
        profile: profile?,
        throughput: throughput?,
        role,
        correlation,
    })
}
