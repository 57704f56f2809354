// Numan Thabit 2025
use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use prometheus::{
    exponential_buckets, opts, Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntGauge,
    Registry, TextEncoder,
};
use tracecorr::Analysis;

/// Run results as a Prometheus textfile, for node_exporter's textfile collector.
pub struct ReportMetrics {
    registry: Registry,
}

impl ReportMetrics {
    pub fn from_analysis(analysis: &Analysis) -> Result<Self> {
        let registry = Registry::new_custom(Some("tracecorr".into()), None)
            .context("failed to create metrics registry")?;

        let counters = &analysis.correlation.counters;
        let pairs = IntCounter::with_opts(opts!("matched_pairs_total", "Matched request/response pairs"))
            .context("failed to build pairs counter")?;
        let overwritten = IntCounter::with_opts(opts!(
            "overwritten_requests_total",
            "Requests replaced by a newer request from the same client"
        ))
        .context("failed to build overwritten counter")?;
        let orphaned = IntCounter::with_opts(opts!(
            "orphan_responses_total",
            "Responses with no pending request"
        ))
        .context("failed to build orphan counter")?;
        let unanswered = IntCounter::with_opts(opts!(
            "unanswered_requests_total",
            "Requests still pending at end of trace"
        ))
        .context("failed to build unanswered counter")?;
        let peak = IntGauge::with_opts(opts!(
            "peak_concurrency",
            "Highest number of requests open at once"
        ))
        .context("failed to build peak gauge")?;
        let quantiles = GaugeVec::new(
            opts!("latency_quantile_seconds", "Nearest-rank latency percentiles"),
            &["quantile"],
        )
        .context("failed to build quantile gauge")?;
        let latency_buckets =
            exponential_buckets(5e-5, 1.8, 14).context("failed to build latency buckets")?;
        let latency = Histogram::with_opts(
            HistogramOpts::new("request_latency_seconds", "Matched pair latency")
                .buckets(latency_buckets),
        )
        .context("failed to build latency histogram")?;

        registry
            .register(Box::new(pairs.clone()))
            .context("register pairs")?;
        registry
            .register(Box::new(overwritten.clone()))
            .context("register overwritten")?;
        registry
            .register(Box::new(orphaned.clone()))
            .context("register orphaned")?;
        registry
            .register(Box::new(unanswered.clone()))
            .context("register unanswered")?;
        registry
            .register(Box::new(peak.clone()))
            .context("register peak")?;
        registry
            .register(Box::new(quantiles.clone()))
            .context("register quantiles")?;
        registry
            .register(Box::new(latency.clone()))
            .context("register latency")?;

        pairs.inc_by(analysis.correlation.pairs.len() as u64);
        overwritten.inc_by(counters.overwritten_requests);
        orphaned.inc_by(counters.orphan_responses);
        unanswered.inc_by(counters.unanswered_requests);
        peak.set(analysis.profile.peak as i64);
        for (percentile, value_ms) in analysis.latency.percentiles() {
            let label = percentile.as_quantile().to_string();
            quantiles
                .with_label_values(&[label.as_str()])
                .set(value_ms / 1_000.0);
        }
        for pair in &analysis.correlation.pairs {
            latency.observe(pair.latency);
        }

        Ok(Self { registry })
    }

    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::with_capacity(4096);
        encoder
            .encode(&metric_families, &mut buf)
            .context("failed to encode metrics")?;
        String::from_utf8(buf).map_err(|err| anyhow!("metrics output not utf8: {err}"))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).with_context(|| {
                    format!("failed to create metrics directory {}", dir.display())
                })?;
            }
        }
        fs::write(path, rendered)
            .with_context(|| format!("failed to write metrics to {}", path.display()))
    }
}
