// Numan Thabit 2025
use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Serialize;
use tracecorr::{Analysis, CorrelationCounters, LatencySummary};

#[derive(Debug, Clone, Serialize)]
pub struct LevelDuration {
    pub level: usize,
    pub duration_ms: f64,
}

/// Serializable summary of one run; the per-millisecond series are written
/// separately.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub server_port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    pub counters: CorrelationCounters,
    pub latency: LatencySummary,
    pub peak_concurrency: usize,
    pub busy_time_ms: f64,
    /// Levels above the configured threshold.
    pub levels: Vec<LevelDuration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub watch_hits: Vec<f64>,
}

impl Report {
    pub fn new(analysis: &Analysis, min_level_duration_ms: f64) -> Self {
        let threshold_secs = min_level_duration_ms / 1_000.0;
        Self {
            server_port: analysis.role.port().to_string(),
            server_ip: analysis.role.ip().map(str::to_string),
            counters: analysis.correlation.counters,
            latency: analysis.latency,
            peak_concurrency: analysis.profile.peak,
            busy_time_ms: analysis.profile.busy_time() * 1_000.0,
            levels: analysis
                .profile
                .levels_above(threshold_secs)
                .map(|(level, secs)| LevelDuration {
                    level,
                    duration_ms: secs * 1_000.0,
                })
                .collect(),
            watch_hits: analysis.profile.watch_hits.clone(),
        }
    }

    /// Plain-text summary: pair count, percentiles, then the level table.
    pub fn write_text<W: Write>(&self, out: &mut W) -> Result<()> {
        let latency = &self.latency;
        writeln!(out, "stats data point count {}", latency.count)?;
        writeln!(
            out,
            "P50 {:10.4} ms, P90 {:10.4} ms, P99 {:10.4} ms, P99.9 {:10.4} ms, P100 {:10.4} ms",
            latency.p50_ms, latency.p90_ms, latency.p99_ms, latency.p999_ms, latency.p100_ms
        )?;
        for level in &self.levels {
            writeln!(out, "{:4} : {:6.3} ms", level.level, level.duration_ms)?;
        }

        let counters = &self.counters;
        if counters.overwritten_requests > 0
            || counters.orphan_responses > 0
            || counters.unanswered_requests > 0
        {
            writeln!(
                out,
                "dropped: {} overwritten requests, {} orphan responses, {} unanswered requests",
                counters.overwritten_requests,
                counters.orphan_responses,
                counters.unanswered_requests
            )?;
        }
        Ok(())
    }
}

pub fn write_json_report(path: &Path, report: &Report) -> Result<()> {
    let mut writer = create_output(path)?;
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush report to {}", path.display()))?;
    Ok(())
}

/// Open `path` for writing, creating parent directories as needed.
pub(crate) fn create_output(path: &Path) -> Result<BufWriter<fs::File>> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("failed to open output path {}", path.display()))?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracecorr::{analyze, AnalyzerConfig};

    fn sample() -> Analysis {
        let input = "\
1.000 A S a 6379
1.004 C S c 6379
1.030 S A 6379 a
1.032 S C 6379 c
2.000 D S d 6379
";
        analyze(input.as_bytes(), &AnalyzerConfig::new("6379")).expect("analysis")
    }

    #[test]
    fn text_report_matches_expected_layout() {
        let report = Report::new(&sample(), 10.0);
        let mut out = Vec::new();
        report.write_text(&mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "stats data point count 2");
        assert!(lines[1].starts_with("P50    30.0000 ms, P90    30.0000 ms"));
        assert_eq!(lines[2], "   2 : 26.000 ms");
        assert_eq!(
            lines[3],
            "dropped: 0 overwritten requests, 0 orphan responses, 1 unanswered requests"
        );
    }

    #[test]
    fn levels_below_threshold_are_hidden() {
        let report = Report::new(&sample(), 10.0);
        let levels: Vec<usize> = report.levels.iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![2]);

        let report = Report::new(&sample(), 1.0);
        let levels: Vec<usize> = report.levels.iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![1, 2]);
    }

    #[test]
    fn json_report_is_written_with_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/report.json");
        write_json_report(&path, &Report::new(&sample(), 10.0)).expect("write");

        let raw = fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["latency"]["count"], 2);
        assert_eq!(value["server_ip"], "S");
        assert_eq!(value["counters"]["unanswered_requests"], 1);
        assert_eq!(value["peak_concurrency"], 2);
        assert!(value.get("watch_hits").is_none());
    }
}
