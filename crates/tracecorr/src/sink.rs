// Numan Thabit 2025
use serde::Serialize;

use crate::{error::Result, profile::ConcurrencyProfile, throughput::Throughput};

pub const OPEN_PER_MS: &str = "open_requests_per_ms";
pub const RECEIVED_PER_10MS: &str = "received_requests_per_10ms";
pub const COMPLETED_PER_10MS: &str = "completed_requests_per_10ms";

/// Destination for the charted series. `x` is in milliseconds.
pub trait ChartSink {
    fn plot(&mut self, x: &[f64], y: &[f64], label: &str) -> Result<()>;
}

/// A single labelled series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Collects plotted series in memory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesBuffer {
    pub series: Vec<Series>,
}

impl SeriesBuffer {
    pub fn get(&self, label: &str) -> Option<&Series> {
        self.series.iter().find(|series| series.label == label)
    }
}

impl ChartSink for SeriesBuffer {
    fn plot(&mut self, x: &[f64], y: &[f64], label: &str) -> Result<()> {
        self.series.push(Series {
            label: label.to_string(),
            x: x.to_vec(),
            y: y.to_vec(),
        });
        Ok(())
    }
}

/// Hand the open-request and throughput series to `sink`.
pub fn plot_series<S: ChartSink + ?Sized>(
    profile: &ConcurrencyProfile,
    throughput: &Throughput,
    sink: &mut S,
) -> Result<()> {
    let ms: Vec<f64> = (0..profile.open_per_ms.len()).map(|ms| ms as f64).collect();
    let open: Vec<f64> = profile.open_per_ms.iter().map(|&n| n as f64).collect();
    sink.plot(&ms, &open, OPEN_PER_MS)?;

    let ten_ms: Vec<f64> = throughput.bucket_starts_ms().map(|ms| ms as f64).collect();
    let received: Vec<f64> = throughput.received.iter().map(|&n| n as f64).collect();
    let completed: Vec<f64> = throughput.completed.iter().map(|&n| n as f64).collect();
    sink.plot(&ten_ms, &received, RECEIVED_PER_10MS)?;
    sink.plot(&ten_ms, &completed, COMPLETED_PER_10MS)?;
    Ok(())
}
