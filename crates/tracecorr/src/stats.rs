// Numan Thabit 2025
use serde::Serialize;

use crate::error::{AnalysisError, Result};

/// A percentile expressed in tenths of a percent so that 99.9 stays exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percentile {
    per_mille: u32,
}

impl Percentile {
    pub const P50: Self = Self::per_mille(500);
    pub const P90: Self = Self::per_mille(900);
    pub const P99: Self = Self::per_mille(990);
    pub const P999: Self = Self::per_mille(999);
    pub const P100: Self = Self::per_mille(1_000);

    pub const fn per_mille(per_mille: u32) -> Self {
        Self { per_mille }
    }

    /// The percentile as a quantile in [0, 1].
    pub fn as_quantile(self) -> f64 {
        f64::from(self.per_mille) / 1_000.0
    }

    /// Nearest-rank index into a sorted sample of `len` values:
    /// `floor(len * p / 100)`, with the maximum returned for p >= 100.
    pub fn rank(self, len: usize) -> usize {
        debug_assert!(len > 0);
        if self.per_mille >= 1_000 {
            return len - 1;
        }
        let rank = (len as u128 * u128::from(self.per_mille)) / 1_000;
        (rank as usize).min(len - 1)
    }
}

/// Nearest-rank value from an ascending slice. No interpolation.
pub fn nearest_rank(sorted: &[f64], percentile: Percentile) -> Result<f64> {
    if sorted.is_empty() {
        return Err(AnalysisError::InsufficientData);
    }
    Ok(sorted[percentile.rank(sorted.len())])
}

/// Latency distribution of the matched pairs, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub p999_ms: f64,
    pub p100_ms: f64,
    pub min_ms: f64,
    pub mean_ms: f64,
}

impl LatencySummary {
    /// Summarize latencies given in seconds.
    pub fn from_latencies(mut latencies: Vec<f64>) -> Result<Self> {
        if latencies.is_empty() {
            return Err(AnalysisError::InsufficientData);
        }
        latencies.sort_by(f64::total_cmp);

        let ms = |p: Percentile| nearest_rank(&latencies, p).map(|secs| secs * 1_000.0);
        let mean = latencies.iter().sum::<f64>() / latencies.len() as f64;

        Ok(Self {
            count: latencies.len(),
            p50_ms: ms(Percentile::P50)?,
            p90_ms: ms(Percentile::P90)?,
            p99_ms: ms(Percentile::P99)?,
            p999_ms: ms(Percentile::P999)?,
            p100_ms: ms(Percentile::P100)?,
            min_ms: latencies[0] * 1_000.0,
            mean_ms: mean * 1_000.0,
        })
    }

    /// `(percentile, value_ms)` for the five reported ranks.
    pub fn percentiles(&self) -> [(Percentile, f64); 5] {
        [
            (Percentile::P50, self.p50_ms),
            (Percentile::P90, self.p90_ms),
            (Percentile::P99, self.p99_ms),
            (Percentile::P999, self.p999_ms),
            (Percentile::P100, self.p100_ms),
        ]
    }
}
