// Numan Thabit 2025
use serde::Serialize;

use crate::{
    error::Result,
    event::{Direction, PacketEvent},
    profile::series_end_ms,
    resolver::ServerRole,
};

/// Buckets per second; each bucket covers 10 ms.
pub const BUCKETS_PER_SECOND: f64 = 100.0;
pub const BUCKET_WIDTH_MS: u64 = 10;

/// Received and completed request counts per 10 ms bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Throughput {
    pub received: Vec<u64>,
    pub completed: Vec<u64>,
}

impl Throughput {
    pub fn bucket_of(timestamp: f64) -> usize {
        (timestamp * BUCKETS_PER_SECOND).floor() as usize
    }

    /// Start of each bucket in milliseconds.
    pub fn bucket_starts_ms(&self) -> impl Iterator<Item = u64> {
        (0..self.received.len() as u64).map(|bucket| bucket * BUCKET_WIDTH_MS)
    }
}

/// Count every event of `sequence` into exactly one bucket.
pub fn count(
    role: &ServerRole,
    sequence: &[PacketEvent],
    max_timestamp: f64,
) -> Result<Throughput> {
    series_end_ms(max_timestamp)?;
    let buckets = Throughput::bucket_of(max_timestamp) + 1;
    let mut received = vec![0u64; buckets];
    let mut completed = vec![0u64; buckets];

    for event in sequence {
        let bucket = Throughput::bucket_of(event.timestamp);
        let counts = match role.classify(event) {
            Direction::Request => &mut received,
            Direction::Response => &mut completed,
        };
        if counts.len() <= bucket {
            series_end_ms(event.timestamp)?;
            counts.resize(bucket + 1, 0);
        }
        counts[bucket] += 1;
    }

    let len = received.len().max(completed.len());
    received.resize(len, 0);
    completed.resize(len, 0);

    Ok(Throughput {
        received,
        completed,
    })
}
