// Numan Thabit 2025
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::info;

use crate::{
    error::{AnalysisError, Result},
    event::{Direction, PacketEvent},
    resolver::{ClientKey, ServerRole},
};

/// Longest capture the dense series cover: six hours at 1 ms resolution.
pub const MAX_SERIES_MS: usize = 6 * 60 * 60 * 1_000;

/// Last millisecond index of a series spanning `0..=timestamp` seconds.
pub(crate) fn series_end_ms(timestamp: f64) -> Result<usize> {
    let end_ms = (timestamp * 1_000.0).ceil();
    if !(0.0..=MAX_SERIES_MS as f64).contains(&end_ms) {
        return Err(AnalysisError::SeriesSpan {
            span_ms: end_ms,
            limit_ms: MAX_SERIES_MS,
        });
    }
    Ok(end_ms as usize)
}

#[derive(Debug, Clone, Copy)]
struct OpenRequest {
    seq: u64,
    opened_at: f64,
}

/// Requests currently in flight, remembering the order they were opened in.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    open: HashMap<ClientKey, OpenRequest>,
    order: BTreeMap<u64, ClientKey>,
    next_seq: u64,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn open(&mut self, client: ClientKey, opened_at: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(previous) = self.open.insert(client.clone(), OpenRequest { seq, opened_at }) {
            self.order.remove(&previous.seq);
        }
        self.order.insert(seq, client);
    }

    /// Close the request for `client`, returning when it was opened.
    pub fn close(&mut self, client: &ClientKey) -> Option<f64> {
        let request = self.open.remove(client)?;
        self.order.remove(&request.seq);
        Some(request.opened_at)
    }

    /// The longest-open request.
    pub fn oldest(&self) -> Option<(&ClientKey, f64)> {
        let (_, client) = self.order.iter().next()?;
        self.open.get(client).map(|request| (client, request.opened_at))
    }
}

/// Concurrency over the paired-only event sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConcurrencyProfile {
    /// Open request count at every millisecond boundary from 0 through
    /// `ceil(max_timestamp * 1000)`.
    pub open_per_ms: Vec<usize>,
    /// Seconds spent with exactly `k` requests open, stored at index `k - 1`.
    pub level_durations: Vec<f64>,
    pub peak: usize,
    /// Timestamps of requests that arrived while the watched level was open.
    pub watch_hits: Vec<f64>,
}

impl ConcurrencyProfile {
    /// `(level, seconds)` pairs for every level that accumulated any time.
    pub fn levels(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.level_durations
            .iter()
            .enumerate()
            .filter(|(_, secs)| **secs > 0.0)
            .map(|(idx, secs)| (idx + 1, *secs))
    }

    /// Levels whose aggregate time exceeds `threshold_secs`.
    pub fn levels_above(&self, threshold_secs: f64) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.levels().filter(move |(_, secs)| *secs > threshold_secs)
    }

    /// Total time with at least one request open.
    pub fn busy_time(&self) -> f64 {
        self.level_durations.iter().sum()
    }
}

/// Sweep the paired-only `sequence` in time order.
///
/// For every event the time since the previous event is charged to the
/// concurrency level in effect before it; the registry is mutated only after
/// that attribution. `watch_level`, when set, records each request that
/// arrives while exactly that many (at least one) requests are already open.
///
/// Fails with [`AnalysisError::SeriesSpan`] when the capture is longer than
/// [`MAX_SERIES_MS`].
pub fn profile(
    role: &ServerRole,
    sequence: &[PacketEvent],
    max_timestamp: f64,
    watch_level: Option<usize>,
) -> Result<ConcurrencyProfile> {
    let end_ms = series_end_ms(max_timestamp)?;
    let mut open_per_ms: Vec<usize> = Vec::with_capacity(end_ms + 1);
    let mut level_durations: Vec<f64> = Vec::new();
    let mut watch_hits = Vec::new();
    let mut registry = InFlightRegistry::new();
    let mut last_timestamp: Option<f64> = None;
    let mut peak = 0;

    for event in sequence {
        let event_ms = event.timestamp_ms();
        if event_ms > end_ms as f64 {
            series_end_ms(event.timestamp)?;
        }
        while (open_per_ms.len() as f64) < event_ms {
            open_per_ms.push(registry.len());
        }

        let in_flight = registry.len();
        if in_flight > 0 {
            if let Some(last) = last_timestamp {
                if level_durations.len() < in_flight {
                    level_durations.resize(in_flight, 0.0);
                }
                level_durations[in_flight - 1] += event.timestamp - last;
            }
        }

        let (direction, client) = role.client_of(event);
        match direction {
            Direction::Request => {
                if in_flight > 0 && watch_level == Some(in_flight) {
                    watch_hits.push(event.timestamp);
                    let oldest = registry.oldest();
                    info!(
                        timestamp = event.timestamp,
                        line = event.line,
                        in_flight,
                        oldest_client = ?oldest.map(|(client, _)| client.to_string()),
                        oldest_opened_at = ?oldest.map(|(_, opened)| opened),
                        "watched concurrency level reached"
                    );
                }
                registry.open(client, event.timestamp);
                peak = peak.max(registry.len());
            }
            Direction::Response => {
                if registry.close(&client).is_none() {
                    return Err(AnalysisError::Consistency {
                        line: event.line,
                        client: client.to_string(),
                    });
                }
            }
        }
        last_timestamp = Some(event.timestamp);
    }

    let len = open_per_ms.len().max(end_ms + 1);
    open_per_ms.resize(len, registry.len());

    Ok(ConcurrencyProfile {
        open_per_ms,
        level_durations,
        peak,
        watch_hits,
    })
}
