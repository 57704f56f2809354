// Numan Thabit 2025
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    event::{Direction, PacketEvent},
    resolver::{ClientKey, ServerRole},
};

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    timestamp: f64,
    line: usize,
}

/// A request and the response that answered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub client: ClientKey,
    pub request_line: usize,
    pub response_line: usize,
    /// Seconds between the request and its response.
    pub latency: f64,
}

impl MatchedPair {
    pub fn latency_ms(&self) -> f64 {
        self.latency * 1_000.0
    }
}

/// Lines (by input line number) that belong to some matched pair.
#[derive(Debug, Clone, Default)]
pub struct PairedLineSet(HashSet<usize>);

impl PairedLineSet {
    pub fn contains(&self, line: usize) -> bool {
        self.0.contains(&line)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert_pair(&mut self, request: usize, response: usize) {
        self.0.insert(request);
        self.0.insert(response);
    }
}

/// Events the correlator accepted without producing a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorrelationCounters {
    pub events: u64,
    pub requests: u64,
    pub responses: u64,
    /// Requests replaced by a newer request from the same client before any response.
    pub overwritten_requests: u64,
    /// Responses with no pending request for their client.
    pub orphan_responses: u64,
    /// Requests still pending when the input ended.
    pub unanswered_requests: u64,
}

/// Output of a full correlation pass.
#[derive(Debug, Clone)]
pub struct Correlation {
    pub pairs: Vec<MatchedPair>,
    pub paired: PairedLineSet,
    /// Paired-only events, in input order.
    pub sequence: Vec<PacketEvent>,
    pub counters: CorrelationCounters,
}

impl Correlation {
    pub fn latencies(&self) -> Vec<f64> {
        self.pairs.iter().map(|pair| pair.latency).collect()
    }

    /// Timestamp of the last paired event, or 0 when nothing paired.
    pub fn max_timestamp(&self) -> f64 {
        self.sequence
            .iter()
            .map(|event| event.timestamp)
            .fold(0.0, f64::max)
    }
}

/// Tracks one outstanding request per client and pairs it with the next
/// response to that client.
///
/// A client that sends a second request before the first is answered
/// replaces the first; only the most recent request is ever matched. Bursty
/// pipelined clients are therefore under-counted, and the number of replaced
/// requests is reported in [`CorrelationCounters::overwritten_requests`].
pub struct Correlator {
    role: ServerRole,
    pending: HashMap<ClientKey, PendingRequest>,
    events: Vec<PacketEvent>,
    pairs: Vec<MatchedPair>,
    paired: PairedLineSet,
    counters: CorrelationCounters,
}

impl Correlator {
    pub fn new(role: ServerRole) -> Self {
        Self {
            role,
            pending: HashMap::new(),
            events: Vec::new(),
            pairs: Vec::new(),
            paired: PairedLineSet::default(),
            counters: CorrelationCounters::default(),
        }
    }

    pub fn role(&self) -> &ServerRole {
        &self.role
    }

    pub fn observe(&mut self, event: PacketEvent) {
        self.counters.events += 1;
        let (direction, client) = self.role.client_of(&event);
        match direction {
            Direction::Request => {
                self.counters.requests += 1;
                let request = PendingRequest {
                    timestamp: event.timestamp,
                    line: event.line,
                };
                if let Some(previous) = self.pending.insert(client, request) {
                    self.counters.overwritten_requests += 1;
                    debug!(
                        replaced_line = previous.line,
                        line = event.line,
                        "request overwritten before a response arrived"
                    );
                }
            }
            Direction::Response => {
                self.counters.responses += 1;
                match self.pending.remove(&client) {
                    Some(request) => {
                        self.paired.insert_pair(request.line, event.line);
                        self.pairs.push(MatchedPair {
                            client,
                            request_line: request.line,
                            response_line: event.line,
                            latency: event.timestamp - request.timestamp,
                        });
                    }
                    None => {
                        self.counters.orphan_responses += 1;
                        debug!(line = event.line, %client, "response without a pending request");
                    }
                }
            }
        }
        self.events.push(event);
    }

    pub fn finish(self) -> Correlation {
        let Self {
            pending,
            events,
            pairs,
            paired,
            mut counters,
            ..
        } = self;
        counters.unanswered_requests = pending.len() as u64;

        if counters.overwritten_requests > 0 || counters.orphan_responses > 0 {
            warn!(
                overwritten = counters.overwritten_requests,
                orphaned = counters.orphan_responses,
                "events dropped during correlation"
            );
        }

        let sequence = events
            .into_iter()
            .filter(|event| paired.contains(event.line))
            .collect();

        Correlation {
            pairs,
            paired,
            sequence,
            counters,
        }
    }
}

/// Correlate an already-parsed event sequence.
pub fn correlate<I>(role: ServerRole, events: I) -> Correlation
where
    I: IntoIterator<Item = PacketEvent>,
{
    let mut correlator = Correlator::new(role);
    for event in events {
        correlator.observe(event);
    }
    correlator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::parse_line;

    fn events(lines: &[&str]) -> Vec<PacketEvent> {
        lines
            .iter()
            .enumerate()
            .map(|(idx, raw)| parse_line(idx + 1, raw).expect("valid line"))
            .collect()
    }

    fn redis() -> ServerRole {
        ServerRole::configured("6379", None)
    }

    #[test]
    fn pairs_request_with_response() {
        let out = correlate(
            redis(),
            events(&["1.000 A B p1 6379", "1.010 B A 6379 p1", "2.000 C B p2 6379"]),
        );
        assert_eq!(out.pairs.len(), 1);
        assert!((out.pairs[0].latency - 0.010).abs() < 1e-9);
        assert_eq!(out.pairs[0].request_line, 1);
        assert_eq!(out.pairs[0].response_line, 2);
        assert_eq!(out.paired.len(), 2);
        assert!(!out.paired.contains(3));
        assert_eq!(out.sequence.len(), 2);
        assert_eq!(out.counters.unanswered_requests, 1);
    }

    #[test]
    fn second_request_overwrites_first() {
        let out = correlate(
            redis(),
            events(&[
                "1.000 A B p1 6379",
                "1.002 A B p1 6379",
                "1.005 B A 6379 p1",
            ]),
        );
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].request_line, 2);
        assert!((out.pairs[0].latency - 0.003).abs() < 1e-9);
        assert!(!out.paired.contains(1));
        assert_eq!(out.counters.overwritten_requests, 1);
    }

    #[test]
    fn orphan_responses_are_counted_not_paired() {
        let out = correlate(
            redis(),
            events(&[
                "0.500 B A 6379 p1",
                "1.000 A B p1 6379",
                "1.001 B A 6379 p1",
                "1.002 B A 6379 p1",
            ]),
        );
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.counters.orphan_responses, 2);
        assert_eq!(out.counters.responses, 3);
        assert_eq!(out.sequence.iter().map(|e| e.line).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn sequence_keeps_input_order_across_clients() {
        let out = correlate(
            redis(),
            events(&[
                "1.000 A S a1 6379",
                "1.001 C S c1 6379",
                "1.002 S C 6379 c1",
                "1.003 S A 6379 a1",
            ]),
        );
        let lines: Vec<usize> = out.sequence.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
        assert_eq!(out.paired.len(), 2 * out.pairs.len());
        assert!(out.pairs.iter().all(|pair| pair.latency >= 0.0));
    }

    #[test]
    fn identical_lines_are_tracked_by_position() {
        let out = correlate(
            redis(),
            events(&["1.0 A S a 6379", "1.0 A S a 6379", "1.5 S A 6379 a"]),
        );
        assert_eq!(out.paired.len(), 2);
        assert_eq!(out.sequence.len(), 2);
    }

    #[test]
    fn max_timestamp_covers_paired_events_only() {
        let out = correlate(
            redis(),
            events(&["1.000 A B p1 6379", "1.010 B A 6379 p1", "2.000 C B p2 6379"]),
        );
        assert!((out.max_timestamp() - 1.010).abs() < 1e-9);
    }
}
