// Numan Thabit 2025
use std::{fmt, io::BufRead};

use serde::Serialize;

use crate::error::{AnalysisError, Result};

const FIELD_COUNT: usize = 5;

/// One side of a packet: an address and a port, both kept as the opaque
/// tokens the capture reduction produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    pub ip: String,
    pub port: String,
}

impl Endpoint {
    pub fn new(ip: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Request,
    Response,
}

/// A single packet observed at the trace point.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketEvent {
    /// 1-based line number in the input; the event's identity.
    pub line: usize,
    /// Seconds since capture start.
    pub timestamp: f64,
    pub source: Endpoint,
    pub dest: Endpoint,
    /// Trimmed input line, kept for diagnostics.
    pub raw_line: String,
}

impl PacketEvent {
    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp * 1_000.0
    }
}

/// Parse `timestamp source_ip dest_ip source_port dest_port`.
pub fn parse_line(line: usize, raw: &str) -> Result<PacketEvent> {
    let trimmed = raw.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() != FIELD_COUNT {
        return Err(AnalysisError::parse(
            line,
            format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
        ));
    }

    let timestamp = fields[0]
        .parse::<f64>()
        .map_err(|err| AnalysisError::parse(line, format!("timestamp '{}': {err}", fields[0])))?;
    if !timestamp.is_finite() || timestamp < 0.0 {
        return Err(AnalysisError::parse(
            line,
            format!("timestamp '{}' must be a finite, non-negative number of seconds", fields[0]),
        ));
    }

    Ok(PacketEvent {
        line,
        timestamp,
        source: Endpoint::new(fields[1], fields[3]),
        dest: Endpoint::new(fields[2], fields[4]),
        raw_line: trimmed.to_string(),
    })
}

/// Streams parsed events out of a line-oriented reader, skipping blank lines.
pub struct EventReader<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::with_capacity(128),
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<PacketEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    if self.buf.trim().is_empty() {
                        continue;
                    }
                    return Some(parse_line(self.line, &self.buf));
                }
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}
