// Numan Thabit 2025
#![forbid(unsafe_code)]
//! tracecorr: request/response correlation and concurrency profiling over
//! reduced packet traces.
//!
//! A trace is a text file of `timestamp source_ip dest_ip source_port dest_port`
//! lines. Requests are paired with the next response to the same client,
//! latency percentiles are computed over the pairs, and the paired-only
//! sequence is swept to recover in-flight counts and throughput.

pub mod correlate;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod profile;
pub mod resolver;
pub mod sink;
pub mod stats;
pub mod throughput;

pub use correlate::{correlate, Correlation, CorrelationCounters, Correlator, MatchedPair, PairedLineSet};
pub use error::{AnalysisError, Result};
pub use event::{parse_line, Direction, Endpoint, EventReader, PacketEvent};
pub use pipeline::{analyze, analyze_correlation, analyze_path, Analysis, AnalyzerConfig};
pub use profile::{profile, ConcurrencyProfile, InFlightRegistry, MAX_SERIES_MS};
pub use resolver::{ClientKey, ServerRole};
pub use sink::{plot_series, ChartSink, Series, SeriesBuffer};
pub use stats::{nearest_rank, LatencySummary, Percentile};
pub use throughput::{count as count_throughput, Throughput};
