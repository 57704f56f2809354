// Numan Thabit 2025
use std::io;

/// Failures that abort an analysis run.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("no matched request/response pairs to compute latency statistics from")]
    InsufficientData,
    #[error("line {line}: response for {client} has no open request in the in-flight registry")]
    Consistency { line: usize, client: String },
    #[error("capture spans {span_ms} ms, beyond the {limit_ms} ms series limit")]
    SeriesSpan { span_ms: f64, limit_ms: usize },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}
