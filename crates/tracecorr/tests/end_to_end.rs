// Numan Thabit 2025
use std::io::Write;

use tempfile::NamedTempFile;
use tracecorr::{
    analyze, analyze_path, plot_series, AnalysisError, AnalyzerConfig, SeriesBuffer,
};

fn redis() -> AnalyzerConfig {
    AnalyzerConfig::new("6379")
}

#[test]
fn unmatched_request_is_excluded_everywhere() {
    let input = "1.000 A B p1 6379\n1.010 B A 6379 p1\n2.000 C B p2 6379\n";
    let analysis = analyze(input.as_bytes(), &redis()).expect("analysis");

    assert_eq!(analysis.role.ip(), Some("B"));
    assert_eq!(analysis.correlation.pairs.len(), 1);
    assert_eq!(analysis.latency.count, 1);
    assert!((analysis.latency.p50_ms - 10.0).abs() < 1e-6);
    assert!((analysis.latency.p100_ms - 10.0).abs() < 1e-6);
    assert!(!analysis.correlation.paired.contains(3));

    // Series stop at the last paired event, not at the unmatched request.
    assert_eq!(analysis.throughput.received.len(), 102);
    assert_eq!(analysis.throughput.received.iter().sum::<u64>(), 1);
    assert_eq!(analysis.throughput.completed.iter().sum::<u64>(), 1);
    assert_eq!(analysis.profile.open_per_ms.len(), 1_011);
    assert_eq!(analysis.profile.open_per_ms[1_000], 1);
    assert_eq!(analysis.profile.open_per_ms[1_010], 0);
}

#[test]
fn capture_beyond_series_limit_is_an_error() {
    let input = "1e300 A B p1 6379\n1e300 B A 6379 p1\n";
    let err = analyze(input.as_bytes(), &redis()).expect_err("span too long");
    assert!(matches!(err, AnalysisError::SeriesSpan { .. }));
}

#[test]
fn concurrent_requests_fill_level_one_and_two() {
    let input = "\
0.100 10.0.0.2 10.0.0.1 4001 6379
0.104 10.0.0.3 10.0.0.1 4002 6379
0.110 10.0.0.1 10.0.0.2 6379 4001
0.116 10.0.0.1 10.0.0.3 6379 4002
";
    let analysis = analyze(input.as_bytes(), &redis()).expect("analysis");
    let profile = &analysis.profile;

    assert_eq!(profile.peak, 2);
    assert!((profile.level_durations[0] - 0.010).abs() < 1e-9);
    assert!((profile.level_durations[1] - 0.006).abs() < 1e-9);
    let levels: Vec<usize> = profile.levels().map(|(level, _)| level).collect();
    assert_eq!(levels, vec![1, 2]);
    assert!((profile.busy_time() - 0.016).abs() < 1e-9);
}

#[test]
fn registry_size_matches_requests_minus_responses() {
    let input = "\
1.0000 a s 1 6379
1.0005 b s 2 6379
1.0010 c s 3 6379
1.0015 s b 6379 2
1.0020 s a 6379 1
1.0025 d s 4 6379
1.0030 s c 6379 3
1.0035 s d 6379 4
";
    let analysis = analyze(input.as_bytes(), &redis()).expect("analysis");
    let mut open: i64 = 0;
    let mut max_open = 0;
    for event in &analysis.correlation.sequence {
        open += if event.source.port == "6379" { -1 } else { 1 };
        assert!(open >= 0);
        max_open = max_open.max(open);
    }
    assert_eq!(open, 0);
    assert_eq!(analysis.profile.peak as i64, max_open);
    assert_eq!(analysis.correlation.paired.len(), 2 * analysis.correlation.pairs.len());
}

#[test]
fn server_port_not_observed_aborts() {
    let input = "1.0 a b 1 2\n1.1 b a 2 1\n";
    let err = analyze(input.as_bytes(), &redis()).expect_err("no server port");
    assert!(matches!(err, AnalysisError::Configuration(_)));
}

#[test]
fn configured_server_ip_skips_detection() {
    let input = "1.0 a b 1 2\n";
    let mut config = redis();
    config.server_ip = Some("10.0.0.1".into());
    let err = analyze(input.as_bytes(), &config).expect_err("nothing pairs");
    assert!(matches!(err, AnalysisError::InsufficientData));
}

#[test]
fn malformed_line_aborts_with_its_line_number() {
    let input = "1.000 A B p1 6379\n1.010 B A 6379\n";
    let err = analyze(input.as_bytes(), &redis()).expect_err("malformed");
    assert!(matches!(err, AnalysisError::Parse { line: 2, .. }));
}

#[test]
fn analyze_path_reads_trace_file() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "0.50 10.0.0.2 10.0.0.1 4001 6379").expect("write");
    writeln!(file, "0.52 10.0.0.1 10.0.0.2 6379 4001").expect("write");
    file.flush().expect("flush");

    let analysis = analyze_path(file.path(), &redis()).expect("analysis");
    assert_eq!(analysis.latency.count, 1);

    let mut buffer = SeriesBuffer::default();
    plot_series(&analysis.profile, &analysis.throughput, &mut buffer).expect("plot");
    assert_eq!(buffer.series.len(), 3);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = analyze_path(std::path::Path::new("/nonexistent/trace"), &redis())
        .expect_err("missing file");
    assert!(matches!(err, AnalysisError::Io(_)));
}
