// Numan Thabit 2025
use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use tracecorr::{plot_series, ChartSink, ConcurrencyProfile, SeriesBuffer, Throughput};

use crate::{config::SeriesFormat, report::create_output};

/// Writes each series as a `# label` header followed by `x<TAB>y` rows,
/// separated by blank lines (gnuplot `index` blocks).
pub struct TsvSink<W: Write> {
    out: W,
    blocks: usize,
}

impl<W: Write> TsvSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, blocks: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChartSink for TsvSink<W> {
    fn plot(&mut self, x: &[f64], y: &[f64], label: &str) -> tracecorr::Result<()> {
        if self.blocks > 0 {
            writeln!(self.out)?;
            writeln!(self.out)?;
        }
        writeln!(self.out, "# {label}")?;
        for (x, y) in x.iter().zip(y) {
            writeln!(self.out, "{x}\t{y}")?;
        }
        self.blocks += 1;
        Ok(())
    }
}

/// Write the open-request and throughput series to `path`.
pub fn write_series(
    path: &Path,
    format: SeriesFormat,
    profile: &ConcurrencyProfile,
    throughput: &Throughput,
) -> Result<()> {
    let mut writer = create_output(path)?;
    match format {
        SeriesFormat::Json => {
            let mut buffer = SeriesBuffer::default();
            plot_series(profile, throughput, &mut buffer)?;
            serde_json::to_writer(&mut writer, &buffer)
                .with_context(|| format!("failed to write series to {}", path.display()))?;
        }
        SeriesFormat::Tsv => {
            let mut sink = TsvSink::new(&mut writer);
            plot_series(profile, throughput, &mut sink)
                .with_context(|| format!("failed to write series to {}", path.display()))?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush series to {}", path.display()))?;
    Ok(())
}
