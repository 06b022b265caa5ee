use std::io::Write;

use runbench_summary_model::ComparisonReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonFormat {
    /// One `<metric>: current:.. baseline:.. change:..` line per metric.
    Lines,
    Json,
}

/// Write a comparison of the current executable against the baseline.
pub fn write_comparison<W>(
    mut writer: W,
    report: &ComparisonReport,
    format: ComparisonFormat,
) -> anyhow::Result<()>
where
    W: Write,
{
    match format {
        ComparisonFormat::Lines => {
            for metric in &report.metrics {
                writeln!(writer, "{metric}")?;
            }
        }
        ComparisonFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, report)?;
            writeln!(writer)?;
        }
    }

    writer.flush()?;
    Ok(())
}
