use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use influxdb::{Query, WriteQuery};

use crate::report::Report;

/// Write records in the InfluxDB line protocol format, one per line.
///
/// The output can be imported with `influx write --file=<path>`.
pub struct InfluxFileReporter<W>
where
    W: Write,
{
    writer: W,
}

impl<W> InfluxFileReporter<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush anything buffered to the underlying writer.
    pub fn finalize(mut self) -> anyhow::Result<()> {
        self.writer.flush().context("Failed to flush records")
    }

    /// Report every record in `records` and then finalize.
    pub fn write_all<I>(mut self, records: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = WriteQuery>,
    {
        for record in records {
            self.report(record)?;
        }
        self.finalize()
    }
}

impl InfluxFileReporter<BufWriter<File>> {
    /// Create the file at `path`, and any missing parent directories, and report into it.
    ///
    /// An existing file is truncated.
    pub fn create<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory {}", parent.display())
            })?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W> Report for InfluxFileReporter<W>
where
    W: Write,
{
    type Error = anyhow::Error;

    fn report(&mut self, record: WriteQuery) -> Result<(), Self::Error> {
        let line = record.build()?.get();
        log::debug!("Writing record: {line}");
        writeln!(self.writer, "{line}")?;
        Ok(())
    }
}
