mod comparison_report;
mod influx_file_reporter;

use anyhow::Context;
use chrono::{DateTime, Utc};
use influxdb::{InfluxDbWriteable, Timestamp, WriteQuery};
use runbench_core::prelude::RunTag;
use runbench_summary_model::RunSummary;

pub use comparison_report::{write_comparison, ComparisonFormat};
pub use influx_file_reporter::InfluxFileReporter;

/// A trait for reporting line protocol records.
pub trait Report {
    type Error;

    /// Report a single [`WriteQuery`] record.
    fn report(&mut self, record: WriteQuery) -> Result<(), Self::Error>;
}

/// Identifies what a summary was measured from. Attached to every record as tags.
#[derive(Debug, Clone)]
pub struct RecordTags {
    pub scenario: String,
    pub revision: String,
    pub modified: bool,
    /// Used as the record timestamp, so runs of the same revision line up.
    pub reference_time: DateTime<Utc>,
    pub run_tags: Vec<RunTag>,
}

impl RecordTags {
    fn new_record(&self, measurement: &str) -> anyhow::Result<WriteQuery> {
        let nanos = self
            .reference_time
            .timestamp_nanos_opt()
            .and_then(|n| u128::try_from(n).ok())
            .with_context(|| {
                format!(
                    "Reference time {} cannot be expressed in nanoseconds since the epoch",
                    self.reference_time
                )
            })?;

        let mut query = Timestamp::Nanoseconds(nanos)
            .into_query(measurement)
            .add_tag("rev", self.revision.clone())
            .add_tag("mod", self.modified.to_string())
            .add_tag("gitTime", self.reference_time.timestamp().to_string())
            .add_tag("scenario", self.scenario.clone());

        for tag in &self.run_tags {
            query = query.add_tag(tag.key.clone(), tag.value.clone());
        }

        Ok(query)
    }
}

/// Render a summary as the set of records written for one scenario.
pub fn summary_records(summary: &RunSummary, tags: &RecordTags) -> anyhow::Result<Vec<WriteQuery>> {
    let mut records = Vec::with_capacity(4);

    records.push(
        tags.new_record("process_summary")?
            .add_field("duration", (summary.avg_duration * 10.0).round() / 10.0)
            .add_field("repo_size", summary.avg_repo_size)
            .add_field("num_files", summary.avg_file_count),
    );

    // A line protocol record needs at least one field
    if !summary.avg_counters.is_empty() {
        let mut heap = tags.new_record("process_heap_summary")?;
        for (field, value) in &summary.avg_counters {
            heap = heap.add_field(field.clone(), *value);
        }
        records.push(heap);
    }

    records.push(
        tags.new_record("process_ram_summary")?
            .add_field("avg_ram_rss", summary.avg_ram)
            .add_field("max_ram_rss", summary.max_ram),
    );

    records.push(
        tags.new_record("process_cpu_summary")?
            .add_field("avg_cpu_percent", summary.avg_cpu)
            .add_field("max_cpu_percent", summary.max_cpu),
    );

    Ok(records)
}
