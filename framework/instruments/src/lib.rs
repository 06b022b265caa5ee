mod metrics;
mod report;

pub use metrics::{last_positive_counters, parse_counters};
pub use report::{
    summary_records, write_comparison, ComparisonFormat, InfluxFileReporter, RecordTags, Report,
};
