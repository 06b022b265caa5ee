use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use runbench_core::prelude::{NoSamplesError, TrackedCounter};
use serde::Serialize;

mod compare;

pub use compare::{ComparedMetric, ComparisonReport, PercentChange};

/// Resource usage of the measured process at one polling tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Shifted by the run's time offset, see [RunResult].
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    /// Resident set size in MiB.
    pub ram_mib: f64,
    /// Raw body scraped from the metrics endpoint, absent if the scrape failed.
    pub metrics_payload: Option<Vec<u8>>,
}

/// The outcome of one measured run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub duration: Duration,
    pub repo_file_count: u64,
    pub repo_size_bytes: u64,
    /// Last positive value seen for each tracked counter, keyed by counter name.
    pub counters: HashMap<String, f64>,
    samples: Vec<Sample>,
}

impl RunResult {
    /// Create a run result.
    ///
    /// A run has to be summarised from at least one sample so this fails if `samples` is empty.
    pub fn new(
        pid: u32,
        duration: Duration,
        repo_file_count: u64,
        repo_size_bytes: u64,
        counters: HashMap<String, f64>,
        samples: Vec<Sample>,
    ) -> Result<Self, NoSamplesError> {
        if samples.is_empty() {
            return Err(NoSamplesError::new(pid));
        }

        Ok(Self {
            duration,
            repo_file_count,
            repo_size_bytes,
            counters,
            samples,
        })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn counter(&self, name: &str) -> f64 {
        self.counters.get(name).copied().unwrap_or_default()
    }
}

/// Scalar reduction of a set of runs.
///
/// Duration, repository and counter values are averaged per run. CPU and RAM are averaged per
/// sample across all runs, and their maxima are taken over every sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub avg_cpu: f64,
    pub max_cpu: f64,
    pub avg_ram: f64,
    pub max_ram: f64,
    /// Seconds
    pub avg_duration: f64,
    pub avg_repo_size: f64,
    pub avg_file_count: f64,
    /// Averages of the tracked counters, keyed by their field name, in tracking order.
    pub avg_counters: Vec<(String, f64)>,
}

impl RunSummary {
    /// Summarise the given runs.
    ///
    /// Counters that were never observed in a run count as zero for that run.
    pub fn summarize(runs: &[RunResult], counters: &[TrackedCounter]) -> anyhow::Result<Self> {
        anyhow::ensure!(!runs.is_empty(), "Cannot summarise an empty set of runs");

        let mut total_cpu = 0.0;
        let mut total_ram = 0.0;
        let mut max_cpu = 0.0_f64;
        let mut max_ram = 0.0_f64;
        let mut sample_count = 0usize;

        let mut total_duration = 0.0;
        let mut total_repo_size = 0.0;
        let mut total_files = 0.0;
        let mut total_counters = vec![0.0; counters.len()];

        for run in runs {
            total_duration += run.duration.as_secs_f64();
            total_repo_size += run.repo_size_bytes as f64;
            total_files += run.repo_file_count as f64;

            for (total, counter) in total_counters.iter_mut().zip(counters) {
                *total += run.counter(&counter.name);
            }

            for sample in run.samples() {
                total_cpu += sample.cpu_percent;
                total_ram += sample.ram_mib;
                max_cpu = max_cpu.max(sample.cpu_percent);
                max_ram = max_ram.max(sample.ram_mib);
                sample_count += 1;
            }
        }

        // Guaranteed by the RunResult constructor but averaging over nothing would produce NaN.
        anyhow::ensure!(sample_count > 0, "Cannot summarise runs without samples");

        let run_count = runs.len() as f64;
        let sample_count = sample_count as f64;

        Ok(Self {
            avg_cpu: total_cpu / sample_count,
            max_cpu,
            avg_ram: total_ram / sample_count,
            max_ram,
            avg_duration: total_duration / run_count,
            avg_repo_size: total_repo_size / run_count,
            avg_file_count: total_files / run_count,
            avg_counters: counters
                .iter()
                .zip(total_counters)
                .map(|(counter, total)| (counter.field.clone(), total / run_count))
                .collect(),
        })
    }

    /// Every scalar of this summary under the name it is compared by.
    pub fn metrics(&self) -> Vec<(String, f64)> {
        let mut metrics = vec![
            ("duration".to_string(), self.avg_duration),
            ("repo_size".to_string(), self.avg_repo_size),
            ("num_files".to_string(), self.avg_file_count),
        ];
        metrics.extend(self.avg_counters.iter().cloned());
        metrics.extend([
            ("avg_ram".to_string(), self.avg_ram),
            ("max_ram".to_string(), self.max_ram),
            ("avg_cpu".to_string(), self.avg_cpu),
            ("max_cpu".to_string(), self.max_cpu),
        ]);
        metrics
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    pub(crate) fn sample(cpu_percent: f64, ram_mib: f64) -> Sample {
        Sample {
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            cpu_percent,
            ram_mib,
            metrics_payload: None,
        }
    }

    pub(crate) fn run(
        duration_ms: u64,
        repo_size_bytes: u64,
        heap_bytes: Option<f64>,
        samples: Vec<Sample>,
    ) -> RunResult {
        let mut counters = HashMap::new();
        if let Some(v) = heap_bytes {
            counters.insert("go_memstats_alloc_bytes_total".to_string(), v);
        }
        RunResult::new(
            1,
            Duration::from_millis(duration_ms),
            10,
            repo_size_bytes,
            counters,
            samples,
        )
        .unwrap()
    }

    #[test]
    fn test_run_result_requires_samples() {
        let result = RunResult::new(
            42,
            Duration::from_millis(5),
            0,
            0,
            HashMap::new(),
            vec![],
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            "no samples collected for process 42"
        );
    }

    #[test]
    fn test_should_summarize_runs() {
        let runs = vec![
            run(
                1000,
                100,
                Some(400.0),
                vec![sample(10.0, 50.0), sample(30.0, 70.0)],
            ),
            run(3000, 300, None, vec![sample(50.0, 60.0)]),
        ];

        let summary = RunSummary::summarize(&runs, &TrackedCounter::defaults()).unwrap();

        assert_eq!(
            summary,
            RunSummary {
                avg_cpu: 30.0,
                max_cpu: 50.0,
                avg_ram: 60.0,
                max_ram: 70.0,
                avg_duration: 2.0,
                avg_repo_size: 200.0,
                avg_file_count: 10.0,
                avg_counters: vec![
                    ("avg_heap_objects".to_string(), 0.0),
                    ("avg_heap_bytes".to_string(), 200.0),
                ],
            }
        );
    }

    #[test]
    fn test_should_not_summarize_empty_runs() {
        assert!(RunSummary::summarize(&[], &[]).is_err());
    }

    #[test]
    fn test_resummarizing_averages_is_stable() {
        let counters = TrackedCounter::defaults();
        let runs = vec![
            run(1500, 120, Some(10.0), vec![sample(20.0, 40.0)]),
            run(2500, 80, Some(30.0), vec![sample(40.0, 80.0)]),
        ];
        let summary = RunSummary::summarize(&runs, &counters).unwrap();
        assert_eq!(summary, RunSummary::summarize(&runs, &counters).unwrap());

        // Runs that each sit exactly on the averages reduce to the same summary again
        let averaged = vec![
            run(
                (summary.avg_duration * 1000.0) as u64,
                summary.avg_repo_size as u64,
                Some(summary.avg_counters[1].1),
                vec![sample(summary.avg_cpu, summary.avg_ram)],
            );
            2
        ];
        let resummarized = RunSummary::summarize(&averaged, &counters).unwrap();

        assert_eq!(resummarized.avg_duration, summary.avg_duration);
        assert_eq!(resummarized.avg_repo_size, summary.avg_repo_size);
        assert_eq!(resummarized.avg_cpu, summary.avg_cpu);
        assert_eq!(resummarized.avg_ram, summary.avg_ram);
        assert_eq!(resummarized.avg_counters, summary.avg_counters);
    }

    #[test]
    fn test_metrics_are_listed_in_comparison_order() {
        let summary =
            RunSummary::summarize(&[run(1000, 1, None, vec![sample(1.0, 1.0)])], &[]).unwrap();
        let names = summary
            .metrics()
            .into_iter()
            .map(|(name, _)| name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "duration",
                "repo_size",
                "num_files",
                "avg_ram",
                "max_ram",
                "avg_cpu",
                "max_cpu"
            ]
        );
    }
}
