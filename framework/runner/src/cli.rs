use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use runbench_core::prelude::{
    parse_run_tags, BenchConfig, OutputTarget, RepeatPolicy, TrackedCounter,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct RunbenchCli {
    /// Path to the executable under test. `~` and environment variables are expanded.
    #[clap(long, default_value = "$HOME/go/bin/kopia")]
    pub bench_exe: String,

    /// Path to a baseline executable to compare against.
    ///
    /// When set, each scenario is also run with this executable and a comparison is printed
    /// instead of writing summary records.
    #[clap(long)]
    pub compare_to_exe: Option<PathBuf>,

    /// Path to the repository directory the workload writes to. Pass an empty string to skip
    /// summarising it.
    #[clap(long, default_value = "/tmp/runbench-repo")]
    pub repo_path: String,

    /// Output directory for summary records, or `-` to write them to stdout.
    #[clap(long, default_value = "/tmp/runbench-outputs")]
    pub output_dir: String,

    /// Override the benchmark reference timestamp, in seconds since the Unix epoch.
    #[clap(long)]
    pub timestamp: Option<i64>,

    /// Override the revision of the executable under test. Skips reading its build info.
    #[clap(long)]
    pub revision: Option<String>,

    /// Run even if the output already exists, overwriting it.
    #[clap(long, default_value = "false")]
    pub force: bool,

    /// Repeat scenarios until they have run for at least this many seconds in total.
    #[clap(long, default_value = "120")]
    pub min_duration: u64,

    /// Repeat scenarios at least this many times.
    #[clap(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..))]
    pub min_repeat: u32,

    /// Comma-separated list of `key=value` tags to attach to every record.
    #[clap(long, default_value = "")]
    pub run_tags: String,

    /// A counter to read from the metrics endpoint and the field to report its average as, in the
    /// format `counter_name=field_name`. For example
    /// `--counter=go_gc_duration_seconds_count=avg_gc_count`.
    ///
    /// You can track multiple counters by using the flag multiple times. If none are given then the
    /// Go heap allocation counters are tracked.
    #[clap(long = "counter")]
    pub counters: Vec<TrackedCounter>,

    /// Local port the measured executable exposes its metrics on.
    #[clap(long, default_value = "6666")]
    pub metrics_port: u16,

    /// Flag passed to the measured executable to make it listen for metrics scrapes, as
    /// `<flag>=:<port>`. Pass an empty string to not pass any flag.
    #[clap(long, default_value = "--metrics-listen-addr", allow_hyphen_values = true)]
    pub metrics_listen_flag: String,

    /// Print a comparison as JSON instead of one line per metric.
    #[clap(long, default_value = "false")]
    pub json: bool,

    /// Do not ship logs to the file named by `RUNBENCH_LOG_FILE`, log to stderr instead.
    #[clap(long, default_value = "false")]
    pub disable_log_shipping: bool,

    /// Scenario scripts to run, in order.
    #[clap(required = true)]
    pub scenarios: Vec<PathBuf>,
}

impl RunbenchCli {
    /// Validate the arguments and turn them into the configuration used by the whole run.
    pub fn to_config(&self) -> anyhow::Result<BenchConfig> {
        let bench_exe = shellexpand::full(&self.bench_exe)
            .with_context(|| format!("Failed to expand executable path '{}'", self.bench_exe))?;

        let output = match self.output_dir.as_str() {
            "-" => OutputTarget::Stdout,
            "" => anyhow::bail!("Output directory must not be empty, use '-' for stdout"),
            dir => OutputTarget::Dir(PathBuf::from(dir)),
        };

        let counters = if self.counters.is_empty() {
            TrackedCounter::defaults()
        } else {
            self.counters.clone()
        };

        Ok(BenchConfig {
            bench_exe: PathBuf::from(bench_exe.as_ref()),
            compare_exe: self.compare_to_exe.clone(),
            repo_path: (!self.repo_path.is_empty()).then(|| PathBuf::from(&self.repo_path)),
            output,
            timestamp: self.timestamp,
            revision: self.revision.clone(),
            force: self.force,
            repeat: RepeatPolicy {
                min_duration: Duration::from_secs(self.min_duration),
                min_repeat: self.min_repeat as usize,
            },
            run_tags: parse_run_tags(&self.run_tags)?,
            counters,
            metrics_port: self.metrics_port,
            metrics_listen_flag: (!self.metrics_listen_flag.is_empty())
                .then(|| self.metrics_listen_flag.clone()),
            json: self.json,
        })
    }
}
