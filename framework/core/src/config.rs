use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CounterSpecError, RunTagError};

/// Environment variable holding the executable under test, for both the scenario's preparation
/// step and the marked command line.
pub const BENCH_EXE_VAR: &str = "BENCH_EXE";

/// Environment variable holding the repository path the workload writes to.
pub const REPO_PATH_VAR: &str = "REPO_PATH";

/// Where summary records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// One file per scenario and revision under this directory.
    Dir(PathBuf),
    Stdout,
}

/// The stopping rule for repeated runs. Runs continue until both minimums are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatPolicy {
    pub min_duration: Duration,
    pub min_repeat: usize,
}

impl RepeatPolicy {
    pub fn is_satisfied(&self, total_duration: Duration, total_count: usize) -> bool {
        total_duration >= self.min_duration && total_count >= self.min_repeat
    }
}

/// A free-form `key=value` tag attached to every emitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTag {
    pub key: String,
    pub value: String,
}

impl FromStr for RunTag {
    type Err = RunTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(RunTagError::new(s)),
        }
    }
}

/// Parse a comma separated list of `key=value` tags. Empty entries are ignored.
pub fn parse_run_tags(s: &str) -> Result<Vec<RunTag>, RunTagError> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(RunTag::from_str)
        .collect()
}

/// A counter scraped from the metrics endpoint and the field name it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedCounter {
    pub name: String,
    pub field: String,
}

impl TrackedCounter {
    pub fn new(name: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
        }
    }

    /// Heap counters exposed by Go programs through the Prometheus client.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("go_memstats_mallocs_total", "avg_heap_objects"),
            Self::new("go_memstats_alloc_bytes_total", "avg_heap_bytes"),
        ]
    }
}

impl FromStr for TrackedCounter {
    type Err = CounterSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, field)) if !name.is_empty() && !field.is_empty() => {
                Ok(Self::new(name, field))
            }
            _ => Err(CounterSpecError::new(s)),
        }
    }
}

/// Everything needed to start one measured process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub exe: PathBuf,
    pub args: Vec<String>,
    /// Added on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

/// The immutable configuration for a whole invocation.
///
/// Built once from the command line and handed to every component by reference.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub bench_exe: PathBuf,
    pub compare_exe: Option<PathBuf>,
    /// `None` disables the repository summary, counts are then reported as zero.
    pub repo_path: Option<PathBuf>,
    pub output: OutputTarget,
    /// Unix seconds, overrides the reference time reported by the executable's build info.
    pub timestamp: Option<i64>,
    /// Skips the build info probe when set.
    pub revision: Option<String>,
    pub force: bool,
    pub repeat: RepeatPolicy,
    pub run_tags: Vec<RunTag>,
    pub counters: Vec<TrackedCounter>,
    pub metrics_port: u16,
    /// Flag the measured executable accepts to expose its metrics, e.g. `--metrics-listen-addr`.
    pub metrics_listen_flag: Option<String>,
    pub json: bool,
}

impl BenchConfig {
    pub fn metrics_url(&self) -> String {
        format!("http://localhost:{}/metrics", self.metrics_port)
    }

    pub fn repo_path_str(&self) -> String {
        self.repo_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    /// Environment for the scenario's preparation step. It always sees the executable under test,
    /// even when the baseline executable is being measured.
    pub fn prepare_env(&self) -> Vec<(String, String)> {
        vec![
            (
                BENCH_EXE_VAR.to_string(),
                self.bench_exe.display().to_string(),
            ),
            (REPO_PATH_VAR.to_string(), self.repo_path_str()),
        ]
    }

    /// Build the launch specification for one measured run of `exe`.
    pub fn launch_spec(&self, exe: &Path, args: &[String]) -> LaunchSpec {
        let mut all_args = Vec::with_capacity(args.len() + 1);
        if let Some(flag) = &self.metrics_listen_flag {
            all_args.push(format!("{flag}=:{}", self.metrics_port));
        }
        all_args.extend(args.iter().cloned());

        LaunchSpec {
            exe: exe.to_path_buf(),
            args: all_args,
            env: vec![
                (BENCH_EXE_VAR.to_string(), exe.display().to_string()),
                (REPO_PATH_VAR.to_string(), self.repo_path_str()),
            ],
        }
    }
}
