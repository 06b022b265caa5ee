mod aggregate;
mod build_info;
mod cli;
mod init;
mod monitor;
mod process;
mod repo;
mod run;
mod scenario;
mod types;

pub mod prelude {
    pub use crate::aggregate::{run_repeated, Benchmark};
    pub use crate::build_info::{parse_go_build_info, BuildIdentity, GoBuildInfo};
    pub use crate::cli::RunbenchCli;
    pub use crate::init::{init, init_logging, LOG_FILE_ENV};
    pub use crate::monitor::{MetricsScraper, ProcessMonitor, ProcessUsage, SAMPLE_INTERVAL};
    pub use crate::process::{run_and_sample, RunOutcome};
    pub use crate::repo::{summarize_dir, RepoSummary};
    pub use crate::run::{output_file, run};
    pub use crate::scenario::{scenario_name, ScenarioSpec, COLLECT_METRICS_MARKER};
    pub use crate::types::RunbenchResult;
}
