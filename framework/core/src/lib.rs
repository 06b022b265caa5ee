mod config;
mod error;

pub mod prelude {
    pub use crate::config::{
        parse_run_tags, BenchConfig, LaunchSpec, OutputTarget, RepeatPolicy, RunTag,
        TrackedCounter, BENCH_EXE_VAR, REPO_PATH_VAR,
    };
    pub use crate::error::{
        CounterSpecError, ExitStatusError, NoSamplesError, PrepareError, RunTagError,
        ScenarioError,
    };
}
