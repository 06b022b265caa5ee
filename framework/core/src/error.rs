use std::path::PathBuf;

/// A scenario file could not be turned into a command line to measure.
///
/// These are fatal for the whole invocation, not just for the scenario that failed to parse.
#[derive(derive_more::Error, derive_more::Display, Debug, PartialEq)]
pub enum ScenarioError {
    #[display("expected {path:?} to have exactly one marked command line, got {count}")]
    MarkerCount { path: PathBuf, count: usize },
    #[display("unable to split command line in {path:?}: {line}")]
    Split { path: PathBuf, line: String },
    #[display("marked command line in {path:?} is empty")]
    EmptyCommand { path: PathBuf },
}

/// The measured process exited before the first sample could be taken.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("no samples collected for process {pid}")]
pub struct NoSamplesError {
    pid: u32,
}

impl NoSamplesError {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }
}

/// The scenario's preparation step failed, every later measurement would be invalid.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("preparing {scenario:?} failed with {status}: {output}")]
pub struct PrepareError {
    scenario: PathBuf,
    status: String,
    output: String,
}

impl PrepareError {
    pub fn new(scenario: PathBuf, status: String, output: String) -> Self {
        Self {
            scenario,
            status,
            output,
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("{exe:?} exited with {status}")]
pub struct ExitStatusError {
    exe: PathBuf,
    status: String,
}

impl ExitStatusError {
    pub fn new(exe: PathBuf, status: String) -> Self {
        Self { exe, status }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug, PartialEq)]
#[display("run tag must be in the form key=value, got '{tag}'")]
pub struct RunTagError {
    tag: String,
}

impl RunTagError {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug, PartialEq)]
#[display("counter must be in the form counter_name=field_name, got '{spec}'")]
pub struct CounterSpecError {
    spec: String,
}

impl CounterSpecError {
    pub(crate) fn new(spec: &str) -> Self {
        Self {
            spec: spec.to_string(),
        }
    }
}
