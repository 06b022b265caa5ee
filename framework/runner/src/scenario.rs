use std::path::{Path, PathBuf};

use anyhow::Context;
use runbench_core::prelude::{
    BenchConfig, PrepareError, ScenarioError, BENCH_EXE_VAR, REPO_PATH_VAR,
};

use crate::types::RunbenchResult;

/// Prefix of the single line in a scenario script that holds the command to measure.
///
/// Because the quoted string is never empty, the shell skips the command when the script itself
/// runs as the preparation step.
pub const COLLECT_METRICS_MARKER: &str = r#"[ -z "COLLECT_METRICS" ] && "#;

/// The command a scenario measures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSpec {
    pub exe: PathBuf,
    pub args: Vec<String>,
}

impl ScenarioSpec {
    /// Read and parse a scenario file.
    pub fn from_file(path: &Path, config: &BenchConfig) -> RunbenchResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;

        Ok(Self::parse(
            path,
            &content,
            &config.bench_exe.display().to_string(),
            &config.repo_path_str(),
        )?)
    }

    /// Extract the marked command from `content` and split it into an executable and arguments.
    ///
    /// `$BENCH_EXE` and `$REPO_PATH` are replaced with the given values, any other variable is
    /// taken from the environment, or replaced with nothing if it isn't set. Splitting follows
    /// shell quoting rules.
    pub fn parse(
        path: &Path,
        content: &str,
        bench_exe: &str,
        repo_path: &str,
    ) -> Result<Self, ScenarioError> {
        let lines = content
            .lines()
            .filter_map(|line| line.strip_prefix(COLLECT_METRICS_MARKER))
            .collect::<Vec<_>>();

        let [line] = lines.as_slice() else {
            return Err(ScenarioError::MarkerCount {
                path: path.to_path_buf(),
                count: lines.len(),
            });
        };

        let expanded = shellexpand::env_with_context_no_errors(line, |var| match var {
            BENCH_EXE_VAR => Some(bench_exe.to_string()),
            REPO_PATH_VAR => Some(repo_path.to_string()),
            other => Some(std::env::var(other).unwrap_or_default()),
        });

        let mut parts = shlex::split(&expanded)
            .ok_or_else(|| ScenarioError::Split {
                path: path.to_path_buf(),
                line: line.to_string(),
            })?
            .into_iter();

        let exe = parts.next().ok_or_else(|| ScenarioError::EmptyCommand {
            path: path.to_path_buf(),
        })?;

        Ok(Self {
            exe: PathBuf::from(exe),
            args: parts.collect(),
        })
    }
}

/// The scenario name is the file name without its `.sh` extension.
pub fn scenario_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    file_name
        .strip_suffix(".sh")
        .map(ToString::to_string)
        .unwrap_or(file_name)
}

/// Run the scenario script itself to prepare for the next measured run.
///
/// The marked command is skipped by the shell so only the setup lines run.
pub async fn prepare(scenario_file: &Path, env: &[(String, String)]) -> RunbenchResult<()> {
    let output = tokio::process::Command::new(scenario_file)
        .envs(env.iter().map(|(k, v)| (k, v)))
        .output()
        .await
        .with_context(|| format!("Failed to run scenario {}", scenario_file.display()))?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        return Err(PrepareError::new(
            scenario_file.to_path_buf(),
            output.status.to_string(),
            combined,
        )
        .into());
    }

    Ok(())
}
