use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{TimeDelta, Utc};
use runbench_core::prelude::{BenchConfig, ExitStatusError, LaunchSpec, OutputTarget};
use runbench_instruments::{
    summary_records, write_comparison, ComparisonFormat, InfluxFileReporter, RecordTags,
};
use runbench_summary_model::{ComparisonReport, RunResult, RunSummary};

use crate::aggregate::{run_repeated, Benchmark};
use crate::build_info::BuildIdentity;
use crate::monitor::MetricsScraper;
use crate::process::run_and_sample;
use crate::scenario::{self, scenario_name, ScenarioSpec};
use crate::types::RunbenchResult;

/// Run every scenario in turn with the given configuration.
///
/// Scenarios are processed one at a time and the first failure stops the whole run.
pub async fn run(config: &BenchConfig, scenarios: &[PathBuf]) -> RunbenchResult<()> {
    let identity = BuildIdentity::resolve(config).await?;
    let scraper = MetricsScraper::new(config.metrics_url())?;

    for scenario_file in scenarios {
        run_scenario(config, &identity, &scraper, scenario_file)
            .await
            .with_context(|| format!("Scenario {} failed", scenario_file.display()))?;
    }

    Ok(())
}

/// The file a scenario's records are written to, `None` when writing to stdout.
pub fn output_file(
    config: &BenchConfig,
    identity: &BuildIdentity,
    scenario: &str,
) -> Option<PathBuf> {
    match &config.output {
        OutputTarget::Dir(dir) => Some(dir.join(scenario).join(format!(
            "{}-{}.line",
            identity.time.format("%Y-%m-%d_%H%M%S"),
            identity.revision
        ))),
        OutputTarget::Stdout => None,
    }
}

async fn run_scenario(
    config: &BenchConfig,
    identity: &BuildIdentity,
    scraper: &MetricsScraper,
    scenario_file: &Path,
) -> RunbenchResult<()> {
    let scenario = scenario_name(scenario_file);
    let output_file = output_file(config, identity, &scenario);

    log::info!("Running benchmark:");
    log::info!("   scenario {}", scenario_file.display());
    log::info!("   executable {}", config.bench_exe.display());
    log::info!(
        "   revision {} ({}) modified: {}",
        identity.revision,
        identity.time,
        identity.modified
    );
    if let Some(path) = &output_file {
        log::info!("   output file {}", path.display());
    }

    if let Some(path) = &output_file {
        if path.exists() && !config.force && config.compare_exe.is_none() {
            log::info!("Output already exists and --force not passed, skipping");
            return Ok(());
        }
    }

    let spec = ScenarioSpec::from_file(scenario_file, config)?;

    // Shift sample timestamps so that runs of the same revision cluster around its reference time
    let time_offset = identity.time - Utc::now();

    let runs = ScenarioBenchmark::new(
        config,
        scenario_file,
        scraper,
        &spec.exe,
        &spec.args,
        time_offset,
    )
    .run()
    .await?;
    let summary = RunSummary::summarize(&runs, &config.counters)?;

    if let Some(compare_exe) = &config.compare_exe {
        let baseline_runs = ScenarioBenchmark::new(
            config,
            scenario_file,
            scraper,
            compare_exe,
            &spec.args,
            time_offset,
        )
        .run()
        .await?;
        let baseline = RunSummary::summarize(&baseline_runs, &config.counters)?;

        let format = if config.json {
            ComparisonFormat::Json
        } else {
            ComparisonFormat::Lines
        };
        return write_comparison(
            std::io::stdout().lock(),
            &ComparisonReport::new(&summary, &baseline),
            format,
        );
    }

    let tags = RecordTags {
        scenario,
        revision: identity.revision.clone(),
        modified: identity.modified,
        reference_time: identity.time,
        run_tags: config.run_tags.clone(),
    };
    let records = summary_records(&summary, &tags)?;

    match output_file {
        Some(path) => InfluxFileReporter::create(path)?.write_all(records),
        None => InfluxFileReporter::new(std::io::stdout().lock()).write_all(records),
    }
}

/// One scenario measured with one executable.
struct ScenarioBenchmark<'a> {
    scenario_file: &'a Path,
    prepare_env: Vec<(String, String)>,
    launch: LaunchSpec,
    repo_path: Option<&'a Path>,
    scraper: &'a MetricsScraper,
    config: &'a BenchConfig,
    time_offset: TimeDelta,
}

impl<'a> ScenarioBenchmark<'a> {
    fn new(
        config: &'a BenchConfig,
        scenario_file: &'a Path,
        scraper: &'a MetricsScraper,
        exe: &Path,
        args: &[String],
        time_offset: TimeDelta,
    ) -> Self {
        Self {
            scenario_file,
            prepare_env: config.prepare_env(),
            launch: config.launch_spec(exe, args),
            repo_path: config.repo_path.as_deref(),
            scraper,
            config,
            time_offset,
        }
    }

    async fn run(mut self) -> RunbenchResult<Vec<RunResult>> {
        let policy = self.config.repeat;
        run_repeated(&mut self, &policy).await
    }
}

impl Benchmark for ScenarioBenchmark<'_> {
    fn name(&self) -> String {
        self.launch.exe.display().to_string()
    }

    async fn prepare(&mut self) -> RunbenchResult<()> {
        scenario::prepare(self.scenario_file, &self.prepare_env).await
    }

    async fn run_once(&mut self) -> RunbenchResult<RunResult> {
        let outcome = run_and_sample(
            &self.launch,
            self.repo_path,
            self.scraper,
            &self.config.counters,
            self.time_offset,
        )
        .await?;

        if !outcome.status.success() {
            return Err(ExitStatusError::new(
                self.launch.exe.clone(),
                outcome.status.to_string(),
            )
            .into());
        }

        Ok(outcome.result)
    }
}
