use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use runbench_core::prelude::RepeatPolicy;
use runbench_summary_model::RunResult;
use tokio::time::Instant;

use crate::types::RunbenchResult;

/// Something that can be measured repeatedly.
pub trait Benchmark {
    /// A short description for log messages.
    fn name(&self) -> String;

    /// Restore the preconditions for the next run. Called before every run.
    fn prepare(&mut self) -> impl Future<Output = RunbenchResult<()>>;

    /// Perform one measured run.
    fn run_once(&mut self) -> impl Future<Output = RunbenchResult<RunResult>>;
}

/// Run `benchmark` until the total run time and the number of runs both satisfy `policy`.
///
/// The first run is a warmup and is dropped from the returned results, unless it is the only run.
/// Any failure, including a failed preparation, aborts the whole sequence.
pub async fn run_repeated<B>(
    benchmark: &mut B,
    policy: &RepeatPolicy,
) -> RunbenchResult<Vec<RunResult>>
where
    B: Benchmark,
{
    let mut runs = Vec::new();
    let mut total_duration = Duration::ZERO;
    let mut total_count = 0;

    loop {
        log::info!(
            "Run #{} ({}), total duration {:?}",
            total_count + 1,
            benchmark.name(),
            total_duration
        );

        log::info!("  preparing...");
        benchmark
            .prepare()
            .await
            .with_context(|| format!("Preparing run #{} failed", total_count + 1))?;

        log::info!("  running...");
        let started = Instant::now();
        let run = benchmark.run_once().await?;
        total_duration += started.elapsed();
        total_count += 1;

        log::info!(
            "  completed in {:?}, repo size: {} bytes in {} files",
            run.duration,
            run.repo_size_bytes,
            run.repo_file_count
        );
        log::debug!("  counters: {:?}", run.counters);

        runs.push(run);

        if policy.is_satisfied(total_duration, total_count) {
            break;
        }
    }

    if runs.len() > 1 {
        // Discard the warmup run
        runs.remove(0);
    }

    Ok(runs)
}
