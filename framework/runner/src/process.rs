use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use anyhow::Context;
use chrono::{TimeDelta, Utc};
use runbench_core::prelude::{LaunchSpec, TrackedCounter};
use runbench_instruments::last_positive_counters;
use runbench_summary_model::{RunResult, Sample};

use crate::monitor::{MetricsScraper, ProcessMonitor, SAMPLE_INTERVAL};
use crate::repo::summarize_dir;
use crate::types::RunbenchResult;

/// A completed run along with how the measured process exited.
///
/// An unsuccessful exit is not an error at this level, callers decide what to do with it.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: RunResult,
    pub status: ExitStatus,
}

/// Start the process described by `launch` and sample it until it exits.
///
/// Waiting for the process and sampling it happen concurrently. Sampling stops as soon as the
/// process can't be inspected anymore, so the last few samples before exit may be missing.
/// Sample timestamps are shifted by `time_offset`.
///
/// Once both have finished the repository at `repo_path`, if any, is summarised. A run that
/// ended before a single sample was taken is an error.
pub async fn run_and_sample(
    launch: &LaunchSpec,
    repo_path: Option<&Path>,
    scraper: &MetricsScraper,
    counters: &[TrackedCounter],
    time_offset: TimeDelta,
) -> RunbenchResult<RunOutcome> {
    let started = Instant::now();

    let mut child = tokio::process::Command::new(&launch.exe)
        .args(&launch.args)
        .envs(launch.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Unable to start {}", launch.exe.display()))?;

    let pid = child
        .id()
        .context("Unable to attach to process, it has already been reaped")?;
    log::debug!("Started {} with pid {pid}", launch.exe.display());

    let wait_handle = tokio::spawn(async move {
        let status = child.wait().await;
        (status, started.elapsed())
    });

    let samples = sample_until_exit(pid, started, scraper, time_offset).await;

    let (status, duration) = wait_handle.await.context("Process wait task failed")?;
    let status = status.with_context(|| format!("Failed to wait for process {pid}"))?;
    let samples = samples?;

    log::debug!(
        "Process {pid} exited with {status} after {duration:?}, {} samples",
        samples.len()
    );

    let observed = last_positive_counters(
        samples.iter().filter_map(|s| s.metrics_payload.as_deref()),
        counters,
    );

    let repo = match repo_path {
        Some(path) => summarize_dir(path).context("Error summarizing repository")?,
        None => Default::default(),
    };

    // Fails with `NoSamplesError` if the process exited before the first sample
    let result = RunResult::new(
        pid,
        duration,
        repo.file_count,
        repo.size_bytes,
        observed,
        samples,
    )?;

    Ok(RunOutcome { result, status })
}

async fn sample_until_exit(
    pid: u32,
    started: Instant,
    scraper: &MetricsScraper,
    time_offset: TimeDelta,
) -> RunbenchResult<Vec<Sample>> {
    let mut monitor = ProcessMonitor::new(pid, started);
    let mut samples = Vec::new();

    loop {
        let timestamp = Utc::now() + time_offset;

        let (returned, usage) = tokio::task::spawn_blocking(move || {
            let usage = monitor.sample();
            (monitor, usage)
        })
        .await
        .context("Process sampling task failed")?;
        monitor = returned;

        let Some(usage) = usage else {
            break;
        };

        samples.push(Sample {
            timestamp,
            cpu_percent: usage.cpu_percent,
            ram_mib: usage.ram_mib,
            metrics_payload: scraper.scrape().await,
        });

        tokio::time::sleep(SAMPLE_INTERVAL).await;
    }

    Ok(samples)
}
