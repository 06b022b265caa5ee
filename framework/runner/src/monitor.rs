use std::time::{Duration, Instant};

use anyhow::Context;
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

/// Interval between two samples of the measured process.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Bound on a single scrape of the metrics endpoint.
pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(1);

/// CPU and memory usage of a process at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessUsage {
    /// Relative to a single core, so a busy multi-threaded process can go above 100%.
    pub cpu_percent: f64,
    pub ram_mib: f64,
}

/// Reads the resource usage of a single process.
///
/// CPU usage is the CPU time the process accumulated since the previous sample divided by the
/// wall time in between. The first sample is measured from when the process was started.
pub struct ProcessMonitor {
    pid: Pid,
    system: System,
    refresh_kind: ProcessRefreshKind,
    last_sampled_at: Instant,
    last_cpu_time_ms: u64,
}

impl ProcessMonitor {
    pub fn new(pid: u32, started: Instant) -> Self {
        Self {
            pid: Pid::from_u32(pid),
            system: System::new(),
            refresh_kind: ProcessRefreshKind::nothing().with_cpu().with_memory(),
            last_sampled_at: started,
            last_cpu_time_ms: 0,
        }
    }

    /// Take a sample, or `None` once the process can no longer be inspected.
    ///
    /// There is no distinction between a process that has exited and one that could not be read
    /// for any other reason. This reads `/proc` synchronously.
    pub fn sample(&mut self) -> Option<ProcessUsage> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            self.refresh_kind,
        );

        let now = Instant::now();
        let process = self.system.process(self.pid)?;
        if matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead) {
            return None;
        }

        let cpu_time_ms = process.accumulated_cpu_time();
        let cpu_percent = cpu_percent(
            cpu_time_ms.saturating_sub(self.last_cpu_time_ms),
            now.saturating_duration_since(self.last_sampled_at),
        );
        self.last_sampled_at = now;
        self.last_cpu_time_ms = cpu_time_ms;

        Some(ProcessUsage {
            cpu_percent,
            ram_mib: process.memory() as f64 / (1 << 20) as f64,
        })
    }
}

/// CPU usage of `cpu_time_ms` of CPU time spent over `wall` of elapsed time.
fn cpu_percent(cpu_time_ms: u64, wall: Duration) -> f64 {
    let wall_ms = wall.as_secs_f64() * 1000.0;
    if wall_ms <= 0.0 {
        return 0.0;
    }
    cpu_time_ms as f64 / wall_ms * 100.0
}

/// Best effort scraper for the measured process's metrics endpoint.
pub struct MetricsScraper {
    client: reqwest::Client,
    url: String,
}

impl MetricsScraper {
    pub fn new(url: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(SCRAPE_TIMEOUT)
            .build()
            .context("Failed to build metrics client")?;

        Ok(Self { client, url })
    }

    /// Fetch the raw metrics payload. Any failure just means there is no payload for this sample.
    pub async fn scrape(&self) -> Option<Vec<u8>> {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                log::trace!("Metrics scrape of {} failed: {e}", self.url);
                return None;
            }
        };

        match response.bytes().await {
            Ok(body) => Some(body.to_vec()),
            Err(e) => {
                log::trace!("Reading metrics from {} failed: {e}", self.url);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_sample_own_process() {
        let mut monitor = ProcessMonitor::new(std::process::id(), Instant::now());

        let usage = monitor.sample().expect("Failed to sample own process");
        assert!(usage.ram_mib > 0.0);
        assert!(usage.cpu_percent >= 0.0);
    }

    #[test]
    fn test_should_not_sample_missing_process() {
        // Larger than any default pid_max
        let mut monitor = ProcessMonitor::new(u32::MAX - 1, Instant::now());
        assert!(monitor.sample().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_first_sample_of_busy_process_reports_cpu() {
        let started = Instant::now();
        let mut child = std::process::Command::new("sh")
            .args(["-c", "while :; do :; done"])
            .spawn()
            .unwrap();
        std::thread::sleep(Duration::from_millis(300));

        let mut monitor = ProcessMonitor::new(child.id(), started);
        let first = monitor.sample();

        child.kill().unwrap();
        child.wait().unwrap();

        let first = first.expect("Failed to sample busy process");
        assert!(first.cpu_percent > 0.0, "got {}", first.cpu_percent);
        assert!(first.cpu_percent <= 100.0, "got {}", first.cpu_percent);
    }

    #[test]
    fn test_cpu_percent_of_elapsed_time() {
        assert_eq!(cpu_percent(50, Duration::from_millis(100)), 50.0);
        assert_eq!(cpu_percent(200, Duration::from_millis(100)), 200.0);
        assert_eq!(cpu_percent(10, Duration::ZERO), 0.0);
    }

    #[tokio::test]
    async fn test_failed_scrape_has_no_payload() {
        // Nothing listens on port 1, the connection is refused
        let scraper = MetricsScraper::new("http://localhost:1/metrics".to_string()).unwrap();
        assert!(scraper.scrape().await.is_none());
    }
}
