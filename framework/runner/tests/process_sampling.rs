#![cfg(unix)]

use chrono::TimeDelta;
use runbench_core::prelude::{LaunchSpec, TrackedCounter};
use runbench_runner::prelude::{run_and_sample, MetricsScraper};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn shell(script: &str) -> LaunchSpec {
    LaunchSpec {
        exe: "sh".into(),
        args: vec!["-c".to_string(), script.to_string()],
        env: vec![],
    }
}

fn dead_scraper() -> MetricsScraper {
    MetricsScraper::new("http://127.0.0.1:1/metrics".to_string()).unwrap()
}

/// Serve `body` to every request until the test ends.
async fn serve_metrics(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}/metrics")
}

#[tokio::test(flavor = "multi_thread")]
async fn sample_process_and_summarize_repo() {
    let repo = tempfile::tempdir().unwrap();
    std::fs::write(repo.path().join("blob"), [0u8; 64]).unwrap();
    std::fs::create_dir(repo.path().join("index")).unwrap();
    std::fs::write(repo.path().join("index").join("0"), [0u8; 16]).unwrap();

    let outcome = run_and_sample(
        &shell("sleep 0.5"),
        Some(repo.path()),
        &dead_scraper(),
        &TrackedCounter::defaults(),
        TimeDelta::zero(),
    )
    .await
    .unwrap();

    assert!(outcome.status.success());
    assert!(!outcome.result.samples().is_empty());
    assert!(outcome.result.duration.as_millis() >= 500);
    assert_eq!(outcome.result.repo_file_count, 2);
    assert_eq!(outcome.result.repo_size_bytes, 80);
    assert!(outcome.result.counters.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unsuccessful_exit_is_returned() {
    let outcome = run_and_sample(
        &shell("sleep 0.3; exit 3"),
        None,
        &dead_scraper(),
        &[],
        TimeDelta::zero(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status.code(), Some(3));
    assert_eq!(outcome.result.repo_file_count, 0);
    assert_eq!(outcome.result.repo_size_bytes, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_executable_fails_to_start() {
    let launch = LaunchSpec {
        exe: "/non/existent/runbench-tool".into(),
        args: vec![],
        env: vec![],
    };

    let result = run_and_sample(&launch, None, &dead_scraper(), &[], TimeDelta::zero()).await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn collect_counters_from_metrics_endpoint() {
    let url = serve_metrics(
        "# HELP go_memstats_mallocs_total Total number of mallocs.\n\
         # TYPE go_memstats_mallocs_total counter\n\
         go_memstats_mallocs_total 42\n\
         go_memstats_alloc_bytes_total 0\n",
    )
    .await;
    let scraper = MetricsScraper::new(url).unwrap();

    let outcome = run_and_sample(
        &shell("sleep 0.4"),
        None,
        &scraper,
        &TrackedCounter::defaults(),
        TimeDelta::zero(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.result.counter("go_memstats_mallocs_total"), 42.0);
    // Never positive, so never recorded
    assert!(!outcome
        .result
        .counters
        .contains_key("go_memstats_alloc_bytes_total"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sample_timestamps_are_shifted() {
    let offset = TimeDelta::days(-30);
    let before = chrono::Utc::now();

    let outcome = run_and_sample(&shell("sleep 0.3"), None, &dead_scraper(), &[], offset)
        .await
        .unwrap();

    for sample in outcome.result.samples() {
        assert!(sample.timestamp < before);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn busy_process_reports_cpu_usage() {
    let outcome = run_and_sample(
        &shell("i=0; while [ $i -lt 1000000 ]; do i=$((i + 1)); done"),
        None,
        &dead_scraper(),
        &[],
        TimeDelta::zero(),
    )
    .await
    .unwrap();

    let cpu = outcome
        .result
        .samples()
        .iter()
        .map(|s| s.cpu_percent)
        .collect::<Vec<_>>();
    assert!(cpu.len() > 2, "got {cpu:?}");
    // Every sample after the first covers a full polling interval of the busy loop
    assert!(cpu[1] > 0.0, "got {cpu:?}");
    assert!(cpu.iter().cloned().fold(0.0, f64::max) > 50.0, "got {cpu:?}");
}
