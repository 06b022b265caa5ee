use std::path::{Path, PathBuf};

use anyhow::bail;
use anyhow::Context;
use chrono::{DateTime, Utc};
use runbench_core::prelude::BenchConfig;

use crate::types::RunbenchResult;

/// Revision reported when the executable doesn't embed one.
const UNKNOWN_REVISION: &str = "unknown";

/// Build information embedded in a Go binary by the toolchain.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GoBuildInfo {
    pub vcs_time: Option<DateTime<Utc>>,
    pub vcs_revision: Option<String>,
    pub vcs_modified: bool,
}

/// What a set of results is reported against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIdentity {
    pub revision: String,
    pub modified: bool,
    /// The reference time that samples are clustered around and records are stamped with.
    pub time: DateTime<Utc>,
}

impl BuildIdentity {
    /// Work out the identity of the executable under test.
    ///
    /// A `--revision` override skips reading the build info. A `--timestamp` override always
    /// replaces the reference time.
    pub async fn resolve(config: &BenchConfig) -> RunbenchResult<Self> {
        let timestamp = config
            .timestamp
            .map(|secs| {
                DateTime::from_timestamp(secs, 0)
                    .with_context(|| format!("Timestamp {secs} is out of range"))
            })
            .transpose()?;

        let info = match &config.revision {
            Some(revision) => GoBuildInfo {
                vcs_time: None,
                vcs_revision: Some(revision.clone()),
                vcs_modified: false,
            },
            None => go_build_info(&config.bench_exe).await?,
        };

        let time = match timestamp.or(info.vcs_time) {
            Some(time) => time,
            None => {
                log::warn!(
                    "No reference time for {}, using the current time",
                    config.bench_exe.display()
                );
                Utc::now()
            }
        };

        let revision = match info.vcs_revision {
            Some(revision) if !revision.is_empty() => revision,
            _ => {
                log::warn!("No revision found for {}", config.bench_exe.display());
                UNKNOWN_REVISION.to_string()
            }
        };

        Ok(Self {
            revision,
            modified: info.vcs_modified,
            time,
        })
    }
}

/// Get the path to the Go toolchain, which is used to read the build info of the executable.
pub fn go_path() -> RunbenchResult<PathBuf> {
    which::which("go").context(
        "Go binary not found in PATH. It is needed to read the build info of the executable \
         under test, pass '--revision' to skip it.",
    )
}

/// Get the build info of a Go executable by running `go version -m <exe>`.
pub async fn go_build_info(exe: &Path) -> RunbenchResult<GoBuildInfo> {
    let output = tokio::process::Command::new(go_path()?)
        .arg("version")
        .arg("-m")
        .arg(exe)
        .output()
        .await
        .context("Failed to execute 'go version -m' command")?;
    if !output.status.success() {
        bail!(
            "'go version -m {exe}' command failed with exit code: {status}",
            exe = exe.display(),
            status = output.status
        );
    }

    let output = String::from_utf8(output.stdout)
        .context("Failed to parse output of 'go version -m' command as UTF-8")?;

    parse_go_build_info(&output)
}

/// Parse the `build <key>=<value>` lines printed by `go version -m`.
pub fn parse_go_build_info(output: &str) -> RunbenchResult<GoBuildInfo> {
    let mut info = GoBuildInfo::default();

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() != Some("build") {
            continue;
        }
        let Some((key, value)) = fields.next().and_then(|f| f.split_once('=')) else {
            continue;
        };

        match key {
            "vcs.time" => {
                let time = DateTime::parse_from_rfc3339(value)
                    .with_context(|| format!("Invalid vcs.time '{value}'"))?;
                info.vcs_time = Some(time.with_timezone(&Utc));
            }
            "vcs.revision" => info.vcs_revision = Some(value.to_string()),
            "vcs.modified" => info.vcs_modified = value == "true",
            _ => {}
        }
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use runbench_core::prelude::{OutputTarget, RepeatPolicy};

    use super::*;

    const GO_VERSION_OUTPUT: &str = "/home/user/go/bin/kopia: go1.21.5
\tpath\tgithub.com/kopia/kopia
\tmod\tgithub.com/kopia/kopia\t(devel)\t
\tdep\tgithub.com/klauspost/compress\tv1.17.4\th1:Ej5ixsIri7BrIjBkRZLTo6ghwrEtHFk7ijlczPW4fZ4=
\tbuild\t-compiler=gc
\tbuild\tCGO_ENABLED=1
\tbuild\tvcs=git
\tbuild\tvcs.revision=3f4ae9b3f5c1c7ad0a3c1a0d5b4b7c2f8e9d1a2b
\tbuild\tvcs.time=2024-01-15T10:20:30Z
\tbuild\tvcs.modified=true
";

    fn test_config(revision: Option<&str>, timestamp: Option<i64>) -> BenchConfig {
        BenchConfig {
            bench_exe: PathBuf::from("/non/existent/tool"),
            compare_exe: None,
            repo_path: None,
            output: OutputTarget::Stdout,
            timestamp,
            revision: revision.map(ToString::to_string),
            force: false,
            repeat: RepeatPolicy {
                min_duration: Duration::ZERO,
                min_repeat: 1,
            },
            run_tags: vec![],
            counters: vec![],
            metrics_port: 6666,
            metrics_listen_flag: None,
            json: false,
        }
    }

    #[test]
    fn test_should_parse_go_build_info() {
        let info = parse_go_build_info(GO_VERSION_OUTPUT).unwrap();

        assert_eq!(
            info,
            GoBuildInfo {
                vcs_time: Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 20, 30).unwrap()),
                vcs_revision: Some("3f4ae9b3f5c1c7ad0a3c1a0d5b4b7c2f8e9d1a2b".to_string()),
                vcs_modified: true,
            }
        );
    }

    #[test]
    fn test_should_parse_build_info_without_vcs() {
        let info = parse_go_build_info("tool: go1.21.5\n\tbuild\t-compiler=gc\n").unwrap();
        assert_eq!(info, GoBuildInfo::default());
    }

    #[test]
    fn test_should_reject_invalid_vcs_time() {
        assert!(parse_go_build_info("\tbuild\tvcs.time=yesterday\n").is_err());
    }

    #[tokio::test]
    async fn test_should_resolve_identity_from_overrides() {
        let identity = BuildIdentity::resolve(&test_config(Some("abc123"), Some(1_700_000_000)))
            .await
            .unwrap();

        assert_eq!(
            identity,
            BuildIdentity {
                revision: "abc123".to_string(),
                modified: false,
                time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            }
        );
    }

    #[tokio::test]
    async fn test_should_default_to_current_time_without_timestamp() {
        let before = Utc::now();
        let identity = BuildIdentity::resolve(&test_config(Some(""), None))
            .await
            .unwrap();

        assert_eq!(identity.revision, UNKNOWN_REVISION);
        assert!(identity.time >= before);
    }
}
