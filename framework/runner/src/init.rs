use std::fs::OpenOptions;

use anyhow::Context;
use clap::Parser;

use crate::cli::RunbenchCli;

/// Environment variable naming a file that log records are shipped to.
pub const LOG_FILE_ENV: &str = "RUNBENCH_LOG_FILE";

/// Initialise the CLI and logging for the runbench runner.
pub fn init() -> anyhow::Result<RunbenchCli> {
    let cli = RunbenchCli::parse();
    init_logging(cli.disable_log_shipping)?;

    Ok(cli)
}

/// Pick the log sink and install the logger.
///
/// Records go to stderr unless shipping is enabled and [`LOG_FILE_ENV`] names a file, in which
/// case they are appended to that file instead.
pub fn init_logging(disable_shipping: bool) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let ship_to = if disable_shipping {
        None
    } else {
        std::env::var(LOG_FILE_ENV).ok().filter(|p| !p.is_empty())
    };

    if let Some(path) = &ship_to {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file '{path}' from '{LOG_FILE_ENV}'"))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("Failed to initialise logging")?;

    if let Some(path) = ship_to {
        log::debug!("Shipping logs to {path}");
    }

    Ok(())
}
