//! Per-tenant container egress metering with quota and subscription
//! lifecycle enforcement, run as a periodic batch job.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod runtime;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use crate::cli::Cli;
use crate::config::Config;
use crate::core::{Mode, Reconciler};
use crate::db::Database;
use crate::runtime::DockerRuntime;

/// Parse arguments, run one pass, and report. Errors are fatal for the process.
pub fn run() -> anyhow::Result<()> {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in egress-meter: {info}");
        default_hook(info);
    }));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "egress_meter=info,egress_meter_lib=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    let database = Database::open(
        &config.database.path,
        Duration::from_millis(config.database.busy_timeout_ms),
    )
    .with_context(|| format!("failed to open database {}", config.database.path.display()))?;
    tracing::info!("Database opened at {}", config.database.path.display());

    let runtime = DockerRuntime::new(&config.runtime);
    let reconciler = Reconciler::new(database, runtime);

    // Tenants are processed one after another; no need for worker threads.
    let executor = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let mode: Mode = cli.mode.into();
    let report = executor
        .block_on(reconciler.run(mode, chrono::Utc::now()))
        .with_context(|| format!("{mode} pass aborted"))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode pass report")?
        );
    }
    Ok(())
}
