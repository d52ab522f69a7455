//! Courier CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** — load `courier.toml` (or `--config`) and
//!    validate it.
//! 2. **Wire observability** — configure `tracing-subscriber` and, when an
//!    OTLP endpoint is configured, the OpenTelemetry exporter.
//! 3. **Construct infrastructure** — build the reqwest transport, tokio
//!    sleeper, and the configured credential source, and inject them into a
//!    [`dispatch::Dispatcher`].
//! 4. **Run one command** — print the result envelope as JSON on stdout.
//!    Exit status is 0 on success, 1 on a failed request, 2 when the CLI
//!    itself could not start.

mod commands;
mod config;
mod telemetry;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use crate::commands::Cli;
use crate::config::CourierConfig;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let config = CourierConfig::load(cli.config.as_deref())?;
    let _telemetry = telemetry::init(&config.logging)?;

    tracing::debug!(
        base_url = %config.api.base_url,
        timeout_ms = config.api.timeout_ms,
        max_retries = config.api.max_retries,
        credentials = ?config.credentials.source,
        "Configuration loaded"
    );

    let dispatcher = transport::connect(config.client_defaults(), config.credential_provider())
        .context("failed to initialise HTTP transport")?;

    let result = commands::execute(&dispatcher, cli.command).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.is_success())
}
